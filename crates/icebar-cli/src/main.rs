mod cli;
mod commands;
mod config;

use std::time::Instant;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::config::IcebarConfig;

fn main() -> miette::Result<()> {
    let started = Instant::now();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = IcebarConfig::load(cli.config.as_deref()).into_diagnostic()?;
    let work_dir = config.work_dir(cli.work_dir.as_deref());

    match cli.command {
        Commands::Repair {
            model,
            oracle,
            search,
            repair_cmd,
            initial_tests,
            report_out,
            json_report,
        } => {
            commands::repair::run_repair_command(
                config,
                commands::repair::RepairInvocation {
                    model,
                    oracle,
                    search,
                    work_dir,
                    repair_cmd,
                    verify_cmd: cli.verify_cmd,
                    initial_tests,
                    report_out,
                    json_report,
                },
                started,
            )?;
        }
        Commands::Check { model, oracle } => {
            commands::check::run_check_command(
                &config,
                model,
                oracle,
                work_dir,
                cli.verify_cmd.as_deref(),
            )?;
        }
    }

    Ok(())
}
