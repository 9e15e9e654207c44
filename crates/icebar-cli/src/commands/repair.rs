// Command handler for: Repair
//
// Resolves the run configuration, wires the process-backed oracles into the
// search driver, and writes the report artifacts.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use miette::IntoDiagnostic;
use tracing::info;

use icebar_engine::{SearchDriver, SearchOutcome, SearchReport};
use icebar_ir::model::ModelVariant;
use icebar_ir::test_case::{PropertyTest, TestKind};
use icebar_oracle::backends::{ProcessRepairOracle, ProcessVerifyOracle};
use icebar_oracle::wire::load_tests_file;
use icebar_oracle::OracleWorkspace;

use crate::cli::SearchArgs;
use crate::config::{process_env, IcebarConfig};

/// Exit status when the search ended without a verified fix.
pub(crate) const EXIT_NO_FIX: i32 = 2;
/// Exit status when an oracle failure aborted the search.
pub(crate) const EXIT_ORACLE_FAILED: i32 = 1;

pub(crate) struct RepairInvocation {
    pub(crate) model: PathBuf,
    pub(crate) oracle: PathBuf,
    pub(crate) search: SearchArgs,
    pub(crate) work_dir: PathBuf,
    pub(crate) repair_cmd: Option<String>,
    pub(crate) verify_cmd: Option<String>,
    pub(crate) initial_tests: Option<PathBuf>,
    pub(crate) report_out: Option<PathBuf>,
    pub(crate) json_report: Option<PathBuf>,
}

pub(crate) fn run_repair_command(
    mut config: IcebarConfig,
    invocation: RepairInvocation,
    started: Instant,
) -> miette::Result<()> {
    config.apply_search_args(&invocation.search);
    let options = config.search_options();
    let repair = config
        .repair_config(invocation.repair_cmd.as_deref(), process_env)
        .into_diagnostic()?;
    let verify = config
        .verify_config(invocation.verify_cmd.as_deref(), process_env)
        .into_diagnostic()?;

    require_file(&invocation.model, "model")?;
    require_file(&invocation.oracle, "property oracle")?;
    let model = ModelVariant::new(&invocation.model, &invocation.oracle);

    let initial_tests = match invocation.initial_tests.or(config.initial_tests) {
        Some(path) => load_initial_tests(&path)?,
        None => Vec::new(),
    };

    let workspace = OracleWorkspace::new(&invocation.work_dir).into_diagnostic()?;
    info!(
        work_dir = %workspace.root().display(),
        repair = %repair.command.program,
        verify = %verify.command.program,
        "oracle workspace ready"
    );
    let mut driver = SearchDriver::new(
        ProcessRepairOracle::new(repair, workspace.clone()),
        ProcessVerifyOracle::new(verify, workspace),
        options,
    )
    .with_time_spent(started.elapsed());
    let report = driver.run(model, initial_tests);

    eprintln!("{report}");
    println!("{}", report.to_line());
    if let Some(path) = &invocation.report_out {
        append_report_line(path, &report)?;
    }
    if let Some(path) = &invocation.json_report {
        write_json_report(path, &report)?;
    }

    match report.outcome {
        SearchOutcome::RepairFound => Ok(()),
        SearchOutcome::RepairOracleFailed { .. } | SearchOutcome::VerifyOracleFailed { .. } => {
            std::process::exit(EXIT_ORACLE_FAILED)
        }
        _ => std::process::exit(EXIT_NO_FIX),
    }
}

pub(crate) fn require_file(path: &Path, what: &str) -> miette::Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(miette::miette!("{what} file not found: {}", path.display()))
    }
}

fn load_initial_tests(path: &Path) -> miette::Result<Vec<PropertyTest>> {
    let tests = load_tests_file(path, TestKind::Initial).into_diagnostic()?;
    info!(path = %path.display(), count = tests.len(), "loaded initial tests");
    Ok(tests)
}

fn append_report_line(path: &Path, report: &SearchReport) -> miette::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .into_diagnostic()?;
    writeln!(file, "{}", report.to_line()).into_diagnostic()
}

fn write_json_report(path: &Path, report: &SearchReport) -> miette::Result<()> {
    let json = serde_json::to_string_pretty(report).into_diagnostic()?;
    fs::write(path, json).into_diagnostic()?;
    info!(path = %path.display(), "JSON report written");
    Ok(())
}
