// Command handler for: Check
//
// One check-mode call to the verification oracle, outside any search.

use std::path::PathBuf;

use miette::IntoDiagnostic;

use icebar_ir::model::ModelVariant;
use icebar_oracle::backends::ProcessVerifyOracle;
use icebar_oracle::{CheckVerdict, OracleWorkspace, VerifyOracle};

use super::repair::{require_file, EXIT_NO_FIX};
use crate::config::{process_env, IcebarConfig};

pub(crate) fn run_check_command(
    config: &IcebarConfig,
    model: PathBuf,
    oracle: PathBuf,
    work_dir: PathBuf,
    verify_cmd: Option<&str>,
) -> miette::Result<()> {
    let verify = config
        .verify_config(verify_cmd, process_env)
        .into_diagnostic()?;
    require_file(&model, "model")?;
    require_file(&oracle, "property oracle")?;

    let workspace = OracleWorkspace::new(work_dir).into_diagnostic()?;
    let mut verifier = ProcessVerifyOracle::new(verify, workspace);
    let verdict = verifier
        .check(&ModelVariant::new(model, oracle))
        .into_diagnostic()?;

    println!("{}", render_verdict(&verdict));
    if !verdict.passed() {
        std::process::exit(EXIT_NO_FIX);
    }
    Ok(())
}

fn render_verdict(verdict: &CheckVerdict) -> String {
    let status = if verdict.passed() { "PASS" } else { "FAIL" };
    format!("{status};{}", verdict.passing_properties())
}
