//! Verification oracle backed by an external model-checker process.
//!
//! Check mode: `<program> <args..> check --model <merged>` must exit 0 and
//! print `{"passed": bool, "passing_properties": n}` as its last JSON line.
//! Generate mode: `<program> <args..> generate --model <merged> --out <dir>
//! --from-index N [--relaxed-facts] [--force-assertion-tests]
//! [--instance-tests]` writes the category files described in [`crate::wire`].
//! There is no tolerated failure mode for this oracle.

use std::ffi::OsString;

use icebar_ir::model::ModelVariant;
use icebar_ir::test_case::BranchingTest;
use serde::{Deserialize, Serialize};

use super::process::{ProcessCommand, ProcessOutput, SpawnError};
use crate::oracle::{CheckVerdict, GenerateRequest, GeneratedTests, VerifyOracle, VerifyOracleError};
use crate::wire::{last_json_line, read_generated};
use crate::workspace::OracleWorkspace;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyProcessConfig {
    pub command: ProcessCommand,
}

impl VerifyProcessConfig {
    pub fn new(command: ProcessCommand) -> Self {
        Self { command }
    }
}

#[derive(Debug, Deserialize)]
struct CheckLine {
    passed: bool,
    passing_properties: usize,
}

pub struct ProcessVerifyOracle {
    config: VerifyProcessConfig,
    workspace: OracleWorkspace,
}

impl ProcessVerifyOracle {
    pub fn new(config: VerifyProcessConfig, workspace: OracleWorkspace) -> Self {
        Self { config, workspace }
    }

    fn run(&self, args: &[OsString]) -> Result<ProcessOutput, VerifyOracleError> {
        let output = self.config.command.run(args)?;
        if !output.success {
            return Err(VerifyOracleError::Failed {
                code: output.code,
                message: output.failure_message(),
            });
        }
        Ok(output)
    }
}

impl From<SpawnError> for VerifyOracleError {
    fn from(e: SpawnError) -> Self {
        match e {
            SpawnError::NotFound(msg) => VerifyOracleError::NotFound(msg),
            SpawnError::Io(e) => VerifyOracleError::Io(e),
        }
    }
}

impl VerifyOracle for ProcessVerifyOracle {
    fn check(&mut self, model: &ModelVariant) -> Result<CheckVerdict, VerifyOracleError> {
        let merged = self.workspace.write_merged_model(model)?;
        let output = self.run(&["check".into(), "--model".into(), merged.into()])?;
        let line: CheckLine = last_json_line(&output.stdout).ok_or_else(|| {
            VerifyOracleError::ParseError(format!(
                "no check verdict in output: {}",
                output.failure_message()
            ))
        })?;
        Ok(if line.passed {
            CheckVerdict::Pass {
                passing_properties: line.passing_properties,
            }
        } else {
            CheckVerdict::Fail {
                passing_properties: line.passing_properties,
            }
        })
    }

    fn generate(
        &mut self,
        model: &ModelVariant,
        request: &GenerateRequest,
    ) -> Result<GeneratedTests, VerifyOracleError> {
        let merged = self.workspace.write_merged_model(model)?;
        let out_dir = self.workspace.fresh_dir("generated")?;
        let mut args: Vec<OsString> = vec![
            "generate".into(),
            "--model".into(),
            merged.into(),
            "--out".into(),
            out_dir.clone().into(),
            "--from-index".into(),
            request.from_index.to_string().into(),
        ];
        if request.relaxed_facts {
            args.push("--relaxed-facts".into());
        }
        if request.force_assertion_tests {
            args.push("--force-assertion-tests".into());
        }
        if request.instance_tests {
            args.push("--instance-tests".into());
        }
        let output = self.run(&args)?;
        let mut generated = read_generated(&out_dir, request.from_index, &output.stdout)?;
        // Facts were weakened, so no witness of this call can be trusted.
        if request.relaxed_facts {
            generated.untrusted.extend(
                std::mem::take(&mut generated.trusted)
                    .into_iter()
                    .map(|t| BranchingTest::Single(t.demoted())),
            );
        }
        Ok(generated)
    }
}
