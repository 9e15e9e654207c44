//! Repair oracle backed by an external synthesizer process.
//!
//! Call contract: `<program> <args..> --model <path> --tests <file> --out <dir>`.
//! A zero exit with `<dir>/<model name>.als` present is a repair (partial if
//! stdout carries the configured partial marker); a zero exit without that
//! file is not-repaired. Any other exit is an error, tolerated only when its
//! output names one of the configured failure markers.

use std::ffi::OsString;

use icebar_ir::model::ModelVariant;
use icebar_ir::test_case::PropertyTest;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::process::{ProcessCommand, SpawnError};
use crate::oracle::{RepairOracle, RepairOracleError, RepairVerdict};
use crate::workspace::OracleWorkspace;

pub const DEFAULT_PARTIAL_MARKER: &str = "PARTIAL_REPAIR";

fn default_tolerated_failures() -> Vec<String> {
    vec!["NullPointerException".to_string()]
}

fn default_partial_marker() -> String {
    DEFAULT_PARTIAL_MARKER.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepairProcessConfig {
    pub command: ProcessCommand,
    /// Output substrings identifying crashes that may be downgraded to
    /// not-repaired.
    #[serde(default = "default_tolerated_failures")]
    pub tolerated_failures: Vec<String>,
    #[serde(default = "default_partial_marker")]
    pub partial_marker: String,
}

impl RepairProcessConfig {
    pub fn new(command: ProcessCommand) -> Self {
        Self {
            command,
            tolerated_failures: default_tolerated_failures(),
            partial_marker: default_partial_marker(),
        }
    }
}

pub struct ProcessRepairOracle {
    config: RepairProcessConfig,
    workspace: OracleWorkspace,
}

impl ProcessRepairOracle {
    pub fn new(config: RepairProcessConfig, workspace: OracleWorkspace) -> Self {
        Self { config, workspace }
    }
}

impl From<SpawnError> for RepairOracleError {
    fn from(e: SpawnError) -> Self {
        match e {
            SpawnError::NotFound(msg) => RepairOracleError::NotFound(msg),
            SpawnError::Io(e) => RepairOracleError::Io(e),
        }
    }
}

impl RepairOracle for ProcessRepairOracle {
    fn repair(
        &mut self,
        model: &ModelVariant,
        tests: &[PropertyTest],
    ) -> Result<RepairVerdict, RepairOracleError> {
        if tests.is_empty() {
            return Ok(RepairVerdict::NoTests);
        }
        let tests_file = self.workspace.write_tests_file(tests)?;
        let out_dir = self.workspace.fresh_dir("repair")?;
        let args: Vec<OsString> = vec![
            "--model".into(),
            model.path().into(),
            "--tests".into(),
            tests_file.into(),
            "--out".into(),
            out_dir.clone().into(),
        ];
        let output = self.config.command.run(&args)?;

        if !output.success {
            let combined = format!("{}\n{}", output.stdout, output.stderr);
            if let Some(marker) = self
                .config
                .tolerated_failures
                .iter()
                .find(|m| !m.is_empty() && combined.contains(m.as_str()))
            {
                warn!(
                    marker = %marker,
                    model = %model.name(),
                    "repair oracle crashed with a tolerated failure"
                );
                return Err(RepairOracleError::ToleratedCrash {
                    marker: marker.clone(),
                    message: output.failure_message(),
                });
            }
            return Err(RepairOracleError::Failed {
                code: output.code,
                message: output.failure_message(),
            });
        }

        let produced = out_dir.join(format!("{}.als", model.name()));
        if !produced.is_file() {
            return Ok(RepairVerdict::NotRepaired);
        }
        let persisted = self.workspace.persist_fix(&produced, model.name())?;
        let repaired = model.repaired(persisted);
        let partial = !self.config.partial_marker.is_empty()
            && output.stdout.contains(&self.config.partial_marker);
        info!(
            model = %model.name(),
            fix = %repaired.path().display(),
            partial,
            "repair oracle produced a candidate fix"
        );
        Ok(if partial {
            RepairVerdict::PartialRepair {
                model: repaired,
                used_tests: tests.len(),
            }
        } else {
            RepairVerdict::Repaired {
                model: repaired,
                used_tests: tests.len(),
            }
        })
    }
}
