// Run configuration: JSON file, overridden by command-line flags, with
// environment fallbacks for the oracle command lines.

use std::fs;
use std::path::{Path, PathBuf};

use icebar_engine::SearchOptions;
use icebar_ir::space::SearchStrategy;
use icebar_oracle::backends::{
    CommandLineError, ProcessCommand, RepairProcessConfig, VerifyProcessConfig,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::SearchArgs;

pub(crate) const REPAIR_CMD_ENV: &str = "ICEBAR_REPAIR_CMD";
pub(crate) const VERIFY_CMD_ENV: &str = "ICEBAR_VERIFY_CMD";
pub(crate) const DEFAULT_WORK_DIR: &str = "icebar-work";

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("reading config `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(
        "no {role} oracle command: pass --{role}-cmd, set `{role}` in the config file, \
         or export {env}"
    )]
    MissingCommand {
        role: &'static str,
        env: &'static str,
    },
    #[error("invalid {role} oracle command from {origin}: {source}")]
    InvalidCommand {
        role: &'static str,
        origin: &'static str,
        #[source]
        source: CommandLineError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct IcebarConfig {
    pub(crate) laps: usize,
    pub(crate) timeout_secs: u64,
    pub(crate) strategy: SearchStrategy,
    pub(crate) prioritize: bool,
    pub(crate) global_trusted_tests: bool,
    pub(crate) dedup_tests: bool,
    pub(crate) partial_repair_as_fix: bool,
    pub(crate) keep_going_on_tolerated_failure: bool,
    pub(crate) allow_relaxed_facts: bool,
    pub(crate) force_assertion_tests: bool,
    pub(crate) instance_tests: bool,
    pub(crate) work_dir: PathBuf,
    pub(crate) initial_tests: Option<PathBuf>,
    pub(crate) repair: Option<RepairProcessConfig>,
    pub(crate) verify: Option<VerifyProcessConfig>,
}

impl Default for IcebarConfig {
    fn default() -> Self {
        let options = SearchOptions::default();
        Self {
            laps: options.laps,
            timeout_secs: options.timeout_secs,
            strategy: options.strategy,
            prioritize: options.prioritize,
            global_trusted_tests: options.global_trusted_tests,
            dedup_tests: options.dedup_tests,
            partial_repair_as_fix: options.partial_repair_as_fix,
            keep_going_on_tolerated_failure: options.keep_going_on_tolerated_failure,
            allow_relaxed_facts: options.allow_relaxed_facts,
            force_assertion_tests: options.force_assertion_tests,
            instance_tests: options.instance_tests,
            work_dir: PathBuf::from(DEFAULT_WORK_DIR),
            initial_tests: None,
            repair: None,
            verify: None,
        }
    }
}

impl IcebarConfig {
    /// Load `path`, or the defaults when no file is given.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub(crate) fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Flags that were given win over file values; switches only ever move a
    /// setting away from its default.
    pub(crate) fn apply_search_args(&mut self, args: &SearchArgs) {
        if let Some(laps) = args.laps {
            self.laps = laps;
        }
        if let Some(timeout_secs) = args.timeout_secs {
            self.timeout_secs = timeout_secs;
        }
        if let Some(strategy) = args.strategy {
            self.strategy = strategy;
        }
        self.prioritize |= args.prioritize;
        self.global_trusted_tests &= !args.local_trusted;
        self.dedup_tests &= !args.no_dedup;
        self.partial_repair_as_fix |= args.partial_as_fix;
        self.keep_going_on_tolerated_failure &= !args.no_keep_going;
        self.allow_relaxed_facts |= args.relaxed_facts;
        self.force_assertion_tests |= args.force_assertion_tests;
        self.instance_tests |= args.instance_tests;
    }

    pub(crate) fn search_options(&self) -> SearchOptions {
        SearchOptions {
            laps: self.laps,
            timeout_secs: self.timeout_secs,
            strategy: self.strategy,
            prioritize: self.prioritize,
            global_trusted_tests: self.global_trusted_tests,
            dedup_tests: self.dedup_tests,
            partial_repair_as_fix: self.partial_repair_as_fix,
            keep_going_on_tolerated_failure: self.keep_going_on_tolerated_failure,
            allow_relaxed_facts: self.allow_relaxed_facts,
            force_assertion_tests: self.force_assertion_tests,
            instance_tests: self.instance_tests,
        }
    }

    pub(crate) fn work_dir(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .unwrap_or_else(|| self.work_dir.clone())
    }

    /// Repair adapter settings. A `--repair-cmd` flag replaces only the
    /// command of a configured adapter, keeping its failure markers.
    pub(crate) fn repair_config(
        &self,
        flag: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<RepairProcessConfig, ConfigError> {
        let configured = self.repair.as_ref().map(|r| r.command.clone());
        let command = resolve_command("repair", REPAIR_CMD_ENV, flag, configured, env)?;
        Ok(match &self.repair {
            Some(repair) => RepairProcessConfig {
                command,
                ..repair.clone()
            },
            None => RepairProcessConfig::new(command),
        })
    }

    pub(crate) fn verify_config(
        &self,
        flag: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<VerifyProcessConfig, ConfigError> {
        let configured = self.verify.as_ref().map(|v| v.command.clone());
        let command = resolve_command("verify", VERIFY_CMD_ENV, flag, configured, env)?;
        Ok(VerifyProcessConfig::new(command))
    }
}

/// Flag, then config file, then environment.
fn resolve_command(
    role: &'static str,
    env_var: &'static str,
    flag: Option<&str>,
    configured: Option<ProcessCommand>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ProcessCommand, ConfigError> {
    let parse = |line: &str, origin| {
        ProcessCommand::parse(line).map_err(|source| ConfigError::InvalidCommand {
            role,
            origin,
            source,
        })
    };
    if let Some(line) = flag {
        return parse(line, "the command line");
    }
    if let Some(command) = configured {
        return Ok(command);
    }
    match env(env_var) {
        Some(line) => parse(&line, "the environment"),
        None => Err(ConfigError::MissingCommand { role, env: env_var }),
    }
}

/// Process environment lookup used outside tests.
pub(crate) fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
