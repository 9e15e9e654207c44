use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandLineError {
    #[error("command line is empty")]
    Empty,
    #[error("command line has unbalanced quoting: {0}")]
    Quoting(#[from] shell_words::ParseError),
}

/// An external program plus the leading arguments every call starts with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

impl ProcessCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Split a command line (as given through a flag or an environment
    /// variable) into program and arguments using POSIX shell quoting rules,
    /// so `"/opt/My Tools/check" --label 'two words'` keeps both spaced
    /// words intact. No expansion or redirection is performed.
    pub fn parse(line: &str) -> Result<Self, CommandLineError> {
        let mut words = shell_words::split(line)?.into_iter();
        let program = words.next().ok_or(CommandLineError::Empty)?;
        Ok(Self::new(program).with_args(words))
    }

    /// Run to completion with `extra` appended to the configured arguments.
    pub(crate) fn run(&self, extra: &[OsString]) -> Result<ProcessOutput, SpawnError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .args(extra)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        tracing::debug!(program = %self.program, args = ?extra, "invoking oracle process");
        let output = cmd.output().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => SpawnError::NotFound(format!("{}: {e}", self.program)),
            _ => SpawnError::Io(e),
        })?;
        Ok(ProcessOutput {
            code: output.status.code(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[derive(Debug)]
pub(crate) enum SpawnError {
    NotFound(String),
    Io(io::Error),
}

#[derive(Debug, Clone)]
pub(crate) struct ProcessOutput {
    pub code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// The most useful one-line description of a failed call: the last
    /// non-empty stderr line, else the last non-empty stdout line.
    pub fn failure_message(&self) -> String {
        last_line(&self.stderr)
            .or_else(|| last_line(&self.stdout))
            .unwrap_or("no output")
            .to_string()
    }
}

fn last_line(text: &str) -> Option<&str> {
    text.lines().rev().map(str::trim).find(|l| !l.is_empty())
}
