use std::io;
use std::process::Command;

use log::{info, warn};

use crate::error::DispatchError;

/// Everything a finished child process left behind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// None when the process was killed by a signal
    pub status: Option<i32>,
}

impl ProcessOutput {
    /// Compilers and schedulers report problems on stderr, sometimes with exit code 0
    pub fn succeeded(&self) -> bool {
        self.stderr.trim().is_empty() && self.status == Some(0)
    }

    /// Best description of a failure: stderr if there is any, otherwise the exit status
    pub fn failure_text(&self) -> String {
        if !self.stderr.trim().is_empty() {
            return self.stderr.clone();
        }
        match self.status {
            Some(code) => format!("process exited with status {code}\n{}", self.stdout),
            None => format!("process terminated by signal\n{}", self.stdout),
        }
    }
}

/// Run `prefix` + `argument` as a single command line
///
/// The command line is split on whitespace into program and arguments, there is no shell
/// involved (no quoting, no globbing). Blocks until the child exits. A program that can't be
/// launched is an error, never an empty output.
pub fn execute(prefix: &str, argument: &str) -> Result<ProcessOutput, DispatchError> {
    let command_line = format!("{prefix}{argument}");
    info!("Command <{}>", command_line);

    let mut parts = command_line.split_whitespace();
    let program = parts.next().ok_or_else(|| DispatchError::ProcessExecution {
        command: command_line.clone(),
        source: io::Error::new(io::ErrorKind::InvalidInput, "empty command line"),
    })?;

    let mut cmd = Command::new(program);
    cmd.args(parts);

    let output = cmd.output().map_err(|source| {
        warn!("Can't execute command <{}>: {}", command_line, source);
        DispatchError::ProcessExecution { command: command_line.clone(), source }
    })?;

    Ok(ProcessOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        status: output.status.code(),
    })
}
