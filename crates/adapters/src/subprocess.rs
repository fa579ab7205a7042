// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution with captured output and typed failure.

use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Default timeout for pipeline stage commands.
/// Set to 10 minutes as a safety net for long-running builds.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(600);

fn failure_detail<'a>(stderr: &'a str, stdout: &'a str) -> &'a str {
    if stderr.is_empty() {
        stdout
    } else {
        stderr
    }
}

/// Errors raised while executing an external command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Misconfiguration, not a command failure.
    #[error("command working directory missing: {0}")]
    MissingWorkdir(PathBuf),
    #[error("empty command")]
    Empty,
    #[error("{description} failed to spawn: {source}")]
    Spawn {
        description: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{description} timed out after {timeout_secs}s")]
    Timeout {
        description: String,
        timeout_secs: u64,
    },
    /// Non-zero exit. Carries everything `failure_context` needs.
    #[error("command failed ({command}): {}", failure_detail(.stderr, .stdout))]
    Failed {
        command: String,
        cwd: Option<PathBuf>,
        returncode: Option<i32>,
        stdout: String,
        stderr: String,
    },
}

/// Per-command record serialized into stage metadata.
#[derive(Debug, Clone, Serialize)]
pub struct CommandRecord {
    pub description: String,
    pub command: String,
    pub cwd: Option<String>,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returncode: Option<i32>,
}

impl CommandRecord {
    /// JSON form for metadata appends. Serialization of this shape
    /// cannot fail.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Run a subprocess command with a timeout.
///
/// Wraps `Command::output()` with `tokio::time::timeout`, converting
/// timeout expiration into a typed error. The child process is killed
/// automatically when the timeout elapses (via the tokio `Child` drop
/// implementation).
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    description: &str,
) -> Result<Output, CommandError> {
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(io_err)) => Err(CommandError::Spawn {
            description: description.to_string(),
            source: io_err,
        }),
        Err(_elapsed) => Err(CommandError::Timeout {
            description: description.to_string(),
            timeout_secs: timeout.as_secs(),
        }),
    }
}

/// Executes stage commands, honoring the global dry-run flag.
///
/// Arguments are passed as a vector; no shell expansion happens here.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    dry_run: bool,
    timeout: Duration,
}

impl CommandRunner {
    pub fn new(dry_run: bool, timeout: Duration) -> Self {
        Self { dry_run, timeout }
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Run one command and capture its output.
    ///
    /// In dry-run mode no process is spawned and the record carries only
    /// the descriptive fields.
    pub async fn run(
        &self,
        argv: &[String],
        cwd: Option<&Path>,
        description: &str,
    ) -> Result<CommandRecord, CommandError> {
        let program = argv.first().ok_or(CommandError::Empty)?;
        let mut record = CommandRecord {
            description: description.to_string(),
            command: argv.join(" "),
            cwd: cwd.map(|p| p.display().to_string()),
            dry_run: self.dry_run,
            stdout: None,
            stderr: None,
            returncode: None,
        };

        if self.dry_run {
            tracing::info!(command = %record.command, "dry-run, skipping execution");
            return Ok(record);
        }

        if let Some(dir) = cwd {
            if !dir.is_dir() {
                return Err(CommandError::MissingWorkdir(dir.to_path_buf()));
            }
        }

        tracing::info!(command = %record.command, cwd = ?cwd, "running command");
        let mut cmd = Command::new(program);
        cmd.args(&argv[1..]);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        let output = run_with_timeout(cmd, self.timeout, description).await?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let returncode = output.status.code();
        record.stdout = Some(stdout.clone());
        record.stderr = Some(stderr.clone());
        record.returncode = returncode;

        if !output.status.success() {
            return Err(CommandError::Failed {
                command: record.command,
                cwd: cwd.map(Path::to_path_buf),
                returncode,
                stdout,
                stderr,
            });
        }

        Ok(record)
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
