// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only queries against the checked-out source tree.
//!
//! Mutating git commands (fetch, checkout, reset, clean, push) go through
//! the pipeline's [`crate::CommandRunner`] so they are recorded in stage
//! metadata and honor dry-run. The queries here feed previews and
//! completion summaries, which run even in dry-run mode.

use crate::subprocess::run_with_timeout;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Default timeout for git queries.
pub const GIT_QUERY_TIMEOUT: Duration = Duration::from_secs(60);

/// True for a full 40-character lowercase hex commit SHA.
pub fn is_full_commit_sha(value: &str) -> bool {
    value.len() == 40
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

/// Errors from git queries.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("git {action} failed in {repo}: {detail}")]
    Command {
        action: String,
        repo: PathBuf,
        detail: String,
    },
}

/// Author details for a commit, from `git log -1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitDetails {
    pub sha: String,
    pub author_name: String,
    pub author_email: String,
    pub subject: String,
}

/// Thin wrapper over the git binary rooted at one repository.
#[derive(Debug, Clone)]
pub struct GitTool {
    repo: PathBuf,
    timeout: Duration,
}

impl GitTool {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self {
            repo: repo.into(),
            timeout: GIT_QUERY_TIMEOUT,
        }
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }

    async fn output(&self, action: &str, args: &[&str]) -> Result<String, GitError> {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(&self.repo);
        let description = format!("git {action}");
        let output = run_with_timeout(cmd, self.timeout, &description)
            .await
            .map_err(|err| GitError::Command {
                action: action.to_string(),
                repo: self.repo.clone(),
                detail: err.to_string(),
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(GitError::Command {
                action: action.to_string(),
                repo: self.repo.clone(),
                detail: stderr,
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Current HEAD commit SHA.
    pub async fn head_commit(&self) -> Result<String, GitError> {
        self.output("rev-parse", &["rev-parse", "HEAD"]).await
    }

    /// True when `rev` names a commit object in this repository.
    pub async fn commit_exists(&self, rev: &str) -> Result<bool, GitError> {
        let spec = format!("{rev}^{{commit}}");
        let mut cmd = Command::new("git");
        cmd.args(["cat-file", "-e", &spec]).current_dir(&self.repo);
        let output = run_with_timeout(cmd, self.timeout, "git cat-file")
            .await
            .map_err(|err| GitError::Command {
                action: "cat-file".to_string(),
                repo: self.repo.clone(),
                detail: err.to_string(),
            })?;
        Ok(output.status.success())
    }

    /// Author metadata for a commit (unit-separator delimited format).
    pub async fn commit_details(&self, rev: &str) -> Result<CommitDetails, GitError> {
        let line = self
            .output(
                "log",
                &["log", "-1", "--format=%H%x1f%an%x1f%ae%x1f%s", rev],
            )
            .await?;
        let mut parts = line.split('\u{1f}');
        Ok(CommitDetails {
            sha: parts.next().unwrap_or_default().to_string(),
            author_name: parts.next().unwrap_or_default().to_string(),
            author_email: parts.next().unwrap_or_default().to_string(),
            subject: parts.next().unwrap_or_default().to_string(),
        })
    }

    /// Name-status diff between two revisions.
    pub async fn diff_name_status(&self, base: &str, head: &str) -> Result<String, GitError> {
        let range = format!("{base}..{head}");
        self.output("diff", &["diff", "--name-status", &range])
            .await
    }
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
