// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deploy task status and transition guard.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lifecycle state of a deploy task.
///
/// Statuses advance along [`STATUS_SEQUENCE`]; the only backward move
/// allowed is into `Failed`, which is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployStatus {
    Pending,
    RunningClone,
    RunningBuild,
    RunningCutover,
    RunningObservability,
    Completed,
    Failed,
}

/// Forward order of the pipeline states. `Failed` is reachable from
/// anywhere and intentionally absent here.
pub const STATUS_SEQUENCE: [DeployStatus; 6] = [
    DeployStatus::Pending,
    DeployStatus::RunningClone,
    DeployStatus::RunningBuild,
    DeployStatus::RunningCutover,
    DeployStatus::RunningObservability,
    DeployStatus::Completed,
];

impl DeployStatus {
    /// String form used as metadata keys and in persisted documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeployStatus::Pending => "pending",
            DeployStatus::RunningClone => "running_clone",
            DeployStatus::RunningBuild => "running_build",
            DeployStatus::RunningCutover => "running_cutover",
            DeployStatus::RunningObservability => "running_observability",
            DeployStatus::Completed => "completed",
            DeployStatus::Failed => "failed",
        }
    }

    /// True once the task can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeployStatus::Completed | DeployStatus::Failed)
    }

    /// The four `running_*` stages, in execution order.
    pub fn stages() -> [DeployStatus; 4] {
        [
            DeployStatus::RunningClone,
            DeployStatus::RunningBuild,
            DeployStatus::RunningCutover,
            DeployStatus::RunningObservability,
        ]
    }

    fn sequence_index(&self) -> Option<usize> {
        STATUS_SEQUENCE.iter().position(|s| s == self)
    }
}

impl fmt::Display for DeployStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognized status string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown deploy status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for DeployStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DeployStatus::Pending),
            "running_clone" => Ok(DeployStatus::RunningClone),
            "running_build" => Ok(DeployStatus::RunningBuild),
            "running_cutover" => Ok(DeployStatus::RunningCutover),
            "running_observability" => Ok(DeployStatus::RunningObservability),
            "completed" => Ok(DeployStatus::Completed),
            "failed" => Ok(DeployStatus::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Validate a status transition.
///
/// A transition is valid when the status is unchanged, the new status is
/// `Failed`, or the new status sits at or beyond the current one in
/// [`STATUS_SEQUENCE`]. Terminal states therefore only re-admit themselves.
pub fn is_valid_transition(current: DeployStatus, new: DeployStatus) -> bool {
    if current == new {
        return true;
    }
    let Some(current_index) = current.sequence_index() else {
        // `current` can only be Failed here, which is terminal.
        return false;
    };
    if new == DeployStatus::Failed {
        return true;
    }
    match new.sequence_index() {
        Some(new_index) => new_index >= current_index,
        None => false,
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
