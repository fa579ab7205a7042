// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deploy task document and its create/update payloads.

use crate::merge::deep_merge;
use crate::status::DeployStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved metadata key carrying the branch a task operates on.
pub const META_BRANCH: &str = "branch";
/// Reserved metadata key distinguishing deploys from rollbacks.
pub const META_ACTION: &str = "action";
/// Reserved metadata key for the completion summary.
pub const META_SUMMARY: &str = "summary";
/// Reserved metadata key for failure diagnostics.
pub const META_FAILURE_CONTEXT: &str = "failure_context";

/// A deploy or rollback task.
///
/// Identity is `task_id`, an opaque 32-character hex string. The free-form
/// `metadata` map accumulates per-stage records, the completion summary,
/// and failure context; see the reserved `META_*` keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployTask {
    pub task_id: String,
    pub status: DeployStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_log: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl DeployTask {
    /// True once the task reached `completed` or `failed`.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Branch recorded at creation time.
    pub fn branch(&self) -> Option<&str> {
        self.metadata.get(META_BRANCH).and_then(Value::as_str)
    }

    /// Operation kind; tasks without an explicit action are deploys.
    pub fn action(&self) -> &str {
        self.metadata
            .get(META_ACTION)
            .and_then(Value::as_str)
            .unwrap_or("deploy")
    }

    /// Completion summary, when the pipeline has written one.
    pub fn summary(&self) -> Option<&Map<String, Value>> {
        self.metadata.get(META_SUMMARY).and_then(Value::as_object)
    }

    /// Commit recorded in the completion summary.
    pub fn summary_commit(&self) -> Option<&str> {
        self.summary()
            .and_then(|summary| summary.get("commit"))
            .and_then(Value::as_str)
    }

    /// Failure diagnostics recorded when a pipeline aborts.
    pub fn failure_context(&self) -> Option<&Map<String, Value>> {
        self.metadata
            .get(META_FAILURE_CONTEXT)
            .and_then(Value::as_object)
    }

    /// Resolved operator, preferring `actor` over `requested_by`.
    pub fn actor(&self) -> Option<&str> {
        self.metadata
            .get("actor")
            .or_else(|| self.metadata.get("requested_by"))
            .and_then(Value::as_str)
    }

    /// Apply an update payload in-place.
    ///
    /// This is the reference semantics for [`TaskUpdate`]: direct fields
    /// assign, `append_metadata` deep-merges. Terminal timestamps are the
    /// caller's responsibility (`mark_status` in the store contract).
    pub fn apply_update(&mut self, update: TaskUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(error_log) = update.error_log {
            self.error_log = Some(error_log);
        }
        if let Some(completed_at) = update.completed_at {
            self.completed_at = Some(completed_at);
        }
        if let Some(metadata) = update.metadata {
            self.metadata = metadata;
        }
        if !update.append_metadata.is_empty() {
            deep_merge(&mut self.metadata, update.append_metadata);
        }
    }
}

/// Payload for creating a pending task.
#[derive(Debug, Clone)]
pub struct TaskCreate {
    pub task_id: String,
    pub status: DeployStatus,
    pub metadata: Map<String, Value>,
}

impl TaskCreate {
    /// New pending task with the given metadata.
    pub fn pending(task_id: impl Into<String>, metadata: Map<String, Value>) -> Self {
        Self {
            task_id: task_id.into(),
            status: DeployStatus::Pending,
            metadata,
        }
    }

    /// Materialize the task document with its creation timestamp.
    pub fn into_task(self, started_at: DateTime<Utc>) -> DeployTask {
        DeployTask {
            task_id: self.task_id,
            status: self.status,
            started_at,
            completed_at: None,
            error_log: None,
            metadata: self.metadata,
        }
    }
}

/// Partial update applied atomically by the store.
///
/// `metadata` replaces the whole map; `append_metadata` deep-merges into it
/// (nested objects merge, scalar leaves take the most recent writer).
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub status: Option<DeployStatus>,
    pub error_log: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub metadata: Option<Map<String, Value>>,
    pub append_metadata: Map<String, Value>,
}

impl TaskUpdate {
    /// Update that only changes the status.
    pub fn status(status: DeployStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Update that only appends metadata.
    pub fn append(append_metadata: Map<String, Value>) -> Self {
        Self {
            append_metadata,
            ..Self::default()
        }
    }

    /// Attach an append-metadata fragment to this update.
    pub fn with_append(mut self, append_metadata: Map<String, Value>) -> Self {
        self.append_metadata = append_metadata;
        self
    }

    /// True when applying this update would change nothing.
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.error_log.is_none()
            && self.completed_at.is_none()
            && self.metadata.is_none()
            && self.append_metadata.is_empty()
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
