// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cutover-store: persistence contract for deploy tasks and reports.
//!
//! The engine only ever talks to the [`TaskStore`] trait. The host picks the
//! backing implementation before the engine is constructed — a document
//! database driver in production, [`MemoryTaskStore`] in tests and in hosts
//! running without one.

pub mod memory;

use async_trait::async_trait;
use cutover_core::{DeployReport, DeployStatus, DeployTask, TaskCreate, TaskUpdate};
use thiserror::Error;

pub use memory::MemoryTaskStore;

/// Errors surfaced by a task store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("duplicate task id: {0}")]
    DuplicateTask(String),
    #[error("duplicate report id: {0}")]
    DuplicateReport(String),
}

/// Persistence surface consumed by the deploy engine.
///
/// `update_task` is atomic: direct fields assign, `append_metadata`
/// deep-merges (nested objects recurse, scalar leaves take the most recent
/// writer). Appends are commutative only for disjoint keys.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Persist a new task; returns the stored document.
    async fn create_task(&self, create: TaskCreate) -> Result<DeployTask, StoreError>;

    /// Fetch a task by id.
    async fn get_task(&self, task_id: &str) -> Result<Option<DeployTask>, StoreError>;

    /// Apply a partial update; returns the document after the update, or
    /// `None` when the task does not exist.
    async fn update_task(
        &self,
        task_id: &str,
        update: TaskUpdate,
    ) -> Result<Option<DeployTask>, StoreError>;

    /// Set the status, recording `completed_at` when it is terminal.
    async fn mark_status(
        &self,
        task_id: &str,
        status: DeployStatus,
        error_log: Option<String>,
    ) -> Result<Option<DeployTask>, StoreError>;

    /// Completed tasks on `branch`, newest first by `completed_at`.
    async fn get_recent_successes(
        &self,
        branch: &str,
        limit: usize,
    ) -> Result<Vec<DeployTask>, StoreError>;

    /// All tasks, newest first by `started_at`.
    async fn get_recent_tasks(&self, limit: usize) -> Result<Vec<DeployTask>, StoreError>;

    /// Most recently started task, for health probes.
    async fn get_latest_task(&self) -> Result<Option<DeployTask>, StoreError>;

    /// True iff the backing store answers.
    async fn ping(&self) -> bool;

    /// Persist an explicit deploy report.
    async fn insert_report(&self, report: DeployReport) -> Result<DeployReport, StoreError>;

    /// Fetch a report by id.
    async fn get_report(&self, report_id: &str) -> Result<Option<DeployReport>, StoreError>;
}
