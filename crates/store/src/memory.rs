// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory task store.

use crate::{StoreError, TaskStore};
use async_trait::async_trait;
use cutover_core::{Clock, DeployReport, DeployStatus, DeployTask, SystemClock, TaskCreate, TaskUpdate};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Map-backed [`TaskStore`] used by tests and database-less hosts.
pub struct MemoryTaskStore {
    tasks: Mutex<HashMap<String, DeployTask>>,
    reports: Mutex<HashMap<String, DeployReport>>,
    clock: Arc<dyn Clock>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Store with an injected clock, so tests control `started_at` and
    /// `completed_at` ordering.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
            reports: Mutex::new(HashMap::new()),
            clock,
        }
    }
}

impl Default for MemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn create_task(&self, create: TaskCreate) -> Result<DeployTask, StoreError> {
        let task = create.into_task(self.clock.now_utc());
        let mut tasks = self.tasks.lock();
        if tasks.contains_key(&task.task_id) {
            return Err(StoreError::DuplicateTask(task.task_id));
        }
        tasks.insert(task.task_id.clone(), task.clone());
        Ok(task)
    }

    async fn get_task(&self, task_id: &str) -> Result<Option<DeployTask>, StoreError> {
        Ok(self.tasks.lock().get(task_id).cloned())
    }

    async fn update_task(
        &self,
        task_id: &str,
        update: TaskUpdate,
    ) -> Result<Option<DeployTask>, StoreError> {
        let mut tasks = self.tasks.lock();
        let Some(task) = tasks.get_mut(task_id) else {
            return Ok(None);
        };
        task.apply_update(update);
        Ok(Some(task.clone()))
    }

    async fn mark_status(
        &self,
        task_id: &str,
        status: DeployStatus,
        error_log: Option<String>,
    ) -> Result<Option<DeployTask>, StoreError> {
        let completed_at = status.is_terminal().then(|| self.clock.now_utc());
        let mut tasks = self.tasks.lock();
        let Some(task) = tasks.get_mut(task_id) else {
            return Ok(None);
        };
        task.apply_update(TaskUpdate {
            status: Some(status),
            error_log,
            completed_at,
            ..TaskUpdate::default()
        });
        Ok(Some(task.clone()))
    }

    async fn get_recent_successes(
        &self,
        branch: &str,
        limit: usize,
    ) -> Result<Vec<DeployTask>, StoreError> {
        let tasks = self.tasks.lock();
        let mut successes: Vec<DeployTask> = tasks
            .values()
            .filter(|task| task.status == DeployStatus::Completed)
            .filter(|task| task.branch() == Some(branch))
            .cloned()
            .collect();
        successes.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        successes.truncate(limit);
        Ok(successes)
    }

    async fn get_recent_tasks(&self, limit: usize) -> Result<Vec<DeployTask>, StoreError> {
        let tasks = self.tasks.lock();
        let mut all: Vec<DeployTask> = tasks.values().cloned().collect();
        all.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        all.truncate(limit);
        Ok(all)
    }

    async fn get_latest_task(&self) -> Result<Option<DeployTask>, StoreError> {
        let tasks = self.tasks.lock();
        Ok(tasks
            .values()
            .max_by(|a, b| a.started_at.cmp(&b.started_at))
            .cloned())
    }

    async fn ping(&self) -> bool {
        true
    }

    async fn insert_report(&self, report: DeployReport) -> Result<DeployReport, StoreError> {
        let mut reports = self.reports.lock();
        if reports.contains_key(&report.report_id) {
            return Err(StoreError::DuplicateReport(report.report_id));
        }
        reports.insert(report.report_id.clone(), report.clone());
        Ok(report)
    }

    async fn get_report(&self, report_id: &str) -> Result<Option<DeployReport>, StoreError> {
        Ok(self.reports.lock().get(report_id).cloned())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
