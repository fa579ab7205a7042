// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rollback planning and execution.
//!
//! A rollback reverses the branch to the commit of the second-most-recent
//! successful deploy and drives the same pipeline with a target commit and
//! a force push.

use crate::error::EngineError;
use crate::lock::LockGuard;
use crate::service::DeployEngine;
use cutover_adapters::identity;
use cutover_core::{new_task_id, Clock, DeployStatus, DeployTask, TaskCreate, TaskUpdate};
use serde_json::{json, Map, Value};

/// Resolved rollback pair: the commit being left and the commit being
/// restored.
#[derive(Debug, Clone)]
pub struct RollbackPlan {
    pub task: DeployTask,
    pub branch: String,
    pub target_commit: String,
    pub current_commit: String,
}

impl<C: Clock> DeployEngine<C> {
    /// Resolve the previous-successful commit pair on `branch` and create
    /// a pending rollback task.
    pub async fn prepare_rollback(&self, branch: Option<&str>) -> Result<RollbackPlan, EngineError> {
        let branch = self.validate_branch(branch)?;
        let successes = self.store.get_recent_successes(&branch, 2).await?;
        if successes.len() < 2 {
            return Err(EngineError::NotEnoughHistory);
        }
        let current_commit = successes[0]
            .summary_commit()
            .map(str::to_string)
            .ok_or_else(|| {
                EngineError::RollbackTargetUnknown(
                    "latest successful deploy has no recorded commit".to_string(),
                )
            })?;
        let target_commit = successes[1]
            .summary_commit()
            .map(str::to_string)
            .ok_or_else(|| {
                EngineError::RollbackTargetUnknown(
                    "previous successful deploy has no recorded commit".to_string(),
                )
            })?;

        let mut metadata = Map::new();
        metadata.insert("branch".to_string(), json!(branch));
        metadata.insert("action".to_string(), json!("rollback"));
        metadata.insert("from_commit".to_string(), json!(current_commit));
        metadata.insert("to_commit".to_string(), json!(target_commit));
        metadata.insert("actor".to_string(), json!(identity::resolve_actor()));
        metadata.insert(
            "requested_by".to_string(),
            json!(identity::resolve_requester()),
        );
        metadata.insert("trigger".to_string(), json!("api"));
        let task = self
            .store
            .create_task(TaskCreate::pending(new_task_id(), metadata))
            .await?;
        tracing::info!(
            task_id = %task.task_id,
            branch = %branch,
            from = %current_commit,
            to = %target_commit,
            "rollback task prepared"
        );
        Ok(RollbackPlan {
            task,
            branch,
            target_commit,
            current_commit,
        })
    }

    /// Drive the pipeline for a prepared rollback task.
    pub async fn perform_rollback(
        &self,
        task_id: &str,
        branch: &str,
        target_commit: &str,
        current_commit: &str,
    ) -> Result<DeployTask, EngineError> {
        let guard = self.lock.acquire().await;
        self.perform_rollback_locked(&guard, task_id, branch, target_commit, current_commit)
            .await
    }

    pub(crate) async fn perform_rollback_locked(
        &self,
        guard: &LockGuard<'_>,
        task_id: &str,
        branch: &str,
        target_commit: &str,
        current_commit: &str,
    ) -> Result<DeployTask, EngineError> {
        // The reversal must reach origin, except in dry-run where the
        // intended push is only recorded.
        let force_push = !self.dry_run();
        let task = Box::pin(self.run_pipeline_locked(
            guard,
            task_id,
            branch,
            Some(target_commit),
            force_push,
        ))
        .await?;
        if task.status != DeployStatus::Completed {
            return Ok(task);
        }
        let mut append = Map::new();
        append.insert(
            "summary".to_string(),
            json!({
                "rolled_back_from": current_commit,
                "rolled_back_to": target_commit,
            }),
        );
        self.store
            .update_task(task_id, TaskUpdate::append(append))
            .await?;
        self.get_task(task_id).await
    }

    /// Auto-rollback invoked from a failing deploy, inside the same lock
    /// ownership. Returns a structured result for
    /// `failure_context.auto_recovery`.
    pub(crate) async fn attempt_auto_rollback(
        &self,
        guard: &LockGuard<'_>,
        branch: &str,
    ) -> Value {
        tracing::warn!(branch, "attempting auto-rollback after command failure");
        let plan = match self.prepare_rollback(Some(branch)).await {
            Ok(plan) => plan,
            Err(err) => {
                return json!({ "status": "skipped", "reason": err.to_string() });
            }
        };
        match self
            .perform_rollback_locked(
                guard,
                &plan.task.task_id,
                &plan.branch,
                &plan.target_commit,
                &plan.current_commit,
            )
            .await
        {
            Ok(task) if task.status == DeployStatus::Completed => json!({
                "status": "completed",
                "rollback_task_id": task.task_id,
                "rolled_back_to": plan.target_commit,
            }),
            Ok(task) => json!({
                "status": "failed",
                "rollback_task_id": task.task_id,
                "reason": task
                    .error_log
                    .unwrap_or_else(|| "rollback pipeline did not complete".to_string()),
            }),
            Err(err) => json!({
                "status": "failed",
                "rollback_task_id": plan.task.task_id,
                "reason": err.to_string(),
            }),
        }
    }
}

#[cfg(test)]
#[path = "rollback_tests.rs"]
mod tests;
