// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deploy engine construction and the task-facing operations the HTTP
//! host calls directly.

use crate::config::DeployConfig;
use crate::error::EngineError;
use crate::lock::PipelineLock;
use crate::slots::Slots;
use chrono::{DateTime, Utc};
use cutover_adapters::{
    identity, CommandRunner, CompareClient, GeminiPreviewModel, GitTool, PreviewModel,
};
use cutover_core::{new_task_id, Clock, DeployStatus, DeployTask, SystemClock, TaskCreate};
use cutover_store::TaskStore;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// The deploy pipeline engine.
///
/// One instance per process owns the pipeline lock; every collaborator
/// (store, preview model, clock) is injected at construction.
pub struct DeployEngine<C: Clock = SystemClock> {
    pub(crate) config: DeployConfig,
    pub(crate) store: Arc<dyn TaskStore>,
    pub(crate) runner: CommandRunner,
    pub(crate) git: GitTool,
    pub(crate) compare: Option<CompareClient>,
    pub(crate) model: Option<Arc<dyn PreviewModel>>,
    pub(crate) lock: PipelineLock,
    pub(crate) slots: Slots,
    pub(crate) clock: C,
}

/// Build the configured generative preview model, when an API key is
/// available. Hosts pass the result straight into [`DeployEngine::new`].
pub fn build_preview_model(
    config: &DeployConfig,
    api_key: Option<String>,
) -> Option<Arc<dyn PreviewModel>> {
    let api_key = api_key?;
    Some(Arc::new(GeminiPreviewModel::new(
        config.preview_llm_model.clone(),
        api_key,
    )))
}

impl<C: Clock> DeployEngine<C> {
    pub fn new(
        config: DeployConfig,
        store: Arc<dyn TaskStore>,
        model: Option<Arc<dyn PreviewModel>>,
        clock: C,
    ) -> Self {
        let runner = CommandRunner::new(config.deploy_dry_run, config.command_timeout);
        let git = GitTool::new(&config.chatbot_repo_path);
        let compare = config
            .preview_use_github_compare
            .then(|| config.github_compare_repo.clone())
            .flatten()
            .map(|repo| {
                CompareClient::new(
                    repo,
                    config.github_compare_token.clone(),
                    Duration::from_secs(config.github_compare_cache_seconds),
                )
            });
        let slots = Slots::new(
            &config.nginx_green_path,
            &config.nginx_blue_path,
            &config.nginx_live_symlink,
        );
        tracing::info!(
            dry_run = config.deploy_dry_run,
            default_branch = %config.deploy_default_branch,
            allowed_branches = ?config.allowed_branches_sorted(),
            "deploy engine initialized"
        );
        Self {
            config,
            store,
            runner,
            git,
            compare,
            model,
            lock: PipelineLock::new(),
            slots,
            clock,
        }
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    pub fn dry_run(&self) -> bool {
        self.config.deploy_dry_run
    }

    pub fn dev_server_mode(&self) -> bool {
        self.config.dev_server_mode()
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now_utc()
    }

    /// Resolve and validate a branch against the allow-list.
    /// Empty input falls back to the configured default branch.
    pub fn validate_branch(&self, branch: Option<&str>) -> Result<String, EngineError> {
        let branch = branch
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .unwrap_or(&self.config.deploy_default_branch)
            .to_string();
        if !self.config.deploy_allowed_branches.contains(&branch) {
            return Err(EngineError::BranchNotAllowed {
                branch,
                allowed: self.config.allowed_branches_sorted(),
            });
        }
        Ok(branch)
    }

    /// Create a pending deploy task for `branch`.
    pub async fn create_task(&self, branch: Option<&str>) -> Result<DeployTask, EngineError> {
        let branch = self.validate_branch(branch)?;
        let mut metadata = Map::new();
        metadata.insert("branch".to_string(), json!(branch));
        metadata.insert("action".to_string(), json!("deploy"));
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
        tracing::info!(task_id = %task.task_id, branch = %branch, "deploy task created");
        Ok(task)
    }

    /// Fetch a task, mapping absence to a not-found error.
    pub async fn get_task(&self, task_id: &str) -> Result<DeployTask, EngineError> {
        self.store
            .get_task(task_id)
            .await?
            .ok_or_else(|| EngineError::TaskNotFound(task_id.to_string()))
    }

    /// Stage-keyed metadata slice plus the task-level error fields.
    pub async fn get_task_logs(&self, task_id: &str) -> Result<Value, EngineError> {
        let task = self.get_task(task_id).await?;
        Ok(json!({
            "task_id": task.task_id,
            "status": task.status,
            "stages": Self::build_stage_snapshot(&task.metadata),
            "metadata": task.metadata,
            "error_log": task.error_log,
            "failure_context": task.failure_context(),
        }))
    }

    /// Convenience view of the `running_*` stage metadata.
    pub fn build_stage_snapshot(metadata: &Map<String, Value>) -> Value {
        let mut stages = Map::new();
        for stage in DeployStatus::stages() {
            if let Some(entry) = metadata.get(stage.as_str()) {
                stages.insert(stage.as_str().to_string(), entry.clone());
            }
        }
        Value::Object(stages)
    }

    /// Recent task summaries, newest first. `limit` is clamped to 1..=20.
    pub async fn list_recent_tasks(&self, limit: usize) -> Result<Vec<Value>, EngineError> {
        let bounded = limit.clamp(1, 20);
        let tasks = self.store.get_recent_tasks(bounded).await?;
        Ok(tasks.iter().map(|task| self.task_summary(task)).collect())
    }

    pub(crate) fn task_summary(&self, task: &DeployTask) -> Value {
        json!({
            "task_id": task.task_id,
            "status": task.status,
            "branch": task.branch().unwrap_or(&self.config.deploy_default_branch),
            "action": task.action(),
            "started_at": self.as_display_time(task.started_at),
            "completed_at": task.completed_at.map(|at| self.as_display_time(at)),
            "actor": task.actor(),
            "summary": task.summary(),
            "failure_context": task.failure_context(),
        })
    }

    /// Render a timestamp in the configured display timezone.
    /// Unknown timezone names fall back to UTC.
    pub fn as_display_time(&self, at: DateTime<Utc>) -> String {
        match self.config.display_timezone.parse::<chrono_tz::Tz>() {
            Ok(tz) => at.with_timezone(&tz).to_rfc3339(),
            Err(_) => at.to_rfc3339(),
        }
    }

    pub fn display_timezone_name(&self) -> &str {
        &self.config.display_timezone
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
