// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The four-stage pipeline orchestrator.
//!
//! Stage transitions are validated by the status guard and persisted
//! before each stage body runs; bodies append their own metadata through
//! a deep merge. Failures are recorded as `failure_context` and may
//! trigger an auto-rollback when the failing command is allow-listed.

use crate::error::EngineError;
use crate::lock::LockGuard;
use crate::service::DeployEngine;
use cutover_adapters::{identity, CommandError};
use cutover_core::{is_valid_transition, Clock, DeployStatus, DeployTask, TaskUpdate};
use serde_json::{json, Map, Value};

/// Bytes of stdout/stderr tail kept in `failure_context`.
const OUTPUT_TAIL_BYTES: usize = 500;

/// Closed allow-list of auto-recoverable commands: package-manager
/// installs, process-manager starts, and shell lines that start npm under
/// pm2. Anything else fails the deploy without an automatic rollback.
pub(crate) fn is_auto_recoverable(command: &str) -> bool {
    let tokens: Vec<&str> = command.split_whitespace().collect();
    let Some(first) = tokens.first() else {
        return false;
    };
    let program = first.rsplit('/').next().unwrap_or(first);
    match program {
        "npm" | "pnpm" | "yarn" => tokens.iter().any(|t| *t == "install" || *t == "ci"),
        "pm2" => tokens.iter().any(|t| *t == "start"),
        "bash" | "sh" | "zsh" => command.contains("pm2 start npm"),
        _ => false,
    }
}

/// Last `max_bytes` of `text`, respecting char boundaries.
pub(crate) fn output_tail(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut start = text.len() - max_bytes;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

impl<C: Clock> DeployEngine<C> {
    /// Run the full pipeline for a pending task.
    ///
    /// Returns the terminal task document; a stage failure is recorded on
    /// the task (status `failed` plus `failure_context`) and still
    /// resolves to `Ok`. `Err` is reserved for infrastructure problems
    /// (unknown task, store unavailable).
    pub async fn run_pipeline(
        &self,
        task_id: &str,
        branch: &str,
        target_commit: Option<&str>,
        force_push: bool,
    ) -> Result<DeployTask, EngineError> {
        let guard = self.lock.acquire().await;
        self.run_pipeline_locked(&guard, task_id, branch, target_commit, force_push)
            .await
    }

    /// Pipeline body, running under an already-held lock ownership.
    /// Nested runs (auto-rollback) re-enter with the same owner.
    pub(crate) async fn run_pipeline_locked(
        &self,
        guard: &LockGuard<'_>,
        task_id: &str,
        branch: &str,
        target_commit: Option<&str>,
        force_push: bool,
    ) -> Result<DeployTask, EngineError> {
        let _stage_lock = self.lock.reenter(guard);
        let span = tracing::info_span!("pipeline", task_id, branch);
        let _enter = span.enter();
        tracing::info!(?target_commit, force_push, "starting deploy pipeline");

        let task = self.get_task(task_id).await?;
        let action = task.action().to_string();

        // Pre-flight snapshot is advisory: persist it, but never let it
        // stop the pipeline.
        let snapshot = self.preflight_snapshot().await;
        let mut preflight = Map::new();
        preflight.insert("summary".to_string(), json!({ "preflight": snapshot }));
        if let Err(err) = self
            .store
            .update_task(task_id, TaskUpdate::append(preflight))
            .await
        {
            tracing::warn!(error = %err, "failed to persist preflight snapshot");
        }

        match self
            .execute_stages(task_id, branch, target_commit, force_push)
            .await
        {
            Ok(()) => self.finish_success(task_id).await,
            Err(err) => {
                self.finish_failure(guard, task_id, branch, &action, err)
                    .await
            }
        }
    }

    async fn execute_stages(
        &self,
        task_id: &str,
        branch: &str,
        target_commit: Option<&str>,
        force_push: bool,
    ) -> Result<(), EngineError> {
        for stage in DeployStatus::stages() {
            self.ensure_valid_transition(task_id, stage).await?;
            let body = match stage {
                DeployStatus::RunningClone => {
                    self.run_clone_stage(branch, target_commit, force_push).await?
                }
                DeployStatus::RunningBuild => self.run_build_stage().await?,
                DeployStatus::RunningCutover => self.run_cutover_stage().await?,
                _ => self.run_observability_stage(),
            };
            self.append_stage_metadata(task_id, stage, body).await?;
        }
        Ok(())
    }

    /// Validate and persist a stage transition, stamping the stage entry.
    async fn ensure_valid_transition(
        &self,
        task_id: &str,
        new_status: DeployStatus,
    ) -> Result<(), EngineError> {
        let task = self.get_task(task_id).await?;
        if !is_valid_transition(task.status, new_status) {
            return Err(EngineError::InvalidTransition {
                from: task.status,
                to: new_status,
            });
        }
        let mut append = Map::new();
        append.insert(
            new_status.as_str().to_string(),
            json!({ "timestamp": self.now().to_rfc3339() }),
        );
        let update = TaskUpdate {
            status: Some(new_status),
            append_metadata: append,
            ..TaskUpdate::default()
        };
        self.store.update_task(task_id, update).await?;
        Ok(())
    }

    async fn append_stage_metadata(
        &self,
        task_id: &str,
        stage: DeployStatus,
        body: Map<String, Value>,
    ) -> Result<(), EngineError> {
        let mut append = Map::new();
        append.insert(stage.as_str().to_string(), Value::Object(body));
        self.store
            .update_task(task_id, TaskUpdate::append(append))
            .await?;
        Ok(())
    }

    async fn run_clone_stage(
        &self,
        branch: &str,
        target_commit: Option<&str>,
        force_push: bool,
    ) -> Result<Map<String, Value>, EngineError> {
        let cwd = self.config.chatbot_repo_path.clone();
        let mut steps = Vec::new();

        let fetch = self
            .runner
            .run(
                &argv(&["git", "fetch", "origin"]),
                Some(&cwd),
                "Fetch latest refs from origin",
            )
            .await?;
        steps.push(fetch.to_value());

        match target_commit {
            Some(commit) => {
                let checkout = self
                    .runner
                    .run(
                        &argv(&["git", "checkout", "-B", branch, commit]),
                        Some(&cwd),
                        "Checkout branch at the target commit",
                    )
                    .await?;
                steps.push(checkout.to_value());
                let reset = self
                    .runner
                    .run(
                        &argv(&["git", "reset", "--hard", commit]),
                        Some(&cwd),
                        "Hard reset working tree to the target commit",
                    )
                    .await?;
                steps.push(reset.to_value());
            }
            None => {
                let origin_ref = format!("origin/{branch}");
                let checkout = self
                    .runner
                    .run(
                        &argv(&["git", "checkout", "-B", branch, &origin_ref]),
                        Some(&cwd),
                        "Checkout deploy branch aligned with origin",
                    )
                    .await?;
                steps.push(checkout.to_value());
                let reset = self
                    .runner
                    .run(
                        &argv(&["git", "reset", "--hard", &origin_ref]),
                        Some(&cwd),
                        "Hard reset working tree to origin",
                    )
                    .await?;
                steps.push(reset.to_value());
            }
        }

        let clean = self
            .runner
            .run(
                &argv(&["git", "clean", "-fdx"]),
                Some(&cwd),
                "Remove untracked files (full replace)",
            )
            .await?;
        steps.push(clean.to_value());

        let mut body = Map::new();
        body.insert("branch".to_string(), json!(branch));
        if let Some(commit) = target_commit {
            body.insert("target_commit".to_string(), json!(commit));
            if force_push {
                let refspec = format!("+{commit}:{branch}");
                let push = self
                    .runner
                    .run(
                        &argv(&["git", "push", "origin", &refspec]),
                        Some(&cwd),
                        "Force push the target commit to origin",
                    )
                    .await?;
                body.insert("force_push".to_string(), push.to_value());
            }
        }
        body.insert("steps".to_string(), json!(steps));
        Ok(body)
    }

    async fn run_build_stage(&self) -> Result<Map<String, Value>, EngineError> {
        let cwd = self.config.frontend_project_path();
        let mut steps = Vec::new();

        if let Some(install) = &self.config.frontend_install_command {
            let record = self
                .runner
                .run(install, Some(&cwd), "Install frontend dependencies")
                .await?;
            steps.push(record.to_value());
        }
        let build = self
            .runner
            .run(
                &self.config.frontend_build_command,
                Some(&cwd),
                "Build frontend artifacts",
            )
            .await?;
        steps.push(build.to_value());
        if let Some(export) = &self.config.frontend_export_command {
            let record = self
                .runner
                .run(export, Some(&cwd), "Export static assets")
                .await?;
            steps.push(record.to_value());
        }

        let mut body = Map::new();
        body.insert("project_path".to_string(), json!(cwd.display().to_string()));
        body.insert("steps".to_string(), json!(steps));
        Ok(body)
    }

    async fn run_cutover_stage(&self) -> Result<Map<String, Value>, EngineError> {
        if self.config.dev_server_mode() {
            let mut body = Map::new();
            body.insert("skipped".to_string(), json!(true));
            body.insert(
                "reason".to_string(),
                json!("dev-server mode: no static build output configured"),
            );
            body.insert("dry_run".to_string(), json!(self.dry_run()));
            return Ok(body);
        }
        let Some(source) = self.config.frontend_output_path() else {
            // dev_server_mode() is false only when the output subdir is set.
            return Err(EngineError::MissingBuildDir(
                self.config.frontend_project_path(),
            ));
        };
        let record = self.slots.cutover(&source, self.dry_run())?;
        match serde_json::to_value(&record) {
            Ok(Value::Object(body)) => Ok(body),
            _ => Ok(Map::new()),
        }
    }

    fn run_observability_stage(&self) -> Map<String, Value> {
        // Placeholder until health/latency probes land.
        let mut body = Map::new();
        body.insert(
            "message".to_string(),
            json!("Observability checks are not implemented yet."),
        );
        body.insert("dry_run".to_string(), json!(self.dry_run()));
        body
    }

    async fn finish_success(&self, task_id: &str) -> Result<DeployTask, EngineError> {
        self.store
            .mark_status(task_id, DeployStatus::Completed, None)
            .await?;

        let mut summary = Map::new();
        summary.insert("completed_at".to_string(), json!(self.now().to_rfc3339()));
        summary.insert("result".to_string(), json!("success"));
        summary.insert("actor".to_string(), json!(identity::resolve_actor()));
        if self.dry_run() {
            summary.insert("commit".to_string(), json!("dry-run"));
        } else {
            let details = self.git.commit_details("HEAD").await?;
            summary.insert("commit".to_string(), json!(details.sha));
            summary.insert(
                "git_commit".to_string(),
                json!({
                    "author": details.author_name,
                    "email": details.author_email,
                    "subject": details.subject,
                }),
            );
        }
        let mut append = Map::new();
        append.insert("summary".to_string(), Value::Object(summary));
        self.store
            .update_task(task_id, TaskUpdate::append(append))
            .await?;

        tracing::info!(task_id, "deploy pipeline succeeded");
        self.get_task(task_id).await
    }

    async fn finish_failure(
        &self,
        guard: &LockGuard<'_>,
        task_id: &str,
        branch: &str,
        action: &str,
        err: EngineError,
    ) -> Result<DeployTask, EngineError> {
        let message = err.to_string();
        tracing::error!(task_id, error = %message, "deploy pipeline failed");
        self.store
            .mark_status(task_id, DeployStatus::Failed, Some(message.clone()))
            .await?;

        let mut failure = Map::new();
        failure.insert("timestamp".to_string(), json!(self.now().to_rfc3339()));
        failure.insert("error".to_string(), json!(message));
        let mut failed_command = None;
        if let EngineError::Command(CommandError::Failed {
            command,
            cwd,
            returncode,
            stdout,
            stderr,
        }) = &err
        {
            failure.insert("command".to_string(), json!(command));
            failure.insert(
                "cwd".to_string(),
                json!(cwd.as_ref().map(|p| p.display().to_string())),
            );
            failure.insert("returncode".to_string(), json!(returncode));
            failure.insert(
                "stdout".to_string(),
                json!(output_tail(stdout, OUTPUT_TAIL_BYTES)),
            );
            failure.insert(
                "stderr".to_string(),
                json!(output_tail(stderr, OUTPUT_TAIL_BYTES)),
            );
            failed_command = Some(command.clone());
        }
        let mut append = Map::new();
        append.insert("failure_context".to_string(), Value::Object(failure));
        self.store
            .update_task(task_id, TaskUpdate::append(append))
            .await?;

        // Rollback tasks never recurse into auto-recovery.
        if action != "rollback" {
            let recovery = match failed_command {
                Some(command) if is_auto_recoverable(&command) => {
                    self.attempt_auto_rollback(guard, branch).await
                }
                Some(_) => json!({
                    "status": "skipped",
                    "reason": "command is not auto-recoverable",
                }),
                None => json!({
                    "status": "skipped",
                    "reason": "non-command failure",
                }),
            };
            let mut append = Map::new();
            append.insert(
                "failure_context".to_string(),
                json!({ "auto_recovery": recovery }),
            );
            self.store
                .update_task(task_id, TaskUpdate::append(append))
                .await?;
        }

        self.get_task(task_id).await
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
