// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pre-flight preview: diff context, risk, cost, LLM summary, and the
//! assembled preview payload.

use crate::diff::{
    dedup_warnings, estimate_cost, estimate_stage_seconds, summarize_name_status,
    warnings_for_stats, CostEstimate, DiffStats, StageEstimates,
};
use crate::error::EngineError;
use crate::service::DeployEngine;
use crate::slots::Slot;
use cutover_adapters::{
    build_preview_prompt, is_full_commit_sha, parse_preview_response, truncate_diff, LlmPreview,
};
use cutover_core::{Clock, DeployStatus, DeployTask};
use serde::Serialize;
use serde_json::{json, Value};

/// Internal record feeding both the preview API and the LLM client.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewContext {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_commit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_commit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_stats: Option<DiffStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compare_metadata: Option<Value>,
}

impl PreviewContext {
    pub(crate) fn not_ready(reason: impl Into<String>) -> Self {
        Self {
            ready: false,
            reason: Some(reason.into()),
            base_commit: None,
            head_commit: None,
            diff_output: None,
            diff_stats: None,
            diff_source: None,
            compare_metadata: None,
        }
    }
}

impl<C: Clock> DeployEngine<C> {
    /// Build the preview context for the next deploy on the default
    /// branch: base = last successful commit, head = current HEAD.
    pub async fn preview_context(&self) -> PreviewContext {
        let branch = &self.config.deploy_default_branch;
        let successes = match self.store.get_recent_successes(branch, 1).await {
            Ok(successes) => successes,
            Err(err) => {
                return PreviewContext::not_ready(format!("task store unavailable: {err}"))
            }
        };
        let Some(latest) = successes.first() else {
            return PreviewContext::not_ready(format!(
                "no successful deploy recorded on branch '{branch}'"
            ));
        };
        let Some(base) = latest.summary_commit().map(str::to_string) else {
            return PreviewContext::not_ready(
                "last successful deploy has no recorded commit".to_string(),
            );
        };
        if !is_full_commit_sha(&base) {
            return PreviewContext::not_ready(format!(
                "recorded base commit '{base}' is not a full commit SHA"
            ));
        }
        let head = match self.git.head_commit().await {
            Ok(head) => head,
            Err(err) => {
                return PreviewContext::not_ready(format!("unable to resolve HEAD: {err}"))
            }
        };
        if !is_full_commit_sha(&head) {
            return PreviewContext::not_ready(format!(
                "current HEAD '{head}' is not a full commit SHA"
            ));
        }
        if head == base {
            return PreviewContext::not_ready("HEAD is already the last deployed commit");
        }

        let mut diff_source = "local-git";
        let mut compare_metadata = None;
        let mut diff_output = None;
        if let Some(client) = &self.compare {
            // The remote may be asked about a symbolic head (e.g. a branch
            // ref) instead of the local SHA.
            let compare_head = self
                .config
                .github_compare_head_ref
                .as_deref()
                .unwrap_or(&head);
            match client.compare(&base, compare_head).await {
                Ok(result) => {
                    diff_source = "github-compare";
                    compare_metadata = Some(json!({
                        "html_url": result.html_url,
                        "permalink_url": result.permalink_url,
                        "compare_url": result.compare_url,
                        "ahead_by": result.ahead_by,
                        "behind_by": result.behind_by,
                        "total_commits": result.total_commits,
                        "status": result.status,
                    }));
                    diff_output = Some(result.to_name_status());
                }
                Err(err) => {
                    tracing::warn!(error = %err, "compare API failed, falling back to local diff");
                }
            }
        }
        let diff_output = match diff_output {
            Some(text) => text,
            None => match self.git.diff_name_status(&base, &head).await {
                Ok(text) => text,
                Err(err) => {
                    return PreviewContext::not_ready(format!("unable to diff {base}..{head}: {err}"))
                }
            },
        };

        let diff_stats = summarize_name_status(&diff_output);
        PreviewContext {
            ready: true,
            reason: None,
            base_commit: Some(base),
            head_commit: Some(head),
            diff_output: Some(diff_output),
            diff_stats: Some(diff_stats),
            diff_source: Some(diff_source.to_string()),
            compare_metadata,
        }
    }

    /// Best-effort structured summary of the upcoming diff.
    ///
    /// Always returns the `{summary, highlights, risks}` envelope; when
    /// disabled, not ready, or failing, `summary` carries the reason.
    pub async fn llm_preview(&self, ctx: &PreviewContext) -> LlmPreview {
        let Some(model) = &self.model else {
            return LlmPreview::unavailable("preview model disabled");
        };
        if !ctx.ready {
            let reason = ctx.reason.as_deref().unwrap_or("preview context not ready");
            return LlmPreview::unavailable(format!("preview unavailable: {reason}"));
        }
        let diff = truncate_diff(
            ctx.diff_output.as_deref().unwrap_or_default(),
            self.config.preview_diff_max_chars,
        );
        let prompt = build_preview_prompt(
            &self.config.deploy_default_branch,
            ctx.base_commit.as_deref().unwrap_or_default(),
            ctx.head_commit.as_deref().unwrap_or_default(),
            &diff,
        );
        match model.generate(&prompt).await {
            Ok(text) => parse_preview_response(&text),
            Err(err) => {
                tracing::warn!(error = %err, "preview model call failed");
                LlmPreview::unavailable(format!("preview model call failed: {err}"))
            }
        }
    }

    /// Risk payload: derived level and flags plus the fixed operational
    /// notes of the blue/green setup.
    pub(crate) fn risk_assessment_value(&self, ctx: &PreviewContext, stats: &DiffStats) -> Value {
        json!({
            "risk_level": stats.risk_level,
            "file_count": stats.file_count,
            "lockfile_changed": stats.lockfile_changed,
            "env_changed": stats.env_changed,
            "config_changed": stats.config_changed,
            "sensitive_changed": stats.sensitive_changed,
            "test_files_changed": stats.test_files_changed,
            "diff_ready": ctx.ready,
            "notes": {
                "downtime": "Minimal (blue/green symlink swap)",
                "rollback": "Symlink revert to the previous slot",
                "observability": "Manual checks pending automation",
            },
        })
    }

    /// Pre-flight snapshot persisted under `summary.preflight` before the
    /// first stage runs.
    pub async fn preflight_snapshot(&self) -> Value {
        let ctx = self.preview_context().await;
        let stats = ctx.diff_stats.clone().unwrap_or_default();
        let estimates = estimate_stage_seconds(&stats);
        let cost = estimate_cost(&estimates, &stats);
        let llm = self.llm_preview(&ctx).await;
        json!({
            "cost_estimate": cost,
            "risk_assessment": self.risk_assessment_value(&ctx, &stats),
            "llm_preview": llm,
            "generated_at": self.now().to_rfc3339(),
        })
    }

    /// Human-readable command plan for the next deploy.
    pub fn plan_commands(&self) -> Vec<String> {
        let branch = &self.config.deploy_default_branch;
        let mut commands = vec![
            "git fetch origin".to_string(),
            format!("git checkout -B {branch} origin/{branch}"),
            format!("git reset --hard origin/{branch}"),
            "git clean -fdx".to_string(),
        ];
        if let Some(install) = &self.config.frontend_install_command {
            commands.push(install.join(" "));
        }
        commands.push(self.config.frontend_build_command.join(" "));
        if let Some(export) = &self.config.frontend_export_command {
            commands.push(export.join(" "));
        }
        if self.config.dev_server_mode() {
            commands.push("dev-server mode: no static assets to sync".to_string());
        } else {
            commands.push("sync static assets to the standby slot".to_string());
        }
        commands
    }

    fn stage_checks(&self, stage: DeployStatus) -> Vec<String> {
        match stage {
            DeployStatus::RunningClone => vec![
                "fetch refs from origin".to_string(),
                "align working tree with the target commit".to_string(),
                "remove untracked files".to_string(),
            ],
            DeployStatus::RunningBuild => {
                let mut checks = Vec::new();
                if let Some(install) = &self.config.frontend_install_command {
                    checks.push(install.join(" "));
                }
                checks.push(self.config.frontend_build_command.join(" "));
                if let Some(export) = &self.config.frontend_export_command {
                    checks.push(export.join(" "));
                }
                checks
            }
            DeployStatus::RunningCutover => {
                if self.config.dev_server_mode() {
                    vec!["skipped in dev-server mode".to_string()]
                } else {
                    vec![
                        "verify build output directory".to_string(),
                        "copy assets to the standby slot".to_string(),
                        "swap the live symlink".to_string(),
                    ]
                }
            }
            _ => vec!["placeholder: watch dashboards manually".to_string()],
        }
    }

    fn stage_plan(stage: DeployStatus) -> &'static str {
        match stage {
            DeployStatus::RunningClone => "Sync the checkout with origin",
            DeployStatus::RunningBuild => "Install dependencies and build the frontend",
            DeployStatus::RunningCutover => "Populate the standby slot and swap the symlink",
            _ => "Run observability checks",
        }
    }

    fn stage_expected_seconds(estimates: &StageEstimates, stage: DeployStatus) -> u64 {
        match stage {
            DeployStatus::RunningClone => estimates.clone_seconds,
            DeployStatus::RunningBuild => estimates.build_seconds,
            DeployStatus::RunningCutover => estimates.cutover_seconds,
            _ => estimates.observability_seconds,
        }
    }

    fn stage_progress(task: Option<&DeployTask>, stage: DeployStatus) -> &'static str {
        let Some(task) = task else {
            return if stage == DeployStatus::RunningClone {
                "upcoming"
            } else {
                "pending"
            };
        };
        let stage_index = DeployStatus::stages()
            .iter()
            .position(|s| *s == stage)
            .unwrap_or(0);
        match task.status {
            DeployStatus::Completed => "completed",
            DeployStatus::Pending => {
                if stage == DeployStatus::RunningClone {
                    "upcoming"
                } else {
                    "pending"
                }
            }
            DeployStatus::Failed => {
                // Reconstruct progress from recorded stage metadata.
                match task.metadata.get(stage.as_str()) {
                    Some(Value::Object(body)) if body.len() > 1 => "completed",
                    Some(_) => "upcoming",
                    None => "pending",
                }
            }
            current => {
                let current_index = DeployStatus::stages()
                    .iter()
                    .position(|s| *s == current)
                    .unwrap_or(0);
                if stage_index < current_index {
                    "completed"
                } else if stage_index == current_index {
                    "upcoming"
                } else {
                    "pending"
                }
            }
        }
    }

    /// Per-stage timeline with expected durations and progress markers.
    pub(crate) fn timeline_preview(
        &self,
        estimates: &StageEstimates,
        task: Option<&DeployTask>,
    ) -> Vec<Value> {
        DeployStatus::stages()
            .into_iter()
            .map(|stage| {
                json!({
                    "stage": stage.as_str(),
                    "plan": Self::stage_plan(stage),
                    "expected_seconds": Self::stage_expected_seconds(estimates, stage),
                    "status": Self::stage_progress(task, stage),
                    "checks": self.stage_checks(stage),
                })
            })
            .collect()
    }

    /// Active/standby slot snapshot.
    pub fn describe_blue_green_state(&self) -> Value {
        let active = self.slots.read_active();
        let standby = match active {
            Slot::Green => Slot::Blue,
            Slot::Blue => Slot::Green,
            Slot::Unknown => Slot::Unknown,
        };
        json!({
            "active_slot": active,
            "standby_slot": standby,
            "last_cutover_at": self.slots.last_cutover_at().map(|at| self.as_display_time(at)),
            "next_cutover_target": self.slots.next_target(),
        })
    }

    /// Rough ETA in minutes for the next pipeline run.
    pub async fn estimate_runtime_minutes(&self) -> u64 {
        let ctx = self.preview_context().await;
        let stats = ctx.diff_stats.unwrap_or_default();
        let estimates = estimate_stage_seconds(&stats);
        estimate_cost(&estimates, &stats).runtime_minutes
    }

    /// Assemble the full preview payload, optionally anchored to a task.
    pub async fn get_preview(&self, task_id: Option<&str>) -> Result<Value, EngineError> {
        let task = match task_id {
            Some(id) => Some(self.get_task(id).await?),
            None => None,
        };

        let ctx = self.preview_context().await;
        let stats = ctx.diff_stats.clone().unwrap_or_default();
        let estimates = estimate_stage_seconds(&stats);
        let cost: CostEstimate = estimate_cost(&estimates, &stats);
        let llm = self.llm_preview(&ctx).await;

        let mut warnings = Vec::new();
        if let Some(reason) = &ctx.reason {
            warnings.push(format!("Preview diff unavailable: {reason}"));
        }
        warnings.extend(warnings_for_stats(&stats));
        if let Some(task) = &task {
            if task.failure_context().is_some() {
                warnings.push(format!(
                    "Task {} recorded failure context; review it before redeploying.",
                    task.task_id
                ));
            }
            if let Some(error_log) = &task.error_log {
                warnings.push(format!("Task {} failed: {error_log}", task.task_id));
            }
        }
        let warnings = dedup_warnings(warnings);

        let mut payload = json!({
            "current_branch": self.config.deploy_default_branch,
            "target_repo": self.config.chatbot_repo_path.display().to_string(),
            "frontend_project_path": self.config.frontend_project_path().display().to_string(),
            "frontend_output_path": self
                .config
                .frontend_output_path()
                .map(|p| p.display().to_string()),
            "commands": self.plan_commands(),
            "risk_assessment": self.risk_assessment_value(&ctx, &stats),
            "cost_estimate": cost,
            "llm_preview": llm,
            "timeline_preview": self.timeline_preview(&estimates, task.as_ref()),
            "warnings": warnings,
            "blue_green_plan": self.describe_blue_green_state(),
            "preview_context": ctx,
        });
        if let Some(task) = task {
            if let Some(payload) = payload.as_object_mut() {
                let mut context = self.task_summary(&task);
                if let Some(context) = context.as_object_mut() {
                    context.insert(
                        "stages".to_string(),
                        Self::build_stage_snapshot(&task.metadata),
                    );
                }
                payload.insert("task_context".to_string(), context);
            }
        }
        Ok(payload)
    }
}

#[cfg(test)]
#[path = "preview_tests.rs"]
mod tests;
