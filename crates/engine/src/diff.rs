// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Diff statistics, risk scoring, warnings, and stage-time estimates.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Hourly infrastructure rate used for the cost estimate, in USD.
const HOURLY_RATE_USD: f64 = 6.0;

/// Risk classification of an upcoming deploy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

/// Summary of a name-status diff between the last deployed commit and HEAD.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffStats {
    pub file_count: usize,
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
    pub paths: Vec<String>,
    pub lockfile_changed: bool,
    pub env_changed: bool,
    pub config_changed: bool,
    pub sensitive_changed: bool,
    pub test_files_changed: bool,
    pub risk_level: RiskLevel,
}

const LOCKFILES: [&str; 4] = [
    "package-lock.json",
    "npm-shrinkwrap.json",
    "pnpm-lock.yaml",
    "yarn.lock",
];

fn is_lockfile(path: &str) -> bool {
    let basename = path.rsplit('/').next().unwrap_or(path);
    LOCKFILES.contains(&basename)
}

fn is_env_file(path: &str) -> bool {
    path.contains(".env") || path.contains("secrets")
}

fn is_config_file(path: &str) -> bool {
    let structured = path.ends_with(".yml") || path.ends_with(".yaml") || path.ends_with(".json");
    structured && (path.contains("infra") || path.contains("deploy") || path.contains("config"))
}

fn is_sensitive_file(path: &str) -> bool {
    path.contains("secret")
        || path.contains("cert")
        || path.ends_with(".pem")
        || path.ends_with(".key")
        || path.ends_with(".crt")
}

fn is_test_file(path: &str) -> bool {
    path.contains("tests/") || path.contains("/test/") || path.contains(".spec") || path.contains(".test")
}

/// Derive diff statistics from `git diff --name-status` text.
///
/// Each line is `<letter>\t<path>` (rename lines carry an extra column;
/// the new path counts). Unknown letters count as modifications.
pub fn summarize_name_status(diff: &str) -> DiffStats {
    let mut stats = DiffStats::default();
    for line in diff.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut columns = line.split('\t');
        let status = columns.next().unwrap_or_default();
        // For renames the last column is the destination path.
        let path = columns.last().unwrap_or_default();
        if path.is_empty() {
            continue;
        }
        match status.chars().next() {
            Some('A') => stats.added += 1,
            Some('D') => stats.deleted += 1,
            _ => stats.modified += 1,
        }
        let lowered = path.to_ascii_lowercase();
        stats.lockfile_changed |= is_lockfile(&lowered);
        stats.env_changed |= is_env_file(&lowered);
        stats.config_changed |= is_config_file(&lowered);
        stats.sensitive_changed |= is_sensitive_file(&lowered);
        stats.test_files_changed |= is_test_file(&lowered);
        stats.paths.push(path.to_string());
    }
    stats.file_count = stats.paths.len();
    stats.risk_level = risk_level(&stats);
    stats
}

/// Risk classification: small clean diffs are low, env changes or very
/// large diffs are high, everything between is medium.
fn risk_level(stats: &DiffStats) -> RiskLevel {
    if stats.file_count == 0 {
        return RiskLevel::Low;
    }
    if stats.file_count < 5 && !stats.env_changed && !stats.config_changed {
        return RiskLevel::Low;
    }
    if stats.env_changed || stats.file_count >= 20 {
        return RiskLevel::High;
    }
    RiskLevel::Medium
}

/// Threshold above which a diff earns the large-diff warning.
pub const LARGE_DIFF_FILES: usize = 20;

/// Ordered, deduplicated warnings derived from diff statistics.
///
/// Never empty: the manual-smoke-test and observability reminders are
/// always present.
pub fn warnings_for_stats(stats: &DiffStats) -> Vec<String> {
    let mut warnings = Vec::new();
    if stats.file_count == 0 {
        warnings.push(
            "No changes detected between the last successful deploy and HEAD.".to_string(),
        );
    }
    if stats.lockfile_changed {
        warnings.push(
            "Lockfile changed: dependency install may take longer and alter build output."
                .to_string(),
        );
    }
    if stats.env_changed {
        warnings.push(
            "Environment or secrets files changed: verify runtime configuration before cutover."
                .to_string(),
        );
    }
    if stats.config_changed {
        warnings.push(
            "Infrastructure or deploy configuration changed: review the config diff carefully."
                .to_string(),
        );
    }
    if stats.sensitive_changed {
        warnings.push(
            "Sensitive files changed (certificates or keys): double-check before deploying."
                .to_string(),
        );
    }
    if stats.test_files_changed {
        warnings.push("Test files changed: confirm the suite is green upstream.".to_string());
    }
    if stats.file_count >= LARGE_DIFF_FILES {
        warnings.push(format!(
            "Large diff ({} files): consider splitting this deploy.",
            stats.file_count
        ));
    }
    warnings.push("Run manual smoke tests before cutover.".to_string());
    warnings.push(
        "Observability checks are not automated; watch dashboards after cutover.".to_string(),
    );
    dedup_warnings(warnings)
}

/// Remove duplicates while preserving first-occurrence order.
pub fn dedup_warnings(warnings: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    warnings
        .into_iter()
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

/// Expected duration of each pipeline stage, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageEstimates {
    pub clone_seconds: u64,
    pub build_seconds: u64,
    pub cutover_seconds: u64,
    pub observability_seconds: u64,
}

impl StageEstimates {
    pub fn total_seconds(&self) -> u64 {
        self.clone_seconds + self.build_seconds + self.cutover_seconds + self.observability_seconds
    }
}

/// Stage-time estimates driven by diff size and dependency churn.
pub fn estimate_stage_seconds(stats: &DiffStats) -> StageEstimates {
    let files = stats.file_count as u64;
    let mut build = 90 + 5 * files;
    if stats.lockfile_changed {
        build += 45;
    }
    if stats.config_changed {
        build += 15;
    }
    StageEstimates {
        clone_seconds: 35 + files.min(20),
        build_seconds: build.min(420),
        cutover_seconds: 25,
        observability_seconds: 20,
    }
}

/// Runtime/cost estimate for the preview payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub runtime_minutes: u64,
    pub hourly_cost_usd: f64,
    pub total_seconds: u64,
    pub hourly_rate_usd: f64,
    /// Inputs the estimate was derived from.
    pub drivers: Value,
}

/// Derive the cost estimate from stage estimates and their drivers.
pub fn estimate_cost(estimates: &StageEstimates, stats: &DiffStats) -> CostEstimate {
    let total = estimates.total_seconds();
    let runtime_minutes = ((total as f64) / 60.0).round().max(1.0) as u64;
    let hourly_cost_usd = ((total as f64) / 3600.0 * HOURLY_RATE_USD * 100.0).round() / 100.0;
    CostEstimate {
        runtime_minutes,
        hourly_cost_usd,
        total_seconds: total,
        hourly_rate_usd: HOURLY_RATE_USD,
        drivers: json!({
            "file_count": stats.file_count,
            "lockfile_changed": stats.lockfile_changed,
            "config_changed": stats.config_changed,
            "stage_seconds": {
                "clone": estimates.clone_seconds,
                "build": estimates.build_seconds,
                "cutover": estimates.cutover_seconds,
                "observability": estimates.observability_seconds,
            },
        }),
    }
}

#[cfg(test)]
#[path = "diff_tests.rs"]
mod tests;
