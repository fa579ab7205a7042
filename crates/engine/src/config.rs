// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime configuration resolved from environment variables.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

/// Split a configured command string into an argument vector.
///
/// Single and double quotes group words (so wrapped shell invocations like
/// `bash -lc "pm2 start npm -- run dev"` survive as one argument); no other
/// shell processing happens here.
pub fn split_command(text: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut in_word = false;
    for c in text.chars() {
        match (c, quote) {
            (q, Some(open)) if q == open => quote = None,
            ('\'', None) | ('"', None) => {
                quote = Some(c);
                in_word = true;
            }
            (c, None) if c.is_whitespace() => {
                if in_word {
                    args.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (c, _) => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if in_word {
        args.push(current);
    }
    args
}

fn env_str(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_bool(name: &str, default: bool) -> bool {
    match env_str(name) {
        Some(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        None => default,
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    env_str(name)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Engine configuration.
///
/// Defaults mirror a single-host nginx blue/green layout; every field can
/// be overridden through the environment variable of the same name
/// (uppercased).
#[derive(Debug, Clone)]
pub struct DeployConfig {
    /// When true, commands are recorded but never executed and the
    /// cutover skips filesystem mutations.
    pub deploy_dry_run: bool,
    pub deploy_default_branch: String,
    pub deploy_allowed_branches: BTreeSet<String>,
    /// Checked-out source tree the pipeline operates on.
    pub chatbot_repo_path: PathBuf,
    /// Relative path of the frontend project within the repo.
    pub frontend_project_subdir: String,
    pub frontend_install_command: Option<Vec<String>>,
    pub frontend_build_command: Vec<String>,
    pub frontend_export_command: Option<Vec<String>>,
    /// Relative path of deployable assets after build/export.
    /// Absent means dev-server mode: the cutover stage is skipped.
    pub frontend_build_output_subdir: Option<String>,
    pub nginx_green_path: PathBuf,
    pub nginx_blue_path: PathBuf,
    pub nginx_live_symlink: PathBuf,
    pub preview_llm_model: String,
    pub preview_diff_max_chars: usize,
    pub preview_use_github_compare: bool,
    pub github_compare_repo: Option<String>,
    pub github_compare_head_ref: Option<String>,
    pub github_compare_token: Option<String>,
    pub github_compare_cache_seconds: u64,
    pub display_timezone: String,
    /// Upper bound for any single pipeline command.
    pub command_timeout: Duration,
}

impl Default for DeployConfig {
    fn default() -> Self {
        let default_branch = "deploy".to_string();
        Self {
            deploy_dry_run: false,
            deploy_allowed_branches: BTreeSet::from([default_branch.clone(), "main".to_string()]),
            deploy_default_branch: default_branch,
            chatbot_repo_path: PathBuf::from("/srv/deploy/frontend"),
            frontend_project_subdir: String::new(),
            frontend_install_command: Some(vec!["npm".into(), "install".into()]),
            frontend_build_command: vec!["npm".into(), "run".into(), "build".into()],
            frontend_export_command: None,
            frontend_build_output_subdir: None,
            nginx_green_path: PathBuf::from("/var/www/deploy/green"),
            nginx_blue_path: PathBuf::from("/var/www/deploy/blue"),
            nginx_live_symlink: PathBuf::from("/var/www/deploy/current"),
            preview_llm_model: "gemini-2.5-flash".to_string(),
            preview_diff_max_chars: 4000,
            preview_use_github_compare: false,
            github_compare_repo: None,
            github_compare_head_ref: None,
            github_compare_token: None,
            github_compare_cache_seconds: 300,
            display_timezone: "UTC".to_string(),
            command_timeout: cutover_adapters::DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

impl DeployConfig {
    /// Build configuration from the process environment, falling back to
    /// the defaults above for unset variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let default_branch =
            env_str("DEPLOY_DEFAULT_BRANCH").unwrap_or(defaults.deploy_default_branch);
        let allowed_branches: BTreeSet<String> = match env_str("DEPLOY_ALLOWED_BRANCHES") {
            Some(raw) => {
                let parsed: BTreeSet<String> = raw
                    .split(',')
                    .map(|b| b.trim().to_string())
                    .filter(|b| !b.is_empty())
                    .collect();
                if parsed.is_empty() {
                    BTreeSet::from([default_branch.clone()])
                } else {
                    parsed
                }
            }
            None => defaults.deploy_allowed_branches,
        };

        Self {
            deploy_dry_run: env_bool("DEPLOY_DRY_RUN", defaults.deploy_dry_run),
            deploy_default_branch: default_branch,
            deploy_allowed_branches: allowed_branches,
            chatbot_repo_path: env_str("CHATBOT_REPO_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.chatbot_repo_path),
            frontend_project_subdir: env_str("FRONTEND_PROJECT_SUBDIR")
                .unwrap_or(defaults.frontend_project_subdir),
            frontend_install_command: env_str("FRONTEND_INSTALL_COMMAND")
                .map(|raw| split_command(&raw))
                .or(defaults.frontend_install_command),
            frontend_build_command: env_str("FRONTEND_BUILD_COMMAND")
                .map(|raw| split_command(&raw))
                .unwrap_or(defaults.frontend_build_command),
            frontend_export_command: env_str("FRONTEND_EXPORT_COMMAND")
                .map(|raw| split_command(&raw)),
            frontend_build_output_subdir: env_str("FRONTEND_BUILD_OUTPUT_SUBDIR"),
            nginx_green_path: env_str("NGINX_GREEN_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.nginx_green_path),
            nginx_blue_path: env_str("NGINX_BLUE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.nginx_blue_path),
            nginx_live_symlink: env_str("NGINX_LIVE_SYMLINK")
                .map(PathBuf::from)
                .unwrap_or(defaults.nginx_live_symlink),
            preview_llm_model: env_str("PREVIEW_LLM_MODEL").unwrap_or(defaults.preview_llm_model),
            preview_diff_max_chars: env_u64(
                "PREVIEW_DIFF_MAX_CHARS",
                defaults.preview_diff_max_chars as u64,
            ) as usize,
            preview_use_github_compare: env_bool(
                "PREVIEW_USE_GITHUB_COMPARE",
                defaults.preview_use_github_compare,
            ),
            github_compare_repo: env_str("GITHUB_COMPARE_REPO"),
            github_compare_head_ref: env_str("GITHUB_COMPARE_HEAD_REF"),
            github_compare_token: env_str("GITHUB_COMPARE_TOKEN"),
            github_compare_cache_seconds: env_u64(
                "GITHUB_COMPARE_CACHE_SECONDS",
                defaults.github_compare_cache_seconds,
            ),
            display_timezone: env_str("DISPLAY_TIMEZONE").unwrap_or(defaults.display_timezone),
            command_timeout: Duration::from_secs(env_u64(
                "DEPLOY_COMMAND_TIMEOUT_SECONDS",
                defaults.command_timeout.as_secs(),
            )),
        }
    }

    /// True when no static build output is configured and the build
    /// command is expected to (re)start a dev server instead.
    pub fn dev_server_mode(&self) -> bool {
        self.frontend_build_output_subdir.is_none()
    }

    /// Absolute path of the frontend project.
    pub fn frontend_project_path(&self) -> PathBuf {
        if self.frontend_project_subdir.is_empty() {
            self.chatbot_repo_path.clone()
        } else {
            self.chatbot_repo_path.join(&self.frontend_project_subdir)
        }
    }

    /// Absolute path of the deployable assets, absent in dev-server mode.
    pub fn frontend_output_path(&self) -> Option<PathBuf> {
        self.frontend_build_output_subdir
            .as_ref()
            .map(|subdir| self.frontend_project_path().join(subdir))
    }

    /// Allowed branches in sorted order (for error messages).
    pub fn allowed_branches_sorted(&self) -> Vec<String> {
        self.deploy_allowed_branches.iter().cloned().collect()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
