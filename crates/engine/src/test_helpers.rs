// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests.

use crate::config::DeployConfig;
use crate::service::DeployEngine;
use async_trait::async_trait;
use chrono::Duration;
use cutover_adapters::{LlmError, PreviewModel};
use cutover_core::{new_task_id, DeployStatus, FakeClock, TaskCreate, TaskUpdate};
use cutover_store::{MemoryTaskStore, TaskStore};
use serde_json::{json, Map, Value};
use std::sync::Arc;

pub(crate) struct Fixture {
    pub _dir: tempfile::TempDir,
    pub store: Arc<MemoryTaskStore>,
    pub store_clock: Arc<FakeClock>,
    pub engine: DeployEngine<FakeClock>,
}

pub(crate) fn fixture() -> Fixture {
    fixture_with(|_| {})
}

/// Dry-run engine over a memory store, rooted in a temp directory.
pub(crate) fn fixture_with(tweak: impl FnOnce(&mut DeployConfig)) -> Fixture {
    fixture_with_model(None, tweak)
}

pub(crate) fn fixture_with_model(
    model: Option<Arc<dyn PreviewModel>>,
    tweak: impl FnOnce(&mut DeployConfig),
) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path().join("repo");
    std::fs::create_dir_all(&repo).unwrap();

    let mut config = DeployConfig {
        deploy_dry_run: true,
        chatbot_repo_path: repo,
        nginx_green_path: dir.path().join("slots/green"),
        nginx_blue_path: dir.path().join("slots/blue"),
        nginx_live_symlink: dir.path().join("slots/current"),
        ..DeployConfig::default()
    };
    tweak(&mut config);

    let store_clock = Arc::new(FakeClock::new());
    let store = Arc::new(MemoryTaskStore::with_clock(store_clock.clone()));
    let engine = DeployEngine::new(
        config,
        store.clone() as Arc<dyn TaskStore>,
        model,
        FakeClock::new(),
    );
    Fixture {
        _dir: dir,
        store,
        store_clock,
        engine,
    }
}

pub(crate) fn meta(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

/// Seed a completed deploy on `branch` with a recorded summary commit.
pub(crate) async fn seed_success(fx: &Fixture, branch: &str, commit: &str) -> String {
    let task = fx
        .store
        .create_task(TaskCreate::pending(
            new_task_id(),
            meta(json!({"branch": branch, "action": "deploy"})),
        ))
        .await
        .unwrap();
    fx.store_clock.advance(Duration::seconds(30));
    fx.store
        .mark_status(&task.task_id, DeployStatus::Completed, None)
        .await
        .unwrap();
    fx.store
        .update_task(
            &task.task_id,
            TaskUpdate::append(meta(json!({"summary": {"commit": commit, "result": "success"}}))),
        )
        .await
        .unwrap();
    fx.store_clock.advance(Duration::seconds(30));
    task.task_id
}

/// Preview model returning a canned response.
pub(crate) struct StaticModel(pub String);

#[async_trait]
impl PreviewModel for StaticModel {
    async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
        Ok(self.0.clone())
    }
}

/// Preview model that always fails.
pub(crate) struct BrokenModel;

#[async_trait]
impl PreviewModel for BrokenModel {
    async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
        Err(LlmError::EmptyResponse)
    }
}

/// Initialize a git repository with one commit; returns the head SHA.
pub(crate) fn init_git_repo(path: &std::path::Path) -> String {
    git(path, &["init", "-q", "-b", "deploy"]);
    std::fs::write(path.join("index.html"), "<html>v1</html>").unwrap();
    git(path, &["add", "."]);
    git(path, &["commit", "-q", "-m", "initial commit"]);
    git_output(path, &["rev-parse", "HEAD"])
}

/// Add and commit a change; returns the new head SHA.
pub(crate) fn commit_change(path: &std::path::Path, file: &str, contents: &str) -> String {
    if let Some(parent) = path.join(file).parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path.join(file), contents).unwrap();
    git(path, &["add", "."]);
    git(path, &["commit", "-q", "-m", "update"]);
    git_output(path, &["rev-parse", "HEAD"])
}

pub(crate) fn git(path: &std::path::Path, args: &[&str]) {
    let status = std::process::Command::new("git")
        .args(args)
        .current_dir(path)
        .env("GIT_AUTHOR_NAME", "Test Author")
        .env("GIT_AUTHOR_EMAIL", "author@example.com")
        .env("GIT_COMMITTER_NAME", "Test Author")
        .env("GIT_COMMITTER_EMAIL", "author@example.com")
        .status()
        .unwrap();
    assert!(status.success(), "git {args:?} failed");
}

pub(crate) fn git_output(path: &std::path::Path, args: &[&str]) -> String {
    let output = std::process::Command::new("git")
        .args(args)
        .current_dir(path)
        .output()
        .unwrap();
    assert!(output.status.success(), "git {args:?} failed");
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}
