//! Shared harness for engine specs.

use cutover_core::{new_task_id, DeployStatus, TaskCreate, TaskUpdate};
use cutover_engine::{DeployConfig, DeployEngine};
pub use cutover_store::TaskStore;
use cutover_store::MemoryTaskStore;
use serde_json::{json, Map, Value};
use std::path::Path;
use std::sync::Arc;

pub struct Harness {
    pub _dir: tempfile::TempDir,
    pub store: Arc<MemoryTaskStore>,
    pub engine: Arc<DeployEngine>,
}

/// Engine in dry-run mode over a memory store, rooted in a temp dir.
pub fn dry_run_harness() -> Harness {
    harness_with(|config| {
        config.deploy_dry_run = true;
    })
}

pub fn harness_with(tweak: impl FnOnce(&mut DeployConfig)) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path().join("repo");
    std::fs::create_dir_all(&repo).unwrap();

    let mut config = DeployConfig {
        chatbot_repo_path: repo,
        nginx_green_path: dir.path().join("slots/green"),
        nginx_blue_path: dir.path().join("slots/blue"),
        nginx_live_symlink: dir.path().join("slots/current"),
        ..DeployConfig::default()
    };
    tweak(&mut config);

    let store = Arc::new(MemoryTaskStore::new());
    let engine = Arc::new(DeployEngine::new(
        config,
        store.clone() as Arc<dyn TaskStore>,
        None,
        cutover_core::SystemClock,
    ));
    Harness {
        _dir: dir,
        store,
        engine,
    }
}

pub fn meta(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

/// Seed a completed deploy with a recorded summary commit.
pub async fn seed_success(store: &MemoryTaskStore, branch: &str, commit: &str) -> String {
    let task = store
        .create_task(TaskCreate::pending(
            new_task_id(),
            meta(json!({"branch": branch, "action": "deploy"})),
        ))
        .await
        .unwrap();
    // Keep completed_at strictly ordered across seeds.
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    store
        .mark_status(&task.task_id, DeployStatus::Completed, None)
        .await
        .unwrap();
    store
        .update_task(
            &task.task_id,
            TaskUpdate::append(meta(
                json!({"summary": {"commit": commit, "result": "success"}}),
            )),
        )
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    task.task_id
}

pub fn git(path: &Path, args: &[&str]) {
    let status = std::process::Command::new("git")
        .args(args)
        .current_dir(path)
        .env("GIT_AUTHOR_NAME", "Spec Author")
        .env("GIT_AUTHOR_EMAIL", "specs@example.com")
        .env("GIT_COMMITTER_NAME", "Spec Author")
        .env("GIT_COMMITTER_EMAIL", "specs@example.com")
        .status()
        .unwrap();
    assert!(status.success(), "git {args:?} failed");
}

pub fn git_output(path: &Path, args: &[&str]) -> String {
    let output = std::process::Command::new("git")
        .args(args)
        .current_dir(path)
        .output()
        .unwrap();
    assert!(output.status.success(), "git {args:?} failed");
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Create an origin repository on branch `deploy` with committed build
/// output, plus a working clone the engine operates on.
///
/// Returns `(origin, work)` paths; `origin` stays usable for pushing
/// further commits.
pub fn git_origin_and_checkout(root: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let origin = root.join("origin");
    std::fs::create_dir_all(&origin).unwrap();
    git(&origin, &["init", "-q", "-b", "deploy"]);
    std::fs::create_dir_all(origin.join("build")).unwrap();
    std::fs::write(origin.join("build/index.html"), "<html>v1</html>").unwrap();
    std::fs::write(origin.join("README.md"), "demo frontend\n").unwrap();
    git(&origin, &["add", "."]);
    git(&origin, &["commit", "-q", "-m", "initial build output"]);

    let work = root.join("work");
    git(
        root,
        &[
            "clone",
            "-q",
            origin.to_str().unwrap(),
            work.to_str().unwrap(),
        ],
    );
    (origin, work)
}

/// Commit an updated build artifact on the origin.
pub fn push_origin_change(origin: &Path, contents: &str) -> String {
    std::fs::write(origin.join("build/index.html"), contents).unwrap();
    git(origin, &["add", "."]);
    git(origin, &["commit", "-q", "-m", "update build output"]);
    git_output(origin, &["rev-parse", "HEAD"])
}
