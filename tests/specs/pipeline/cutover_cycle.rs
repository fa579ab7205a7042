//! Full non-dry-run pipeline against a real git checkout: blue/green
//! slots toggle across successive deploys.

use crate::prelude::*;
use cutover_core::{DeployStatus, SystemClock};
use cutover_engine::{DeployConfig, DeployEngine};
use cutover_store::{MemoryTaskStore, TaskStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;

struct RealHarness {
    root: tempfile::TempDir,
    origin: PathBuf,
    engine: Arc<DeployEngine>,
}

impl RealHarness {
    fn slot(&self, name: &str) -> PathBuf {
        self.root.path().join("slots").join(name)
    }
}

/// Engine wired to a working clone of a local origin; the committed
/// `build/` directory stands in for real build output and the build
/// command is a no-op.
fn real_harness() -> RealHarness {
    let root = tempfile::tempdir().unwrap();
    let (origin, work) = git_origin_and_checkout(root.path());
    let config = DeployConfig {
        deploy_dry_run: false,
        chatbot_repo_path: work,
        frontend_install_command: None,
        frontend_build_command: vec!["true".to_string()],
        frontend_build_output_subdir: Some("build".to_string()),
        nginx_green_path: root.path().join("slots/green"),
        nginx_blue_path: root.path().join("slots/blue"),
        nginx_live_symlink: root.path().join("slots/current"),
        ..DeployConfig::default()
    };
    let store = Arc::new(MemoryTaskStore::new());
    let engine = Arc::new(DeployEngine::new(
        config,
        store as Arc<dyn TaskStore>,
        None,
        SystemClock,
    ));
    RealHarness {
        root,
        origin,
        engine,
    }
}

async fn deploy_once(h: &RealHarness) -> cutover_core::DeployTask {
    let task = h.engine.create_task(Some("deploy")).await.unwrap();
    let done = h
        .engine
        .run_pipeline(&task.task_id, "deploy", None, false)
        .await
        .unwrap();
    assert_eq!(
        done.status,
        DeployStatus::Completed,
        "pipeline failed: {:?}",
        done.error_log
    );
    done
}

fn live_target(h: &RealHarness) -> PathBuf {
    std::fs::read_link(h.slot("current")).unwrap()
}

fn slot_contents(path: &Path) -> String {
    std::fs::read_to_string(path.join("index.html")).unwrap()
}

#[tokio::test]
async fn first_deploy_populates_green_and_second_toggles_to_blue() {
    let h = real_harness();

    let done = deploy_once(&h).await;
    let cutover = &done.metadata["running_cutover"];
    assert_eq!(cutover["previous_target"], "unknown (none)");
    assert_eq!(cutover["next_target"], "green");
    assert_eq!(cutover["copied"], true);
    assert_eq!(cutover["switched"], true);
    assert_eq!(live_target(&h), h.slot("green"));
    assert_eq!(slot_contents(&h.slot("green")), "<html>v1</html>");

    // Completed deploys record the real commit and author.
    let summary = done.summary().unwrap();
    assert_eq!(summary["commit"].as_str().unwrap().len(), 40);
    assert_eq!(summary["git_commit"]["author"], "Spec Author");

    // Ship a new build output upstream and deploy again.
    push_origin_change(&h.origin, "<html>v2</html>");
    let done2 = deploy_once(&h).await;
    let cutover2 = &done2.metadata["running_cutover"];
    assert_eq!(cutover2["previous_target"], "green");
    assert_eq!(cutover2["next_target"], "blue");
    assert_eq!(live_target(&h), h.slot("blue"));
    assert_eq!(slot_contents(&h.slot("blue")), "<html>v2</html>");
}

#[tokio::test]
async fn pre_existing_green_symlink_cuts_over_to_blue() {
    let h = real_harness();

    // Operator had green live before this engine ever ran.
    std::fs::create_dir_all(h.slot("green")).unwrap();
    std::os::unix::fs::symlink(h.slot("green"), h.slot("current")).unwrap();

    let done = deploy_once(&h).await;
    let cutover = &done.metadata["running_cutover"];
    assert_eq!(cutover["previous_target"], "green");
    assert_eq!(cutover["next_target"], "blue");
    assert_eq!(live_target(&h), h.slot("blue"));
}

#[tokio::test]
async fn preview_becomes_ready_after_a_real_deploy() {
    let h = real_harness();
    deploy_once(&h).await;

    // Nothing new upstream: preview reports HEAD already deployed.
    let ctx_reason = h.engine.get_preview(None).await.unwrap();
    let reason = ctx_reason["preview_context"]["reason"].as_str().unwrap();
    assert!(reason.contains("already the last deployed commit"), "{reason}");

    // A fresh commit upstream makes the preview diff-ready after fetch.
    push_origin_change(&h.origin, "<html>v3</html>");
    git(
        &h.engine.config().chatbot_repo_path,
        &["fetch", "-q", "origin"],
    );
    git(
        &h.engine.config().chatbot_repo_path,
        &["reset", "-q", "--hard", "origin/deploy"],
    );

    let preview = h.engine.get_preview(None).await.unwrap();
    assert_eq!(preview["preview_context"]["ready"], true);
    let stats = &preview["preview_context"]["diff_stats"];
    assert_eq!(stats["file_count"], 1);
    assert_eq!(preview["preview_context"]["diff_source"], "local-git");
}
