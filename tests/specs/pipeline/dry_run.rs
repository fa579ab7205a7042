//! Dry-run happy path: every stage records intent, nothing executes.

use crate::prelude::*;
use cutover_core::DeployStatus;

#[tokio::test]
async fn dry_run_pipeline_completes_with_full_stage_metadata() {
    let h = dry_run_harness();
    let task = h.engine.create_task(Some("deploy")).await.unwrap();
    assert_eq!(task.status, DeployStatus::Pending);

    let done = h
        .engine
        .run_pipeline(&task.task_id, "deploy", None, false)
        .await
        .unwrap();

    assert_eq!(done.status, DeployStatus::Completed);
    assert!(done.completed_at.is_some());
    assert_eq!(done.branch(), Some("deploy"));

    // Clone stage: branch plus per-command dry-run records.
    let clone_meta = &done.metadata["running_clone"];
    assert_eq!(clone_meta["branch"], "deploy");
    let steps = clone_meta["steps"].as_array().unwrap();
    assert!(!steps.is_empty());
    for step in steps {
        assert_eq!(step["dry_run"], true);
        assert!(step.get("returncode").is_none());
    }

    // Build stage recorded its commands without running them.
    for step in done.metadata["running_build"]["steps"].as_array().unwrap() {
        assert_eq!(step["dry_run"], true);
    }

    // Dev-server mode skips the cutover.
    assert_eq!(done.metadata["running_cutover"]["skipped"], true);
    assert!(done.metadata["running_observability"]["message"].is_string());

    // Summary and cached preflight snapshot.
    let summary = done.summary().unwrap();
    assert_eq!(summary["result"], "success");
    assert_eq!(summary["commit"], "dry-run");
    let preflight = summary["preflight"].as_object().unwrap();
    assert!(preflight.contains_key("cost_estimate"));
    assert!(preflight.contains_key("risk_assessment"));
    assert!(preflight.contains_key("llm_preview"));
}

#[tokio::test]
async fn terminal_tasks_keep_their_completed_at() {
    let h = dry_run_harness();
    let task = h.engine.create_task(Some("deploy")).await.unwrap();
    assert!(task.completed_at.is_none());

    let done = h
        .engine
        .run_pipeline(&task.task_id, "deploy", None, false)
        .await
        .unwrap();
    let completed_at = done.completed_at.unwrap();

    // Re-reading does not move the terminal timestamp.
    let again = h.engine.get_task(&done.task_id).await.unwrap();
    assert_eq!(again.completed_at, Some(completed_at));
}
