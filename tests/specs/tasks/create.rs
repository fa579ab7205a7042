//! Task creation, branch validation, listings, and logs.

use crate::prelude::*;
use cutover_core::DeployStatus;

#[tokio::test]
async fn unknown_branch_is_rejected_and_nothing_persists() {
    let h = dry_run_harness();
    let err = h.engine.create_task(Some("feature/x")).await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("not allowed"), "got {message}");
    assert!(message.contains("deploy"), "got {message}");
    assert!(h.store.get_recent_tasks(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn created_task_is_pending_with_actor_metadata() {
    let h = dry_run_harness();
    let task = h.engine.create_task(None).await.unwrap();
    assert_eq!(task.status, DeployStatus::Pending);
    assert_eq!(task.branch(), Some("deploy"));
    assert_eq!(task.action(), "deploy");
    assert!(task.actor().is_some());
    assert!(task.metadata.contains_key("requested_by"));
}

#[tokio::test]
async fn recent_tasks_list_newest_first() {
    let h = dry_run_harness();
    let first = h.engine.create_task(Some("deploy")).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = h.engine.create_task(Some("main")).await.unwrap();

    let summaries = h.engine.list_recent_tasks(5).await.unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0]["task_id"], second.task_id);
    assert_eq!(summaries[0]["branch"], "main");
    assert_eq!(summaries[1]["task_id"], first.task_id);
}

#[tokio::test]
async fn task_logs_expose_stage_metadata_after_a_run() {
    let h = dry_run_harness();
    let task = h.engine.create_task(Some("deploy")).await.unwrap();
    h.engine
        .run_pipeline(&task.task_id, "deploy", None, false)
        .await
        .unwrap();

    let logs = h.engine.get_task_logs(&task.task_id).await.unwrap();
    assert_eq!(logs["task_id"], task.task_id);
    assert_eq!(logs["status"], "completed");
    let stages = logs["stages"].as_object().unwrap();
    assert_eq!(stages.len(), 4);
    assert!(stages.contains_key("running_clone"));
    assert!(stages.contains_key("running_observability"));
    assert!(logs["error_log"].is_null());
    assert!(logs["failure_context"].is_null());
}

#[tokio::test]
async fn missing_task_lookups_are_not_found() {
    let h = dry_run_harness();
    let err = h.engine.get_task("feedfeedfeed").await.unwrap_err();
    assert!(err.to_string().starts_with("deploy task not found"));
    let err = h.engine.get_task_logs("feedfeedfeed").await.unwrap_err();
    assert!(err.to_string().starts_with("deploy task not found"));
}
