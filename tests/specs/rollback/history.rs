//! Rollback planning needs recorded history; a two-commit history rolls
//! back from the newest to the prior success.

use crate::prelude::*;
use cutover_core::DeployStatus;

#[tokio::test]
async fn rollback_without_history_is_rejected() {
    let h = dry_run_harness();
    let err = h.engine.prepare_rollback(Some("deploy")).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Not enough successful deployments to rollback"
    );
}

#[tokio::test]
async fn rollback_with_one_success_is_rejected() {
    let h = dry_run_harness();
    seed_success(&h.store, "deploy", &"a".repeat(40)).await;
    let err = h.engine.prepare_rollback(Some("deploy")).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Not enough successful deployments to rollback"
    );
}

#[tokio::test]
async fn two_commit_history_rolls_back_to_the_prior_success() {
    let h = dry_run_harness();
    let commit_a = "a".repeat(40);
    let commit_b = "b".repeat(40);
    seed_success(&h.store, "deploy", &commit_a).await;
    seed_success(&h.store, "deploy", &commit_b).await;

    let plan = h.engine.prepare_rollback(Some("deploy")).await.unwrap();
    assert_eq!(plan.current_commit, commit_b);
    assert_eq!(plan.target_commit, commit_a);
    assert_eq!(plan.task.status, DeployStatus::Pending);
    assert_eq!(plan.task.action(), "rollback");
    assert_eq!(plan.task.metadata["from_commit"], commit_b.as_str());
    assert_eq!(plan.task.metadata["to_commit"], commit_a.as_str());

    let done = h
        .engine
        .perform_rollback(
            &plan.task.task_id,
            &plan.branch,
            &plan.target_commit,
            &plan.current_commit,
        )
        .await
        .unwrap();

    assert_eq!(done.status, DeployStatus::Completed);
    let summary = done.summary().unwrap();
    assert_eq!(summary["rolled_back_from"], commit_b.as_str());
    assert_eq!(summary["rolled_back_to"], commit_a.as_str());

    // The clone stage targeted the rollback commit.
    assert_eq!(
        done.metadata["running_clone"]["target_commit"],
        commit_a.as_str()
    );
}

#[tokio::test]
async fn successive_rollbacks_walk_history_by_completion_time() {
    let h = dry_run_harness();
    let commit_a = "a".repeat(40);
    let commit_b = "b".repeat(40);
    seed_success(&h.store, "deploy", &commit_a).await;
    seed_success(&h.store, "deploy", &commit_b).await;

    let plan = h.engine.prepare_rollback(Some("deploy")).await.unwrap();
    h.engine
        .perform_rollback(
            &plan.task.task_id,
            &plan.branch,
            &plan.target_commit,
            &plan.current_commit,
        )
        .await
        .unwrap();

    // The completed rollback is now the most recent success on the
    // branch, so a second rollback targets commit B again.
    let second = h.engine.prepare_rollback(Some("deploy")).await.unwrap();
    assert_eq!(second.current_commit, "dry-run");
    assert_eq!(second.target_commit, commit_b);
}
