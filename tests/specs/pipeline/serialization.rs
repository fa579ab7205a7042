//! Concurrent pipelines serialize on the process-wide lock.

use crate::prelude::*;
use chrono::{DateTime, Utc};
use cutover_core::{DeployStatus, DeployTask};

fn clone_started_at(task: &DeployTask) -> DateTime<Utc> {
    let raw = task.metadata["running_clone"]["timestamp"].as_str().unwrap();
    DateTime::parse_from_rfc3339(raw)
        .unwrap()
        .with_timezone(&Utc)
}

#[tokio::test]
async fn concurrent_pipelines_run_in_disjoint_intervals() {
    let h = dry_run_harness();
    let t1 = h.engine.create_task(Some("deploy")).await.unwrap();
    let t2 = h.engine.create_task(Some("deploy")).await.unwrap();

    let engine1 = h.engine.clone();
    let id1 = t1.task_id.clone();
    let first = tokio::spawn(async move {
        engine1.run_pipeline(&id1, "deploy", None, false).await
    });
    let engine2 = h.engine.clone();
    let id2 = t2.task_id.clone();
    let second = tokio::spawn(async move {
        engine2.run_pipeline(&id2, "deploy", None, false).await
    });

    let done1 = first.await.unwrap().unwrap();
    let done2 = second.await.unwrap().unwrap();

    assert_eq!(done1.status, DeployStatus::Completed);
    assert_eq!(done2.status, DeployStatus::Completed);

    // One pipeline's entire interval precedes the other's first stage:
    // [a_start, a_end, b_start, b_end], never interleaved.
    let (a_start, a_end) = (clone_started_at(&done1), done1.completed_at.unwrap());
    let (b_start, b_end) = (clone_started_at(&done2), done2.completed_at.unwrap());
    assert!(
        a_end <= b_start || b_end <= a_start,
        "pipeline intervals interleaved: [{a_start}, {a_end}] vs [{b_start}, {b_end}]"
    );
}
