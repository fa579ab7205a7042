//! Preview payload assembly without deploy history.

use crate::prelude::*;

#[tokio::test]
async fn preview_degrades_gracefully_without_history() {
    let h = dry_run_harness();
    let preview = h.engine.get_preview(None).await.unwrap();

    assert_eq!(preview["preview_context"]["ready"], false);
    let reason = preview["preview_context"]["reason"].as_str().unwrap();
    assert!(reason.contains("no successful deploy"), "got {reason}");

    // Risk/cost/LLM envelopes are always present.
    assert_eq!(preview["risk_assessment"]["risk_level"], "low");
    assert!(preview["cost_estimate"]["runtime_minutes"].as_u64().unwrap() >= 1);
    assert_eq!(preview["llm_preview"]["summary"], "preview model disabled");
    assert!(preview["llm_preview"]["highlights"].as_array().unwrap().is_empty());

    // Warnings are never empty.
    let warnings = preview["warnings"].as_array().unwrap();
    assert!(!warnings.is_empty());
    assert!(warnings
        .iter()
        .any(|w| w.as_str().unwrap().contains("smoke tests")));
}

#[tokio::test]
async fn preview_lists_the_command_plan() {
    let h = dry_run_harness();
    let preview = h.engine.get_preview(None).await.unwrap();
    let commands: Vec<&str> = preview["commands"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c.as_str().unwrap())
        .collect();
    assert_eq!(commands[0], "git fetch origin");
    assert!(commands.contains(&"git clean -fdx"));
    assert!(commands.iter().any(|c| c.contains("npm run build")));
}

#[tokio::test]
async fn blue_green_plan_reports_unknown_slots_before_first_cutover() {
    let h = dry_run_harness();
    let plan = h.engine.describe_blue_green_state();
    assert_eq!(plan["active_slot"], "unknown");
    assert_eq!(plan["standby_slot"], "unknown");
    assert_eq!(plan["next_cutover_target"], "green");
    assert!(plan["last_cutover_at"].is_null());
}

#[tokio::test]
async fn runtime_estimate_is_reported_in_minutes() {
    let h = dry_run_harness();
    let minutes = h.engine.estimate_runtime_minutes().await;
    assert!((1..=10).contains(&minutes));
}
