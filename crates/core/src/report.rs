// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Auxiliary deploy report record.
//!
//! Reports are written only by explicit reporting calls (post-deploy
//! metrics uploads); the pipeline itself never produces one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form metrics attached to a finished task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployReport {
    pub report_id: String,
    /// Foreign reference to the owning task.
    pub task_id: String,
    #[serde(default)]
    pub metrics: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}
