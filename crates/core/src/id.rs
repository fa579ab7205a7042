// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task and report identifier generation.

use uuid::Uuid;

/// Generate an opaque 32-character lowercase hex task id.
pub fn new_task_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Generate a report id (same shape as task ids).
pub fn new_report_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
