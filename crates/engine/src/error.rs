// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the deploy engine.

use cutover_adapters::{CommandError, GitError};
use cutover_core::DeployStatus;
use cutover_store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the engine.
///
/// The HTTP boundary maps `TaskNotFound` to 404 and the validation
/// variants to 4xx; everything else is a pipeline or infrastructure
/// failure.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Branch '{branch}' is not allowed. Allowed branches: {allowed:?}")]
    BranchNotAllowed {
        branch: String,
        allowed: Vec<String>,
    },
    #[error("deploy task not found: {0}")]
    TaskNotFound(String),
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: DeployStatus,
        to: DeployStatus,
    },
    #[error("Not enough successful deployments to rollback")]
    NotEnoughHistory,
    #[error("rollback target commit unknown: {0}")]
    RollbackTargetUnknown(String),
    #[error("build directory missing: {0}")]
    MissingBuildDir(PathBuf),
    #[error("pipeline lock released by non-owner")]
    LockMisuse,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Git(#[from] GitError),
    #[error(transparent)]
    Cutover(#[from] crate::slots::SlotError),
}
