// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cutover-adapters: process, git, HTTP, and identity adapters for the
//! deploy engine.

pub mod compare;
pub mod git;
pub mod identity;
pub mod llm;
pub mod subprocess;

pub use compare::{CompareClient, CompareError, CompareFile, CompareResult};
pub use git::{is_full_commit_sha, CommitDetails, GitError, GitTool};
pub use identity::{
    resolve_actor, resolve_actor_email, resolve_requester, resolve_requester_email,
};
pub use llm::{
    build_preview_prompt, parse_preview_response, truncate_diff, GeminiPreviewModel, LlmError,
    LlmPreview, PreviewModel,
};
pub use subprocess::{CommandError, CommandRecord, CommandRunner, DEFAULT_COMMAND_TIMEOUT};
