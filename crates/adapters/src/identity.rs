// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator identity resolution from the process environment.

/// Synthetic identity used when no environment variable names the operator.
pub const DEFAULT_ACTOR: &str = "deploy-operator";

fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

/// Operator that triggered the action.
///
/// Checks `DEPLOY_ACTOR`, then `GITHUB_ACTOR`, then the OS login
/// (`USER`/`LOGNAME`), finally a synthetic default.
pub fn resolve_actor() -> String {
    first_env(&["DEPLOY_ACTOR", "GITHUB_ACTOR", "USER", "LOGNAME"])
        .unwrap_or_else(|| DEFAULT_ACTOR.to_string())
}

/// Operator on whose behalf the action runs; falls back to the actor.
pub fn resolve_requester() -> String {
    first_env(&["DEPLOY_REQUESTER"]).unwrap_or_else(resolve_actor)
}

/// Actor email, when one is configured.
pub fn resolve_actor_email() -> Option<String> {
    first_env(&["DEPLOY_ACTOR_EMAIL", "GITHUB_ACTOR_EMAIL", "EMAIL"])
}

/// Requester email, falling back to the actor email.
pub fn resolve_requester_email() -> Option<String> {
    first_env(&["DEPLOY_REQUESTER_EMAIL"]).or_else(resolve_actor_email)
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
