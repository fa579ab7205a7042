// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hosting-provider compare API client.
//!
//! Optional alternative to a local `git diff`: asks the remote for
//! `base...head` and caches the result per `(repo, base, head)` so repeated
//! previews of the same pair don't re-fetch.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors from the compare endpoint.
#[derive(Debug, Error)]
pub enum CompareError {
    #[error("compare request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("compare request returned {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },
}

/// One changed file in the compare payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareFile {
    pub filename: String,
    pub status: String,
}

/// Relevant slice of the compare response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompareResult {
    #[serde(default)]
    pub files: Vec<CompareFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permalink_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ahead_by: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behind_by: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_commits: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl CompareResult {
    /// Render the file list as `git diff --name-status` text so the diff
    /// analyzer has a single input shape.
    pub fn to_name_status(&self) -> String {
        self.files
            .iter()
            .map(|file| {
                let letter = match file.status.as_str() {
                    "added" => "A",
                    "removed" => "D",
                    "renamed" => "R",
                    _ => "M",
                };
                format!("{letter}\t{}", file.filename)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

type CacheKey = (String, String, String);

struct CachedCompare {
    fetched_at: Instant,
    result: CompareResult,
}

/// Compare API client with a TTL cache.
pub struct CompareClient {
    http: reqwest::Client,
    api_base: String,
    repo: String,
    token: Option<String>,
    cache_ttl: Duration,
    cache: Mutex<HashMap<CacheKey, CachedCompare>>,
}

impl CompareClient {
    pub fn new(repo: impl Into<String>, token: Option<String>, cache_ttl: Duration) -> Self {
        Self::with_api_base("https://api.github.com", repo, token, cache_ttl)
    }

    /// Client against an explicit API base (used by tests).
    pub fn with_api_base(
        api_base: impl Into<String>,
        repo: impl Into<String>,
        token: Option<String>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into(),
            repo: repo.into(),
            token,
            cache_ttl,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    fn cache_key(&self, base: &str, head: &str) -> CacheKey {
        (self.repo.clone(), base.to_string(), head.to_string())
    }

    fn cached(&self, key: &CacheKey) -> Option<CompareResult> {
        let cache = self.cache.lock();
        let entry = cache.get(key)?;
        if entry.fetched_at.elapsed() < self.cache_ttl {
            Some(entry.result.clone())
        } else {
            None
        }
    }

    fn store_in_cache(&self, key: CacheKey, result: CompareResult) {
        let mut cache = self.cache.lock();
        cache.insert(
            key,
            CachedCompare {
                fetched_at: Instant::now(),
                result,
            },
        );
    }

    /// Fetch `base...head`, serving from cache within the TTL.
    pub async fn compare(&self, base: &str, head: &str) -> Result<CompareResult, CompareError> {
        let key = self.cache_key(base, head);
        if let Some(hit) = self.cached(&key) {
            tracing::debug!(repo = %self.repo, base, head, "compare served from cache");
            return Ok(hit);
        }

        let url = format!(
            "{}/repos/{}/compare/{}...{}",
            self.api_base, self.repo, base, head
        );
        let mut request = self
            .http
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "cutover-engine");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(CompareError::Status {
                status: response.status(),
                url,
            });
        }
        let result: CompareResult = response.json().await?;
        self.store_in_cache(key, result.clone());
        Ok(result)
    }
}

#[cfg(test)]
#[path = "compare_tests.rs"]
mod tests;
