// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Best-effort generative-model preview client.
//!
//! The engine never depends on this succeeding: every failure path
//! degrades to a reason-only [`LlmPreview`] with the same shape.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Maximum number of highlight/risk bullets kept in a preview.
pub const MAX_PREVIEW_ITEMS: usize = 3;

/// Errors from the generative model call.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("model request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("model request returned {status}")]
    Status { status: reqwest::StatusCode },
    #[error("model response carried no text")]
    EmptyResponse,
}

/// Structured summary of an upcoming deploy diff.
///
/// `highlights` and `risks` never exceed [`MAX_PREVIEW_ITEMS`] entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmPreview {
    pub summary: String,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub risks: Vec<String>,
}

impl LlmPreview {
    /// Degraded preview carrying only a human-readable reason.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            summary: reason.into(),
            highlights: Vec::new(),
            risks: Vec::new(),
        }
    }

    fn clamped(mut self) -> Self {
        self.highlights.truncate(MAX_PREVIEW_ITEMS);
        self.risks.truncate(MAX_PREVIEW_ITEMS);
        self
    }
}

/// Generative model seam. Implementations return raw response text; the
/// engine parses it with [`parse_preview_response`].
#[async_trait]
pub trait PreviewModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// REST adapter for Gemini-style `generateContent` endpoints.
pub struct GeminiPreviewModel {
    http: reqwest::Client,
    api_base: String,
    model: String,
    api_key: String,
}

impl GeminiPreviewModel {
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_api_base(
            "https://generativelanguage.googleapis.com",
            model,
            api_key,
        )
    }

    pub fn with_api_base(
        api_base: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl PreviewModel for GeminiPreviewModel {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        );
        let body = json!({
            "contents": [{"parts": [{"text": prompt}]}],
        });
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(LlmError::Status {
                status: response.status(),
            });
        }
        let payload: Value = response.json().await?;
        extract_response_text(&payload).ok_or(LlmError::EmptyResponse)
    }
}

/// Pull response text from either `{text}` or
/// `{candidates[].content.parts[].text}` payload shapes.
pub fn extract_response_text(payload: &Value) -> Option<String> {
    if let Some(text) = payload.get("text").and_then(Value::as_str) {
        return Some(text.to_string());
    }
    let parts = payload
        .get("candidates")?
        .as_array()?
        .first()?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: Vec<&str> = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text.join("\n"))
    }
}

/// Fixed JSON-shape prompt for the diff summary.
pub fn build_preview_prompt(branch: &str, base: &str, head: &str, diff: &str) -> String {
    format!(
        "You are reviewing the changes about to be deployed on branch '{branch}' \
         (commits {base}..{head}).\n\
         Respond with JSON only, in exactly this shape:\n\
         {{ \"summary\": \"...\", \"highlights\": [\"…\",\"…\",\"…\"], \"risks\": [\"…\",\"…\",\"…\"] }}\n\
         Keep highlights and risks to at most three short bullet strings each.\n\n\
         Changed files (name-status):\n{diff}\n"
    )
}

/// Truncate diff text for the model, marking the cut visibly.
pub fn truncate_diff(diff: &str, max_chars: usize) -> String {
    if diff.chars().count() <= max_chars {
        return diff.to_string();
    }
    let kept: String = diff.chars().take(max_chars).collect();
    format!("{kept}\n… [diff truncated]")
}

/// Parse a model response into a structured preview.
///
/// Accepts raw JSON, JSON inside a fenced code block, and finally a
/// line-based fallback that files lines mentioning "risk" under `risks`.
pub fn parse_preview_response(text: &str) -> LlmPreview {
    let trimmed = text.trim();
    if let Ok(preview) = serde_json::from_str::<LlmPreview>(trimmed) {
        return preview.clamped();
    }
    if let Some(fenced) = extract_fenced_block(trimmed) {
        if let Ok(preview) = serde_json::from_str::<LlmPreview>(fenced.trim()) {
            return preview.clamped();
        }
    }
    line_fallback(trimmed).clamped()
}

fn extract_fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_fence = &text[open + 3..];
    // Skip the info string ("json", "text", …) on the opening fence.
    let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_fence[body_start..];
    let close = body.find("```")?;
    Some(&body[..close])
}

fn line_fallback(text: &str) -> LlmPreview {
    let mut summary = String::new();
    let mut highlights = Vec::new();
    let mut risks = Vec::new();
    for line in text.lines() {
        let cleaned = line.trim().trim_start_matches(['-', '*', '•']).trim();
        if cleaned.is_empty() {
            continue;
        }
        if summary.is_empty() {
            summary = cleaned.to_string();
        } else if cleaned.to_ascii_lowercase().contains("risk") {
            risks.push(cleaned.to_string());
        } else {
            highlights.push(cleaned.to_string());
        }
    }
    if summary.is_empty() {
        summary = "Model returned an empty response.".to_string();
    }
    LlmPreview {
        summary,
        highlights,
        risks,
    }
}

#[cfg(test)]
#[path = "llm_tests.rs"]
mod tests;
