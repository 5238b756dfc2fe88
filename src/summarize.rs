//! Turning a note into a short summary plus a handful of bullet points:
//! validate, ask the model once, check what came back, save it. Any failure
//! ends the request; nothing is retried.

use super::{
    completion::CompletionService,
    db_ops::Store,
    errors::{Error, Result},
    models::{AuthUser, Summary},
    notes, summaries,
};
use serde_json::Value;
use std::ops::RangeInclusive;
use uuid::Uuid;

pub const BULLET_COUNT: RangeInclusive<usize> = 3..=5;

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that returns only valid JSON. \
Never include markdown formatting or code blocks.";

pub fn user_prompt(content: &str) -> String {
    format!(
        r#"You are a helpful assistant that creates concise summaries of text.

Given the following text, create a summary with:
1. A 2-4 sentence paragraph summary
2. 3-5 key bullet points

Text to summarize:
{content}

Return your response as STRICT JSON only, with this exact format:
{{
  "summary": "2-4 sentence paragraph here",
  "bullets": ["bullet point 1", "bullet point 2", "bullet point 3"]
}}

Do not include any text outside the JSON. Return only valid JSON."#
    )
}

/// A completion that passed inspection.
#[derive(Debug, PartialEq)]
pub struct SummaryPayload {
    pub summary: String,
    pub bullets: Vec<String>,
}

pub fn parse_payload(raw: &str) -> Result<SummaryPayload> {
    let json: Value = serde_json::from_str(raw).map_err(|_| {
        Error::upstream_validation(
            "Invalid JSON response from completion service",
        )
    })?;

    let summary = json
        .get("summary")
        .and_then(|s| s.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            Error::upstream_validation(
                "Invalid summary in completion response",
            )
        })?;

    let bullets = json
        .get("bullets")
        .and_then(|b| b.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();
    if !BULLET_COUNT.contains(&bullets.len()) {
        return Err(Error::upstream_validation(format!(
            "Invalid bullets array: must contain 3-5 items, got {}",
            bullets.len()
        )));
    }
    let bullets = bullets
        .iter()
        .map(|b| b.as_str().map(|s| s.trim().to_string()))
        .collect::<Option<Vec<String>>>()
        .ok_or_else(|| {
            Error::upstream_validation("All bullets must be strings")
        })?;

    Ok(SummaryPayload {
        summary: summary.to_string(),
        bullets,
    })
}

pub async fn summarize(
    store: &dyn Store,
    completion: &dyn CompletionService,
    user: &AuthUser,
    note_id: Uuid,
    content: &str,
) -> Result<Summary> {
    if content.trim().is_empty() {
        return Err(Error::validation("Invalid or missing content"));
    }
    // The store would refuse the write anyway; checking first means we don't
    // pay for a completion we can't save, and the caller gets a clear error.
    notes::get(store, user, note_id).await?;

    tracing::info!(note_id = %note_id, chars = content.len(), "summarizing note");
    let raw = completion
        .complete_json(SYSTEM_PROMPT, &user_prompt(content))
        .await?
        .ok_or_else(|| {
            Error::Upstream("No response from completion service".into())
        })?;
    let payload = parse_payload(&raw).map_err(|e| {
        tracing::warn!(note_id = %note_id, error = %e, "rejected completion");
        e
    })?;

    summaries::upsert(store, user, note_id, &payload.summary, &payload.bullets)
        .await
}
