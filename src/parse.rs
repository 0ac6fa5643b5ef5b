use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::models::Candidate;

const SNIPPET_CHARS: usize = 200;

static OPENING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```[A-Za-z0-9_+-]*[ \t]*\r?\n?").expect("valid fence regex"));
static CLOSING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*```$").expect("valid fence regex"));

/// Model output that was not a JSON array of candidates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed model response: {snippet}")]
pub struct MalformedResponse {
    pub snippet: String, // raw text, truncated
    pub reason: String,
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Remove one leading fence (with optional language tag) and one trailing fence.
pub fn strip_code_fence(raw: &str) -> &str {
    let text = raw.trim();
    if !text.starts_with("```") {
        return text;
    }
    let start = OPENING_FENCE.find(text).map(|m| m.end()).unwrap_or(0);
    let body = &text[start..];
    let end = CLOSING_FENCE.find(body).map(|m| m.start()).unwrap_or(body.len());
    body[..end].trim()
}

/// Parse raw model output into candidates. An empty array is a valid answer.
pub fn parse_response(raw: &str) -> Result<Vec<Candidate>, MalformedResponse> {
    let body = strip_code_fence(raw);
    serde_json::from_str::<Vec<Candidate>>(body).map_err(|e| {
        debug!("Response rejected - reason={}, length={} chars", e, raw.len());
        MalformedResponse {
            snippet: truncate_chars(raw.trim(), SNIPPET_CHARS),
            reason: e.to_string(),
        }
    })
}
