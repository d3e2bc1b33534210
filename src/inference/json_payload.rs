//! JSON payload extraction from raw oracle text.
//!
//! Models wrap their JSON in prose, markdown fences, or trailing commentary.
//! This module finds exactly one balanced top-level `{…}` object and hands it
//! to `serde`. Anything else — no object, unbalanced braces, two objects, or
//! a shape mismatch — is a failed call. There is no partial success.

use serde::de::DeserializeOwned;

use super::errors::InferenceError;

/// Bytes of raw text kept in error values for diagnostics.
const EXCERPT_BYTES: usize = 160;

/// Locate the single balanced JSON object in `text`.
///
/// Braces inside string literals are ignored; escapes inside strings are
/// honoured. A second top-level object after the first is rejected as
/// ambiguous.
pub fn extract_json_object(text: &str) -> Result<&str, InferenceError> {
    let start = text.find('{').ok_or_else(|| malformed(text, "no JSON object in completion"))?;

    let end = scan_balanced(text, start)
        .ok_or_else(|| malformed(text, "unbalanced braces in completion"))?;

    let rest = &text[end..];
    if let Some(offset) = rest.find('{') {
        if scan_balanced(rest, offset).is_some() {
            return Err(malformed(text, "more than one JSON object in completion"));
        }
    }

    Ok(&text[start..end])
}

/// Extract the single JSON object and deserialize it into `T`.
pub fn parse_json_payload<T: DeserializeOwned>(text: &str) -> Result<T, InferenceError> {
    let object = extract_json_object(text)?;
    serde_json::from_str::<T>(object).map_err(|e| malformed(text, &format!("invalid payload: {e}")))
}

/// Return the byte index one past the `}` closing the object opened at
/// `start`, or `None` if the object never closes.
fn scan_balanced(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + idx + ch.len_utf8());
                }
            }
            _ => {}
        }
    }

    None
}

fn malformed(text: &str, reason: &str) -> InferenceError {
    InferenceError::MalformedPayload {
        raw_excerpt: crate::agent_core::text::truncate_utf8(text, EXCERPT_BYTES).to_string(),
        reason: reason.to_string(),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
