//! Small text helpers shared by the pipeline nodes.

/// Truncate a string to at most `max_bytes` bytes at a valid UTF-8 char
/// boundary.
///
/// Devanagari code points are 3 bytes wide, so naive byte slicing of an
/// utterance panics far more often than it would for ASCII input.
pub(crate) fn truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Whitespace-separated words with surrounding punctuation removed.
/// Devanagari danda (`।`) counts as punctuation.
pub(crate) fn words(s: &str) -> Vec<&str> {
    s.split_whitespace()
        .map(|w| w.trim_matches(|c: char| c.is_ascii_punctuation() || c == '।' || c == '॥'))
        .filter(|w| !w.is_empty())
        .collect()
}

// ─── Tests ──────────────────────────────────────────────────────────────────
