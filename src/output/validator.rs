//! Coarse corruption heuristic for downloaded segment bodies.
//!
//! The export endpoint answers an unserviceable request with HTTP 200 and a
//! one-line error fragment instead of data. Such bodies are short, have at
//! most one non-blank line and mention one of a handful of known phrases.
//! The payload itself is never parsed.

/// Bodies at or above this many bytes are always accepted
pub const MAX_ERROR_BODY_BYTES: usize = 256;

/// Lowercase phrases the endpoint uses in its error fragments
pub const ERROR_PHRASES: [&str; 3] = ["invalid request to date", "error", "недоступна"];

/// Whether a downloaded body looks like real data
pub fn is_usable(content: &str) -> bool {
    rejection_reason(content).is_none()
}

/// The error phrase that caused `content` to be rejected, if any
pub fn rejection_reason(content: &str) -> Option<&'static str> {
    if content.len() >= MAX_ERROR_BODY_BYTES {
        return None;
    }

    let non_blank_lines = content.lines().filter(|l| !l.trim().is_empty()).count();
    if non_blank_lines > 1 {
        return None;
    }

    let lower = content.to_lowercase();
    ERROR_PHRASES.iter().copied().find(|phrase| lower.contains(phrase))
}
