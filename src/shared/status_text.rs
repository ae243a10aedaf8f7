//! Reason phrase resolution.

use hyper::StatusCode;

/// Returns the reason phrase for a response.
///
/// A phrase the target actually sent wins; otherwise the canonical phrase for
/// the code is used, or an empty string for codes without one.
pub fn status_text(status: StatusCode, sent: Option<&str>) -> String {
    match sent {
        Some(phrase) if !phrase.is_empty() => phrase.to_string(),
        _ => status.canonical_reason().unwrap_or("").to_string(),
    }
}
