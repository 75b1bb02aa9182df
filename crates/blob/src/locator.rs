//! Correlation-id extraction from blob locator text.
//!
//! The blob service's response is an opaque locator string whose only
//! contractual property is that it embeds `"uuid":"<id>"` somewhere. The
//! notification step recovers the id by scanning for that marker rather
//! than parsing the full response schema.

const MARKER: &str = "\"uuid\":\"";

/// Extract the correlation id embedded in a locator string.
///
/// Returns `None` when the marker or its closing quote is absent, never
/// errors.
pub fn extract_correlation_id(locator: &str) -> Option<&str> {
    let start = locator.find(MARKER)? + MARKER.len();
    let end = locator[start..].find('"')?;
    Some(&locator[start..start + end])
}
