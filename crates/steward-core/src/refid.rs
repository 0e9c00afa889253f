//! Composite finding reference ids.
//!
//! Findings are addressed by a composite string of the form
//! `{uuid}@@notable@@time{epoch}`. The trailing epoch doubles as an
//! `earliest` time filter so lookups reach findings older than the API's
//! default search window.

/// Extracts the notable-event epoch from a composite reference id.
///
/// Returns the digits following a trailing `time` marker, or `None` when the
/// id does not end in `time{digits}`. A malformed id is not an error; the
/// caller simply issues its query without a time filter.
pub fn notable_time(ref_id: &str) -> Option<&str> {
    let trimmed = ref_id.trim_end_matches(|c: char| c.is_ascii_digit());
    if trimmed.len() == ref_id.len() {
        // No trailing digits at all.
        return None;
    }
    if !trimmed.ends_with("time") {
        return None;
    }
    Some(&ref_id[trimmed.len()..])
}
