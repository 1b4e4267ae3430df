//! Slash-segment length validation gating row generation.

/// Maximum characters allowed in one trimmed slash-delimited segment.
pub const MAX_SEGMENT_LEN: usize = 50;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentReport {
    pub is_valid: bool,
    pub invalid_segments: Vec<String>,
}

/// Splits `text` on `/` and reports every trimmed segment longer than
/// [`MAX_SEGMENT_LEN`]. Empty input is always valid. Pure; the caller
/// decides how to surface the offending segments.
pub fn validate_segments(text: &str) -> SegmentReport {
    let invalid_segments: Vec<String> = text
        .split('/')
        .map(str::trim)
        .filter(|segment| segment.chars().count() > MAX_SEGMENT_LEN)
        .map(str::to_string)
        .collect();
    SegmentReport {
        is_valid: invalid_segments.is_empty(),
        invalid_segments,
    }
}
