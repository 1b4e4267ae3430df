//! Label normalization and filename sanitization.

use std::sync::OnceLock;

use regex::Regex;

/// Canonical form used when matching column labels: surrounding whitespace
/// stripped, lowercased. "Name" and " name " merge into one column during
/// import reconciliation.
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

fn unsafe_chars() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^A-Za-z0-9_-]").expect("valid pattern"))
}

fn underscore_runs() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"_{2,}").expect("valid pattern"))
}

/// Maps an arbitrary display name onto a safe download filename stem:
/// anything outside letters/digits/underscore/hyphen becomes an underscore,
/// runs of underscores collapse, and leading/trailing underscores are
/// trimmed. May return an empty string for names with no safe characters.
pub fn sanitize_filename(name: &str) -> String {
    let replaced = unsafe_chars().replace_all(name, "_");
    let collapsed = underscore_runs().replace_all(&replaced, "_");
    collapsed.trim_matches('_').to_string()
}
