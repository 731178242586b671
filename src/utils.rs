// Text helpers shared by the extractor and the normalizer
use std::sync::LazyLock;

use regex::Regex;

static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-•*]\s*").expect("valid bullet regex"));

/// Collapses runs of whitespace into single spaces and trims the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strips a leading `-`, `•` or `*` list marker and trims.
pub fn strip_bullet(line: &str) -> String {
    BULLET_RE.replace(line.trim(), "").trim().to_string()
}

/// Returns `"N/A"` for blank input, the input otherwise.
pub fn or_not_available(text: &str) -> &str {
    if text.trim().is_empty() {
        crate::model::NOT_AVAILABLE
    } else {
        text
    }
}
