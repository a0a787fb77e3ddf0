use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
// hyphen, en dash, em dash, horizontal bar, minus sign
static NUMERIC_DASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d)[-\u{2013}\u{2014}\u{2015}\u{2212}](\d)").unwrap());
static DOT_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.{2,}").unwrap());

/// Canonicalize extracted text: collapse whitespace, drop dashes between
/// digits ("2020–2021" -> "20202021"), drop runs of two or more dots.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let mut text = WHITESPACE_RE.replace_all(trimmed, " ").into_owned();

    // A dash removed in one pass can expose another ("1-2-3"), so repeat.
    while NUMERIC_DASH_RE.is_match(&text) {
        text = NUMERIC_DASH_RE.replace_all(&text, "$1$2").into_owned();
    }

    let text = DOT_RUN_RE.replace_all(&text, "");
    text.trim().to_string()
}
