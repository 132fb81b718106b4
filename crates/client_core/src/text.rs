//! Plain-text helpers used around the workflow.

use std::sync::LazyLock;

use regex::Regex;

static HORIZONTAL_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").expect("static regex"));
static PUNCTUATION_SPACING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]*([.,!?;:])[ \t]*").expect("static regex"));
static TRAILING_LINE_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" +\n").expect("static regex"));
static BLANK_LINE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("static regex"));

const TITLE_WORDS: usize = 8;

/// Tidies whitespace and punctuation spacing. Line breaks are kept, with at
/// most one blank line between paragraphs. Only spaces and tabs around
/// punctuation are rewritten, so a newline next to punctuation stays put.
pub fn normalize_text(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = HORIZONTAL_RUNS.replace_all(&text, " ");
    let text = PUNCTUATION_SPACING.replace_all(&text, "$1 ");
    let text = TRAILING_LINE_SPACE.replace_all(&text, "\n");
    let text = BLANK_LINE_RUNS.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Short label for history entries.
pub fn title_from_text(text: &str) -> String {
    let mut words = text.split_whitespace();
    let head: Vec<&str> = words.by_ref().take(TITLE_WORDS).collect();
    if head.is_empty() {
        return "Untitled".to_string();
    }
    let mut title = head.join(" ");
    if words.next().is_some() {
        title.push('…');
    }
    title
}
