//! Best-effort extraction of typed values from free-text model answers.
//!
//! Answers from search-backed models carry numbered citation markers
//! (`[1][2]`), markdown emphasis and fenced code blocks. Every extractor here
//! is a pure function that tolerates that noise and returns `None` instead of
//! failing.

mod json;

pub use json::{extract_json_object, normalize_key_value};

use regex::Regex;
use std::sync::LazyLock;

static CITATIONS: LazyLock<Regex> = LazyLock::new(|| compile(r"(\[\d+\])+"));
static BOLD: LazyLock<Regex> = LazyLock::new(|| compile(r"\*\*(.*?)\*\*"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| compile(r"\s+"));
static BLOCK_BREAK: LazyLock<Regex> = LazyLock::new(|| compile(r"(?m)\n\s*\n|^\s*#{1,6}\s+"));
static BOLD_NUMBER: LazyLock<Regex> = LazyLock::new(|| compile(r"\*\*(\d+(?:[.,]\d+)?)\*\*"));
static NUMBER: LazyLock<Regex> = LazyLock::new(|| compile(r"\d+(?:[.,]\d+)?\s*€?"));
static URL: LazyLock<Regex> = LazyLock::new(|| compile(r"https?://[^\s*)\]}]+"));

const MIN_PARAGRAPH_CHARS: usize = 50;

#[allow(clippy::expect_used)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("extractor pattern is valid")
}

/// Removes citation markers and collapses whitespace.
#[must_use]
pub fn clean_citations(text: &str) -> String {
    let text = CITATIONS.replace_all(text, "");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

/// Removes citation markers and bold emphasis, then collapses whitespace.
#[must_use]
pub fn clean_markdown(text: &str) -> String {
    let text = CITATIONS.replace_all(text, "");
    let text = BOLD.replace_all(&text, "$1");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

/// Returns the first prose paragraph of an answer.
///
/// The answer is split on blank lines and markdown headings; each block is
/// cleaned of citations, emphasis and double quotes. The first block of at
/// least 50 characters starting with an uppercase letter wins.
#[must_use]
pub fn extract_first_paragraph(text: &str) -> Option<String> {
    BLOCK_BREAK
        .split(text)
        .map(|block| clean_markdown(block).replace('"', "").trim().to_string())
        .find(|block| {
            block.chars().count() >= MIN_PARAGRAPH_CHARS
                && block.chars().next().is_some_and(char::is_uppercase)
        })
}

/// Returns the last number of an answer.
///
/// Bold numbers (`**199.99**`) mark the model's final answer and take
/// precedence over any plain number; otherwise the last decimal number,
/// optionally followed by a euro sign, is returned. The currency sign is not
/// part of the result.
#[must_use]
pub fn extract_last_number(text: &str) -> Option<String> {
    let cleaned = CITATIONS.replace_all(text, "");

    if let Some(bold) = BOLD_NUMBER.captures_iter(&cleaned).last() {
        return bold.get(1).map(|m| m.as_str().to_string());
    }

    NUMBER
        .find_iter(&cleaned)
        .last()
        .map(|m| m.as_str().trim_end_matches(|c: char| c == '€' || c.is_whitespace()).to_string())
}

/// Returns the last `http(s)://` URL of an answer.
#[must_use]
pub fn extract_last_url(text: &str) -> Option<String> {
    let cleaned = clean_citations(text);
    URL.find_iter(&cleaned)
        .last()
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ':', '\'', '"']).to_string())
        .filter(|url| url.contains("://") && !url.ends_with("://"))
}
