//! Anchor-based text extraction.
//!
//! Documents are treated as opaque character streams: a value is whatever sits
//! between a start anchor and the first end anchor after it. No DOM is built.

use regex::Regex;
use std::sync::LazyLock;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("static tag regex"));

/// Locate the text between `start` and the first `end` that follows it.
///
/// Newlines, carriage returns and tabs inside the capture are removed. With
/// `strip_tags`, every `<...>` span is dropped. Each `cleanup` pattern is then
/// removed literally, in order, and the result is trimmed.
///
/// Returns `None` when either anchor is missing or when nothing is left after
/// cleanup. Never panics.
pub fn extract(
    document: &str,
    start: &str,
    end: &str,
    cleanup: &[&str],
    strip_tags: bool,
) -> Option<String> {
    let Some(start_pos) = document.find(start) else {
        tracing::trace!(anchor = start, "start anchor not found");
        return None;
    };
    let rest = &document[start_pos + start.len()..];
    let Some(end_pos) = rest.find(end) else {
        tracing::trace!(anchor = end, after = start, "end anchor not found");
        return None;
    };

    let raw = &rest[..end_pos];
    if raw.is_empty() {
        return None;
    }

    let mut text: String = raw
        .chars()
        .filter(|c| !matches!(c, '\n' | '\r' | '\t'))
        .collect();

    if strip_tags {
        text = TAG.replace_all(&text, "").into_owned();
    }

    for pattern in cleanup {
        if !pattern.is_empty() {
            text = text.replace(pattern, "");
        }
    }

    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Count non-overlapping occurrences of `pattern` in `text`.
///
/// Used to approximate list sizes (property cards, table rows) from repeated
/// markup. An empty pattern counts nothing.
pub fn count_occurrences(text: &str, pattern: &str) -> usize {
    if pattern.is_empty() {
        return 0;
    }
    text.matches(pattern).count()
}

/// A reusable anchor pair plus its cleanup rules.
///
/// Adapters declare their field tables as constants of this type.
#[derive(Debug, Clone, Copy)]
pub struct Anchored {
    pub start: &'static str,
    pub end: &'static str,
    pub cleanup: &'static [&'static str],
    pub strip_tags: bool,
}

impl Anchored {
    pub const fn new(start: &'static str, end: &'static str) -> Self {
        Self {
            start,
            end,
            cleanup: &[],
            strip_tags: false,
        }
    }

    pub const fn cleaned(mut self, cleanup: &'static [&'static str]) -> Self {
        self.cleanup = cleanup;
        self
    }

    pub const fn stripped(mut self) -> Self {
        self.strip_tags = true;
        self
    }

    pub fn extract(&self, document: &str) -> Option<String> {
        extract(document, self.start, self.end, self.cleanup, self.strip_tags)
    }
}
