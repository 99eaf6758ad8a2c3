#![forbid(unsafe_code)]

//! Whitespace classification for undo coalescing.
//!
//! A grapheme counts as whitespace when every scalar in it is whitespace,
//! the same rule the line wrapper uses to split words.

use unicode_segmentation::UnicodeSegmentation;

fn is_whitespace_grapheme(grapheme: &str) -> bool {
    grapheme.chars().all(char::is_whitespace)
}

/// Whether `text` is, or begins with, whitespace (including newlines).
#[must_use]
pub fn starts_with_whitespace(text: &str) -> bool {
    text.graphemes(true).next().is_some_and(is_whitespace_grapheme)
}

/// Whether `text` ends with whitespace (including newlines).
#[must_use]
pub fn ends_with_whitespace(text: &str) -> bool {
    text.graphemes(true)
        .next_back()
        .is_some_and(is_whitespace_grapheme)
}
