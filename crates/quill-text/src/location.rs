#![forbid(unsafe_code)]

//! Line + byte-offset addressing.

use std::fmt;

/// A position in a text store.
///
/// `line` is a 0-based line index and `offset` a byte offset into that
/// line's text, excluding its terminating `\n`. Locations order
/// lexicographically, which matches document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Location {
    /// Line index (0-based).
    pub line: usize,
    /// Byte offset within the line.
    pub offset: usize,
}

impl Location {
    /// Start of the first line.
    pub const ORIGIN: Self = Self { line: 0, offset: 0 };

    /// Create a location from a line index and byte offset.
    #[must_use]
    pub const fn new(line: usize, offset: usize) -> Self {
        Self { line, offset }
    }

    /// Location reached after inserting `text` here.
    ///
    /// Each `\n` moves to the start of the next line; the bytes after the
    /// last newline advance the offset.
    #[must_use]
    pub fn advance(self, text: &str) -> Self {
        match text.rfind('\n') {
            None => Self::new(self.line, self.offset + text.len()),
            Some(last_nl) => {
                let newlines = text.bytes().filter(|&b| b == b'\n').count();
                Self::new(self.line + newlines, text.len() - last_nl - 1)
            }
        }
    }

    /// Whether `text` inserted at `self` would end exactly at `other`.
    #[must_use]
    pub fn reaches(self, text: &str, other: Self) -> bool {
        self.advance(text) == other
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.offset)
    }
}
