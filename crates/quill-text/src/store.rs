#![forbid(unsafe_code)]

//! The storage adapter trait.
//!
//! # Invariants
//!
//! - A call that returns `Err` leaves the text unchanged.
//! - `insert_bytes(at, t)` followed by `delete_bytes(at, t.len())` restores
//!   the prior text exactly and returns `t`.
//! - `delete_bytes(at, n)` followed by `insert_bytes(at, removed)` restores
//!   the prior text exactly.

use std::fmt;

use crate::location::Location;

/// Errors raised by a [`TextStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextError {
    /// Line index past the last line.
    LineOutOfBounds { line: usize, lines: usize },
    /// Offset past the end of the addressed line.
    OffsetOutOfBounds { at: Location, line_len: usize },
    /// Range extends past the end of the text.
    RangeOutOfBounds { at: Location, len: usize, available: usize },
    /// Address splits a UTF-8 sequence.
    NotCharBoundary { byte: usize },
}

impl fmt::Display for TextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LineOutOfBounds { line, lines } => {
                write!(f, "line {} out of bounds ({} lines)", line + 1, lines)
            }
            Self::OffsetOutOfBounds { at, line_len } => {
                write!(f, "offset {at} out of bounds (line length {line_len})")
            }
            Self::RangeOutOfBounds { at, len, available } => {
                write!(f, "{len} bytes at {at} exceed the {available} available")
            }
            Self::NotCharBoundary { byte } => {
                write!(f, "byte {byte} is not on a character boundary")
            }
        }
    }
}

impl std::error::Error for TextError {}

/// Byte-level text storage addressed by [`Location`].
///
/// The undo engine uses `delete_bytes`/`read_bytes` to capture payloads and
/// `insert_bytes`/`delete_bytes` to replay them.
pub trait TextStore {
    /// Insert `text` at `at`, returning the location just past it.
    fn insert_bytes(&mut self, at: Location, text: &str) -> Result<Location, TextError>;

    /// Delete `len` bytes starting at `at` and return them.
    ///
    /// The range may span lines; each `\n` counts as one byte.
    fn delete_bytes(&mut self, at: Location, len: usize) -> Result<String, TextError>;

    /// Read `len` bytes starting at `at` without mutating.
    fn read_bytes(&self, at: Location, len: usize) -> Result<String, TextError>;

    /// Number of lines (an empty store has one empty line).
    fn line_count(&self) -> usize;

    /// Byte length of `line`, excluding its `\n`.
    fn line_len(&self, line: usize) -> Option<usize>;

    /// Total byte length.
    fn len_bytes(&self) -> usize;

    /// Full text as an owned string.
    fn contents(&self) -> String;

    /// Whether the store holds no text.
    fn is_empty(&self) -> bool {
        self.len_bytes() == 0
    }

    /// Text of `line`, excluding its `\n`.
    fn line_text(&self, line: usize) -> Option<String> {
        let len = self.line_len(line)?;
        self.read_bytes(Location::new(line, 0), len).ok()
    }
}
