#![forbid(unsafe_code)]

//! `ropey`-backed [`TextStore`].
//!
//! Lines are terminated by `\n` only. A [`Location`] resolves to an absolute
//! byte index through the rope's line table, and every resolved index is
//! checked against UTF-8 character boundaries before the rope is touched.

use ropey::Rope;

use crate::location::Location;
use crate::store::{TextError, TextStore};

/// Rope-backed line store.
#[derive(Debug, Clone)]
pub struct RopeStore {
    rope: Rope,
}

impl Default for RopeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RopeStore {
    /// Create an empty store (one empty line).
    #[must_use]
    pub fn new() -> Self {
        Self { rope: Rope::new() }
    }

    /// Create a store holding `text`.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
        }
    }

    /// Borrow the underlying rope.
    #[must_use]
    pub fn rope(&self) -> &Rope {
        &self.rope
    }

    /// Resolve `at` to an absolute byte index.
    pub fn byte_index(&self, at: Location) -> Result<usize, TextError> {
        let lines = self.rope.len_lines();
        if at.line >= lines {
            return Err(TextError::LineOutOfBounds {
                line: at.line,
                lines,
            });
        }
        let (start, end) = self.line_span(at.line);
        let line_len = end - start;
        if at.offset > line_len {
            return Err(TextError::OffsetOutOfBounds { at, line_len });
        }
        let byte = start + at.offset;
        self.check_boundary(byte)?;
        Ok(byte)
    }

    /// Location of an absolute byte index, if it is in range.
    #[must_use]
    pub fn location_of(&self, byte: usize) -> Option<Location> {
        if byte > self.rope.len_bytes() {
            return None;
        }
        let line = self.rope.byte_to_line(byte);
        Some(Location::new(line, byte - self.rope.line_to_byte(line)))
    }

    /// Byte span of `line` excluding its `\n`. `line` must be in range.
    fn line_span(&self, line: usize) -> (usize, usize) {
        let start = self.rope.line_to_byte(line);
        let end = if line + 1 < self.rope.len_lines() {
            self.rope.line_to_byte(line + 1) - 1
        } else {
            self.rope.len_bytes()
        };
        (start, end)
    }

    fn check_boundary(&self, byte: usize) -> Result<usize, TextError> {
        let char_idx = self.rope.byte_to_char(byte);
        if self.rope.char_to_byte(char_idx) != byte {
            return Err(TextError::NotCharBoundary { byte });
        }
        Ok(char_idx)
    }

    /// Validate `len` bytes from `at` and return the char range.
    fn char_range(&self, at: Location, len: usize) -> Result<(usize, usize), TextError> {
        let start = self.byte_index(at)?;
        let available = self.rope.len_bytes() - start;
        if len > available {
            return Err(TextError::RangeOutOfBounds { at, len, available });
        }
        let first = self.check_boundary(start)?;
        let last = self.check_boundary(start + len)?;
        Ok((first, last))
    }
}

impl From<&str> for RopeStore {
    fn from(text: &str) -> Self {
        Self::from_text(text)
    }
}

impl TextStore for RopeStore {
    fn insert_bytes(&mut self, at: Location, text: &str) -> Result<Location, TextError> {
        let byte = self.byte_index(at)?;
        let char_idx = self.rope.byte_to_char(byte);
        self.rope.insert(char_idx, text);
        tracing::trace!(target: "quill.text", at = %at, len = text.len(), "insert");
        Ok(at.advance(text))
    }

    fn delete_bytes(&mut self, at: Location, len: usize) -> Result<String, TextError> {
        let (first, last) = self.char_range(at, len)?;
        let removed = self.rope.slice(first..last).to_string();
        self.rope.remove(first..last);
        tracing::trace!(target: "quill.text", at = %at, len, "delete");
        Ok(removed)
    }

    fn read_bytes(&self, at: Location, len: usize) -> Result<String, TextError> {
        let (first, last) = self.char_range(at, len)?;
        Ok(self.rope.slice(first..last).to_string())
    }

    fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    fn line_len(&self, line: usize) -> Option<usize> {
        if line >= self.rope.len_lines() {
            return None;
        }
        let (start, end) = self.line_span(line);
        Some(end - start)
    }

    fn len_bytes(&self) -> usize {
        self.rope.len_bytes()
    }

    fn contents(&self) -> String {
        self.rope.to_string()
    }
}
