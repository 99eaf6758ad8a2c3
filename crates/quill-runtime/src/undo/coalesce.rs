#![forbid(unsafe_code)]

//! Heuristic coalescing of consecutive edits into one undo step.
//!
//! Typing "hello" records five single-byte inserts; folded together they
//! undo in one step. A new edit extends the journal's tail entry when all
//! of these hold:
//!
//! - the tail is a plain single-edit entry (not grouped, not sealed, not
//!   oversized)
//! - the kinds match
//! - the new edit arrives within `window_ms` of the tail's timestamp
//! - the combined payload stays within `max_entry_bytes`
//! - the positions are adjacent
//!
//! # Adjacency
//!
//! ```text
//! insert     tail "hel" at 0:0, next at 0:3      -> append        "hell"
//! backspace  tail "l" at 0:3, next "l" at 0:2     -> prepend at 0:2 "ll"
//! forward    tail "l" at 0:2, next "o" at 0:2     -> append        "lo"
//! ```
//!
//! A deletion run keeps the direction it started with; switching from
//! backspace to delete-forward starts a new entry.
//!
//! Inserts additionally refuse to cross a word boundary: whitespace typed
//! after a non-whitespace tail starts a new entry unless
//! `merge_across_words` is set.

use quill_text::{Location, ends_with_whitespace, starts_with_whitespace};

use super::entry::{DeleteDirection, EditKind, UndoEntry};

/// Default coalescing window.
pub const DEFAULT_WINDOW_MS: u64 = 400;

/// Default ceiling on a single entry's payload.
pub const DEFAULT_MAX_ENTRY_BYTES: usize = 64 * 1024;

/// Configuration for edit coalescing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeConfig {
    /// Maximum gap between edits that may still merge (milliseconds).
    pub window_ms: u64,
    /// Maximum payload bytes in one entry; larger payloads are never merged.
    pub max_entry_bytes: usize,
    /// Whether whitespace after a word may extend the word's entry.
    pub merge_across_words: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            window_ms: DEFAULT_WINDOW_MS,
            max_entry_bytes: DEFAULT_MAX_ENTRY_BYTES,
            merge_across_words: false,
        }
    }
}

impl MergeConfig {
    /// Configuration with a custom window and default limits.
    #[must_use]
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            ..Self::default()
        }
    }

    /// Set the per-entry payload ceiling.
    #[must_use]
    pub fn with_max_entry_bytes(mut self, max_entry_bytes: usize) -> Self {
        self.max_entry_bytes = max_entry_bytes;
        self
    }

    /// Allow whitespace to extend a word's entry.
    #[must_use]
    pub fn with_merge_across_words(mut self, enabled: bool) -> Self {
        self.merge_across_words = enabled;
        self
    }
}

/// Why an edit did not merge into the tail entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergeRefusal {
    /// The window was sealed by undo, redo, a group boundary or the caller.
    Sealed,
    /// The tail holds an oversized payload.
    NotMergeable,
    /// The tail belongs to an explicit group.
    Grouped,
    /// The tail already holds several edits.
    MultiEdit,
    /// Insert after delete or vice versa.
    KindMismatch,
    /// Too long since the tail was last extended.
    WindowElapsed,
    /// Merging would exceed `max_entry_bytes`.
    SizeCap,
    /// The edits do not touch.
    NotAdjacent,
    /// A deletion run changed direction.
    DirectionChange,
    /// Whitespace typed after a word.
    WordBoundary,
}

impl MergeRefusal {
    /// Short reason for logs.
    #[must_use]
    pub const fn reason(self) -> &'static str {
        match self {
            Self::Sealed => "sealed",
            Self::NotMergeable => "not_mergeable",
            Self::Grouped => "grouped",
            Self::MultiEdit => "multi_edit",
            Self::KindMismatch => "kind_mismatch",
            Self::WindowElapsed => "window_elapsed",
            Self::SizeCap => "size_cap",
            Self::NotAdjacent => "not_adjacent",
            Self::DirectionChange => "direction_change",
            Self::WordBoundary => "word_boundary",
        }
    }
}

/// How an accepted edit is folded into the tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Splice {
    Append,
    Backspace,
    ForwardDelete,
}

/// Whether an edit of `kind` at `location` carrying `text` may extend `prev`.
#[must_use]
pub fn should_merge(
    prev: &UndoEntry,
    kind: EditKind,
    location: Location,
    text: &str,
    now_ms: u64,
    config: &MergeConfig,
) -> bool {
    plan(prev, kind, location, text, now_ms, config).is_ok()
}

pub(crate) fn plan(
    prev: &UndoEntry,
    kind: EditKind,
    location: Location,
    text: &str,
    now_ms: u64,
    config: &MergeConfig,
) -> Result<Splice, MergeRefusal> {
    if !prev.is_mergeable() {
        return Err(MergeRefusal::NotMergeable);
    }
    if prev.group_id().is_some() {
        return Err(MergeRefusal::Grouped);
    }
    if !prev.is_single() {
        return Err(MergeRefusal::MultiEdit);
    }
    let last = &prev.edits()[0];
    if last.kind() != kind {
        return Err(MergeRefusal::KindMismatch);
    }
    if now_ms.saturating_sub(prev.timestamp_ms()) > config.window_ms {
        return Err(MergeRefusal::WindowElapsed);
    }
    if last.payload().len() + text.len() > config.max_entry_bytes {
        return Err(MergeRefusal::SizeCap);
    }

    match kind {
        EditKind::Insert => {
            if location != last.end() {
                return Err(MergeRefusal::NotAdjacent);
            }
            if !config.merge_across_words
                && starts_with_whitespace(text)
                && !ends_with_whitespace(last.payload())
            {
                return Err(MergeRefusal::WordBoundary);
            }
            Ok(Splice::Append)
        }
        EditKind::Delete => {
            let forward = location == last.location();
            let backward = location.advance(text) == last.location();
            match (forward, backward, last.direction()) {
                (true, _, None | Some(DeleteDirection::Forward)) => Ok(Splice::ForwardDelete),
                (_, true, None | Some(DeleteDirection::Backward)) => Ok(Splice::Backspace),
                (false, false, _) => Err(MergeRefusal::NotAdjacent),
                _ => Err(MergeRefusal::DirectionChange),
            }
        }
        EditKind::Replace => Err(MergeRefusal::KindMismatch),
    }
}

/// Fold `text` into `entry` as decided by [`plan`].
pub(crate) fn splice(
    entry: &mut UndoEntry,
    splice: Splice,
    location: Location,
    text: &str,
    now_ms: u64,
) {
    let edit = entry.first_mut();
    match splice {
        Splice::Append => edit.append_payload(text),
        Splice::ForwardDelete => {
            edit.append_payload(text);
            edit.set_direction(DeleteDirection::Forward);
        }
        Splice::Backspace => {
            edit.prepend_payload(location, text);
            edit.set_direction(DeleteDirection::Backward);
        }
    }
    entry.timestamp_ms = now_ms;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::undo::entry::Edit;

    fn at(line: usize, offset: usize) -> Location {
        Location::new(line, offset)
    }

    fn tail(kind: EditKind, location: Location, text: &str, ts: u64) -> UndoEntry {
        UndoEntry::new(Edit::new(kind, location, text), ts, None, 1)
    }

    fn cfg() -> MergeConfig {
        MergeConfig::default()
    }

    #[test]
    fn adjacent_insert_within_window_merges() {
        let prev = tail(EditKind::Insert, at(0, 0), "hel", 0);
        assert!(should_merge(&prev, EditKind::Insert, at(0, 3), "l", 100, &cfg()));
    }

    #[test]
    fn window_edge_is_inclusive() {
        let prev = tail(EditKind::Insert, at(0, 0), "a", 1000);
        assert!(should_merge(&prev, EditKind::Insert, at(0, 1), "b", 1400, &cfg()));
        assert_eq!(
            plan(&prev, EditKind::Insert, at(0, 1), "b", 1401, &cfg()),
            Err(MergeRefusal::WindowElapsed)
        );
    }

    #[test]
    fn gap_in_positions_is_not_adjacent() {
        let prev = tail(EditKind::Insert, at(0, 0), "ab", 0);
        assert_eq!(
            plan(&prev, EditKind::Insert, at(0, 5), "c", 0, &cfg()),
            Err(MergeRefusal::NotAdjacent)
        );
    }

    #[test]
    fn insert_after_newline_is_adjacent_on_next_line() {
        let prev = tail(EditKind::Insert, at(3, 7), "x\n", 0);
        assert!(should_merge(&prev, EditKind::Insert, at(4, 0), "y", 10, &cfg()));
    }

    #[test]
    fn space_after_word_starts_new_entry() {
        let prev = tail(EditKind::Insert, at(0, 0), "hello", 0);
        assert_eq!(
            plan(&prev, EditKind::Insert, at(0, 5), " ", 1, &cfg()),
            Err(MergeRefusal::WordBoundary)
        );
        let across = cfg().with_merge_across_words(true);
        assert!(should_merge(&prev, EditKind::Insert, at(0, 5), " ", 1, &across));
    }

    #[test]
    fn word_after_space_continues_entry() {
        let prev = tail(EditKind::Insert, at(0, 5), " ", 0);
        assert!(should_merge(&prev, EditKind::Insert, at(0, 6), "w", 1, &cfg()));
    }

    #[test]
    fn backspace_run_prepends() {
        let mut prev = tail(EditKind::Delete, at(0, 4), "o", 0);
        let step = plan(&prev, EditKind::Delete, at(0, 3), "l", 50, &cfg()).unwrap();
        assert_eq!(step, Splice::Backspace);
        splice(&mut prev, step, at(0, 3), "l", 50);
        assert_eq!(prev.location(), at(0, 3));
        assert_eq!(prev.payload(), "lo");
        assert_eq!(prev.timestamp_ms(), 50);
        assert_eq!(prev.edits()[0].direction(), Some(DeleteDirection::Backward));
    }

    #[test]
    fn forward_delete_run_appends() {
        let mut prev = tail(EditKind::Delete, at(0, 2), "l", 0);
        let step = plan(&prev, EditKind::Delete, at(0, 2), "o", 50, &cfg()).unwrap();
        assert_eq!(step, Splice::ForwardDelete);
        splice(&mut prev, step, at(0, 2), "o", 50);
        assert_eq!(prev.location(), at(0, 2));
        assert_eq!(prev.payload(), "lo");
    }

    #[test]
    fn deletion_run_keeps_its_direction() {
        let mut prev = tail(EditKind::Delete, at(0, 4), "o", 0);
        splice(&mut prev, Splice::Backspace, at(0, 3), "l", 10);
        // Delete-forward at the run's new start flips direction.
        assert_eq!(
            plan(&prev, EditKind::Delete, at(0, 3), "x", 20, &cfg()),
            Err(MergeRefusal::DirectionChange)
        );
    }

    #[test]
    fn kinds_do_not_mix() {
        let prev = tail(EditKind::Insert, at(0, 0), "a", 0);
        assert_eq!(
            plan(&prev, EditKind::Delete, at(0, 0), "a", 0, &cfg()),
            Err(MergeRefusal::KindMismatch)
        );
    }

    #[test]
    fn size_cap_forces_split() {
        let prev = tail(EditKind::Insert, at(0, 0), "abcd", 0);
        let small = cfg().with_max_entry_bytes(5);
        assert!(should_merge(&prev, EditKind::Insert, at(0, 4), "e", 0, &small));
        assert_eq!(
            plan(&prev, EditKind::Insert, at(0, 4), "ef", 0, &small),
            Err(MergeRefusal::SizeCap)
        );
    }

    #[test]
    fn grouped_and_unmergeable_tails_refuse() {
        let grouped = UndoEntry::new(Edit::new(EditKind::Insert, at(0, 0), "a"), 0, Some(7), 1);
        assert_eq!(
            plan(&grouped, EditKind::Insert, at(0, 1), "b", 0, &cfg()),
            Err(MergeRefusal::Grouped)
        );
        let mut oversized = tail(EditKind::Insert, at(0, 0), "a", 0);
        oversized.mergeable = false;
        assert_eq!(
            plan(&oversized, EditKind::Insert, at(0, 1), "b", 0, &cfg()),
            Err(MergeRefusal::NotMergeable)
        );
    }
}
