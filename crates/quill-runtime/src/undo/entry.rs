#![forbid(unsafe_code)]

//! Journal entries and the edits they replay.
//!
//! An [`UndoEntry`] is the unit of one undo step. It owns one or more
//! [`Edit`]s in the order they were applied; heuristic coalescing keeps an
//! entry at a single edit whose payload grows, while an explicit group
//! appends further edits.
//!
//! # Invariants
//!
//! 1. `version_id` is unique within a journal and changes whenever the
//!    entry's effect changes (append or merge).
//! 2. An entry with more than one edit is never extended heuristically.
//! 3. Reverting an entry walks its edits back to front; reapplying walks
//!    them front to back. A failing step rolls back the steps already taken.

use quill_text::{Location, TextStore};

use super::error::UndoError;

/// Identifier of an explicit undo group.
pub type GroupId = u64;

/// Identifier of a document state produced by the journal.
pub type VersionId = u64;

/// Version of the state before any retained entry.
pub const BASE_VERSION: VersionId = 0;

/// Fixed per-entry bookkeeping charged by [`UndoEntry::size_bytes`].
const ENTRY_OVERHEAD: usize = std::mem::size_of::<UndoEntry>();
const EDIT_OVERHEAD: usize = std::mem::size_of::<Edit>();

/// What an edit did to the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditKind {
    /// Text was inserted at the location.
    Insert,
    /// Text starting at the location was removed.
    Delete,
    /// Reserved; rejected by the journal.
    Replace,
}

impl EditKind {
    /// Lowercase name used in logs and messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Delete => "delete",
            Self::Replace => "replace",
        }
    }
}

/// Which way a run of deletions grew.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeleteDirection {
    /// Each deletion ends where the previous one started (backspace).
    Backward,
    /// Each deletion starts where the previous one started (delete key).
    Forward,
}

/// A single journaled mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    kind: EditKind,
    location: Location,
    payload: String,
    direction: Option<DeleteDirection>,
}

impl Edit {
    /// Build an edit. `payload` is the inserted or removed text.
    #[must_use]
    pub fn new(kind: EditKind, location: Location, payload: impl Into<String>) -> Self {
        Self {
            kind,
            location,
            payload: payload.into(),
            direction: None,
        }
    }

    /// Edit kind.
    #[must_use]
    pub const fn kind(&self) -> EditKind {
        self.kind
    }

    /// Where the edit starts.
    #[must_use]
    pub const fn location(&self) -> Location {
        self.location
    }

    /// Inserted or removed text.
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Direction of a coalesced deletion run, once known.
    #[must_use]
    pub const fn direction(&self) -> Option<DeleteDirection> {
        self.direction
    }

    /// Location just past the payload, measured from `location`.
    #[must_use]
    pub fn end(&self) -> Location {
        self.location.advance(&self.payload)
    }

    /// Where the cursor rests once the edit has been performed.
    #[must_use]
    pub fn cursor_after_apply(&self) -> Location {
        match self.kind {
            EditKind::Insert => self.end(),
            _ => self.location,
        }
    }

    /// Where the cursor rests once the edit has been undone.
    #[must_use]
    pub fn cursor_after_revert(&self) -> Location {
        match self.kind {
            EditKind::Delete => self.end(),
            _ => self.location,
        }
    }

    #[cfg(feature = "state-persistence")]
    pub(crate) fn with_direction(mut self, direction: Option<DeleteDirection>) -> Self {
        self.direction = direction;
        self
    }

    pub(crate) fn append_payload(&mut self, text: &str) {
        self.payload.push_str(text);
    }

    pub(crate) fn prepend_payload(&mut self, location: Location, text: &str) {
        self.payload.insert_str(0, text);
        self.location = location;
    }

    pub(crate) fn set_direction(&mut self, direction: DeleteDirection) {
        self.direction = Some(direction);
    }

    fn size_bytes(&self) -> usize {
        EDIT_OVERHEAD + self.payload.len()
    }

    /// Perform the edit against `store`.
    pub(crate) fn apply<S: TextStore + ?Sized>(&self, store: &mut S) -> Result<(), UndoError> {
        match self.kind {
            EditKind::Insert => self.put(store),
            EditKind::Delete => self.take(store),
            EditKind::Replace => Err(UndoError::UnsupportedKind(self.kind)),
        }
    }

    /// Perform the inverse of the edit against `store`.
    pub(crate) fn revert<S: TextStore + ?Sized>(&self, store: &mut S) -> Result<(), UndoError> {
        match self.kind {
            EditKind::Insert => self.take(store),
            EditKind::Delete => self.put(store),
            EditKind::Replace => Err(UndoError::UnsupportedKind(self.kind)),
        }
    }

    fn put<S: TextStore + ?Sized>(&self, store: &mut S) -> Result<(), UndoError> {
        store
            .insert_bytes(self.location, &self.payload)
            .map(|_| ())
            .map_err(UndoError::storage(self.location))
    }

    fn take<S: TextStore + ?Sized>(&self, store: &mut S) -> Result<(), UndoError> {
        let removed = store
            .delete_bytes(self.location, self.payload.len())
            .map_err(UndoError::storage(self.location))?;
        if removed == self.payload {
            return Ok(());
        }
        // Put back what we took so the store is unchanged.
        store
            .insert_bytes(self.location, &removed)
            .map_err(UndoError::storage(self.location))?;
        Err(UndoError::StateDrift {
            at: self.location,
            expected: self.payload.clone(),
            actual: removed,
        })
    }
}

/// One undo step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoEntry {
    pub(crate) edits: Vec<Edit>,
    pub(crate) timestamp_ms: u64,
    pub(crate) group_id: Option<GroupId>,
    pub(crate) version_id: VersionId,
    pub(crate) is_save_point: bool,
    pub(crate) mergeable: bool,
}

impl UndoEntry {
    pub(crate) fn new(
        edit: Edit,
        timestamp_ms: u64,
        group_id: Option<GroupId>,
        version_id: VersionId,
    ) -> Self {
        Self {
            edits: vec![edit],
            timestamp_ms,
            group_id,
            version_id,
            is_save_point: false,
            mergeable: true,
        }
    }

    /// Kind of the first edit.
    #[must_use]
    pub fn kind(&self) -> EditKind {
        self.first().kind
    }

    /// Location of the first edit.
    #[must_use]
    pub fn location(&self) -> Location {
        self.first().location
    }

    /// Payload of the first edit.
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.first().payload
    }

    /// All edits, in application order.
    #[must_use]
    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    /// Clock reading of the most recent edit folded into this entry.
    #[must_use]
    pub const fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    /// Explicit group this entry belongs to, if any.
    #[must_use]
    pub const fn group_id(&self) -> Option<GroupId> {
        self.group_id
    }

    /// Version of the document state after this entry.
    #[must_use]
    pub const fn version_id(&self) -> VersionId {
        self.version_id
    }

    /// Whether the state after this entry was last written to disk.
    #[must_use]
    pub const fn is_save_point(&self) -> bool {
        self.is_save_point
    }

    /// Whether heuristic coalescing may still extend this entry.
    #[must_use]
    pub const fn is_mergeable(&self) -> bool {
        self.mergeable
    }

    /// Total payload bytes across all edits.
    #[must_use]
    pub fn payload_bytes(&self) -> usize {
        self.edits.iter().map(|e| e.payload.len()).sum()
    }

    /// Approximate heap footprint, used for memory accounting.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        ENTRY_OVERHEAD + self.edits.iter().map(Edit::size_bytes).sum::<usize>()
    }

    /// Cursor after undoing this entry: it rests on the oldest edit, which
    /// is reverted last.
    #[must_use]
    pub fn undo_cursor(&self) -> Location {
        self.first().cursor_after_revert()
    }

    /// Cursor after redoing this entry: it rests on the newest edit.
    #[must_use]
    pub fn redo_cursor(&self) -> Location {
        self.edits.last().unwrap_or_else(|| self.first()).cursor_after_apply()
    }

    pub(crate) fn is_single(&self) -> bool {
        self.edits.len() == 1
    }

    fn first(&self) -> &Edit {
        // Entries are only ever built through `new`, which seeds one edit.
        &self.edits[0]
    }

    pub(crate) fn first_mut(&mut self) -> &mut Edit {
        &mut self.edits[0]
    }

    /// Undo every edit, newest first.
    pub(crate) fn revert<S: TextStore + ?Sized>(&self, store: &mut S) -> Result<(), UndoError> {
        for (index, edit) in self.edits.iter().enumerate().rev() {
            if let Err(err) = edit.revert(store) {
                for done in &self.edits[index + 1..] {
                    if let Err(rollback) = done.apply(store) {
                        tracing::error!(
                            target: "quill.undo",
                            error = %rollback,
                            "rollback after failed undo step also failed"
                        );
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// Reapply every edit, oldest first.
    pub(crate) fn apply<S: TextStore + ?Sized>(&self, store: &mut S) -> Result<(), UndoError> {
        for (index, edit) in self.edits.iter().enumerate() {
            if let Err(err) = edit.apply(store) {
                for done in self.edits[..index].iter().rev() {
                    if let Err(rollback) = done.revert(store) {
                        tracing::error!(
                            target: "quill.undo",
                            error = %rollback,
                            "rollback after failed redo step also failed"
                        );
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_text::RopeStore;

    fn at(line: usize, offset: usize) -> Location {
        Location::new(line, offset)
    }

    #[test]
    fn insert_edit_round_trips_through_store() {
        let mut store = RopeStore::from_text("ac");
        let edit = Edit::new(EditKind::Insert, at(0, 1), "b");
        edit.apply(&mut store).unwrap();
        assert_eq!(store.contents(), "abc");
        edit.revert(&mut store).unwrap();
        assert_eq!(store.contents(), "ac");
    }

    #[test]
    fn delete_edit_restores_removed_text() {
        let mut store = RopeStore::from_text("ac");
        let edit = Edit::new(EditKind::Delete, at(0, 1), "b");
        edit.revert(&mut store).unwrap();
        assert_eq!(store.contents(), "abc");
        edit.apply(&mut store).unwrap();
        assert_eq!(store.contents(), "ac");
    }

    #[test]
    fn end_spans_newlines() {
        let edit = Edit::new(EditKind::Insert, at(2, 4), "x\nyz");
        assert_eq!(edit.end(), at(3, 2));
    }

    #[test]
    fn cursor_lands_past_restored_text() {
        let insert = Edit::new(EditKind::Insert, at(1, 2), "ab");
        assert_eq!(insert.cursor_after_apply(), at(1, 4));
        assert_eq!(insert.cursor_after_revert(), at(1, 2));
        let delete = Edit::new(EditKind::Delete, at(1, 2), "a\nb");
        assert_eq!(delete.cursor_after_apply(), at(1, 2));
        assert_eq!(delete.cursor_after_revert(), at(2, 1));
    }

    #[test]
    fn grouped_entry_cursor_uses_outermost_edits() {
        let mut entry = UndoEntry::new(Edit::new(EditKind::Insert, at(0, 0), "abc"), 0, Some(1), 1);
        entry.edits.push(Edit::new(EditKind::Delete, at(0, 5), "z"));
        assert_eq!(entry.undo_cursor(), at(0, 0));
        assert_eq!(entry.redo_cursor(), at(0, 5));
    }

    #[test]
    fn replace_is_rejected_on_replay() {
        let mut store = RopeStore::from_text("abc");
        let edit = Edit::new(EditKind::Replace, at(0, 0), "a");
        assert_eq!(
            edit.apply(&mut store),
            Err(UndoError::UnsupportedKind(EditKind::Replace))
        );
        assert_eq!(store.contents(), "abc");
    }

    #[test]
    fn mismatched_removal_reports_drift_and_restores() {
        let mut store = RopeStore::from_text("xyz");
        let edit = Edit::new(EditKind::Insert, at(0, 0), "ab");
        let err = edit.revert(&mut store).unwrap_err();
        assert!(matches!(err, UndoError::StateDrift { ref actual, .. } if actual == "xy"));
        assert_eq!(store.contents(), "xyz");
    }

    #[test]
    fn failed_step_rolls_back_earlier_steps() {
        let mut store = RopeStore::from_text("hello");
        let mut entry = UndoEntry::new(Edit::new(EditKind::Insert, at(0, 5), "!"), 0, Some(1), 1);
        // Second edit points past the end of the line.
        entry.edits.push(Edit::new(EditKind::Insert, at(0, 9), "?"));
        let err = entry.apply(&mut store).unwrap_err();
        assert!(matches!(err, UndoError::Storage { .. }));
        assert_eq!(store.contents(), "hello");
    }

    #[test]
    fn multi_edit_entry_reverts_in_reverse_order() {
        let mut store = RopeStore::from_text("");
        let mut entry = UndoEntry::new(Edit::new(EditKind::Insert, at(0, 0), "ab"), 0, Some(1), 1);
        entry.edits.push(Edit::new(EditKind::Insert, at(0, 1), "X"));
        entry.apply(&mut store).unwrap();
        assert_eq!(store.contents(), "aXb");
        entry.revert(&mut store).unwrap();
        assert_eq!(store.contents(), "");
    }

    #[test]
    fn size_accounts_for_payloads() {
        let small = UndoEntry::new(Edit::new(EditKind::Insert, at(0, 0), "a"), 0, None, 1);
        let large = UndoEntry::new(
            Edit::new(EditKind::Insert, at(0, 0), "a".repeat(1000)),
            0,
            None,
            2,
        );
        assert!(large.size_bytes() >= small.size_bytes() + 999);
        assert_eq!(large.payload_bytes(), 1000);
    }
}
