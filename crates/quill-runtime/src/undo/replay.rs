#![forbid(unsafe_code)]

//! Undo and redo against a [`TextStore`].
//!
//! Replay mutates the store directly. While it runs, the log's
//! `replaying` flag is set so any edit reported back through
//! [`EntryLog::record`] is dropped instead of journaled. A failed replay
//! leaves both the store and the cursor where they were.

use quill_text::{Location, TextStore};

use super::error::UndoError;
use super::log::EntryLog;

/// Holds the replay flag for the duration of one undo or redo step.
pub(crate) struct ReplayGuard<'a> {
    flag: &'a mut bool,
}

impl<'a> ReplayGuard<'a> {
    pub(crate) fn enter(flag: &'a mut bool) -> Self {
        *flag = true;
        Self { flag }
    }
}

impl Drop for ReplayGuard<'_> {
    fn drop(&mut self) {
        *self.flag = false;
    }
}

impl EntryLog {
    /// Revert the entry before the cursor.
    ///
    /// Returns `Ok(false)` when there is nothing to undo.
    pub fn undo<S: TextStore + ?Sized>(&mut self, store: &mut S) -> Result<bool, UndoError> {
        self.undo_step(store).map(|cursor| cursor.is_some())
    }

    /// Reapply the entry at the cursor.
    ///
    /// Returns `Ok(false)` when there is nothing to redo.
    pub fn redo<S: TextStore + ?Sized>(&mut self, store: &mut S) -> Result<bool, UndoError> {
        self.redo_step(store).map(|cursor| cursor.is_some())
    }

    /// [`EntryLog::undo`], returning where the editing cursor belongs
    /// afterwards, or `None` when there was nothing to undo.
    pub fn undo_step<S: TextStore + ?Sized>(
        &mut self,
        store: &mut S,
    ) -> Result<Option<Location>, UndoError> {
        let Some(index) = self.position.checked_sub(1) else {
            return Ok(None);
        };
        let Some(entry) = self.entries.get(index) else {
            return Ok(None);
        };
        let version = entry.version_id();
        let _span = tracing::debug_span!(
            target: "quill.undo",
            "undo",
            index,
            version,
            edits = entry.edits().len()
        )
        .entered();

        let outcome = {
            let _guard = ReplayGuard::enter(&mut self.replaying);
            entry.revert(store)
        };
        if let Err(err) = outcome {
            tracing::warn!(target: "quill.undo", error = %err, "undo failed; log unchanged");
            return Err(err);
        }

        let cursor = entry.undo_cursor();
        self.position = index;
        self.group.seal();
        tracing::debug!(target: "quill.undo", position = self.position, %cursor, "undo applied");
        Ok(Some(cursor))
    }

    /// [`EntryLog::redo`], returning where the editing cursor belongs
    /// afterwards, or `None` when there was nothing to redo.
    pub fn redo_step<S: TextStore + ?Sized>(
        &mut self,
        store: &mut S,
    ) -> Result<Option<Location>, UndoError> {
        let index = self.position;
        let Some(entry) = self.entries.get(index) else {
            return Ok(None);
        };
        let version = entry.version_id();
        let _span = tracing::debug_span!(
            target: "quill.undo",
            "redo",
            index,
            version,
            edits = entry.edits().len()
        )
        .entered();

        let outcome = {
            let _guard = ReplayGuard::enter(&mut self.replaying);
            entry.apply(store)
        };
        if let Err(err) = outcome {
            tracing::warn!(target: "quill.undo", error = %err, "redo failed; log unchanged");
            return Err(err);
        }

        let cursor = entry.redo_cursor();
        self.position = index + 1;
        self.group.seal();
        tracing::debug!(target: "quill.undo", position = self.position, %cursor, "redo applied");
        Ok(Some(cursor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::undo::entry::EditKind;
    use quill_text::{Location, RopeStore};

    fn at(offset: usize) -> Location {
        Location::new(0, offset)
    }

    /// Apply an insert to the store and journal it.
    fn type_at(log: &mut EntryLog, store: &mut RopeStore, offset: usize, text: &str, now: u64) {
        store.insert_bytes(at(offset), text).unwrap();
        log.record(EditKind::Insert, at(offset), text, now).unwrap();
    }

    #[test]
    fn undo_on_empty_log_is_noop() {
        let mut log = EntryLog::default();
        let mut store = RopeStore::from_text("abc");
        assert_eq!(log.undo(&mut store), Ok(false));
        assert_eq!(log.redo(&mut store), Ok(false));
        assert_eq!(store.contents(), "abc");
    }

    #[test]
    fn undo_then_redo_restores_text() {
        let mut log = EntryLog::default();
        let mut store = RopeStore::new();
        type_at(&mut log, &mut store, 0, "abc", 0);
        type_at(&mut log, &mut store, 3, "def", 5000);

        assert_eq!(log.undo(&mut store), Ok(true));
        assert_eq!(store.contents(), "abc");
        assert_eq!(log.position(), 1);
        assert_eq!(log.undo(&mut store), Ok(true));
        assert_eq!(store.contents(), "");
        assert_eq!(log.undo(&mut store), Ok(false));

        assert_eq!(log.redo(&mut store), Ok(true));
        assert_eq!(log.redo(&mut store), Ok(true));
        assert_eq!(store.contents(), "abcdef");
        assert_eq!(log.redo(&mut store), Ok(false));
    }

    #[test]
    fn steps_report_cursor_location() {
        let mut log = EntryLog::default();
        let mut store = RopeStore::new();
        type_at(&mut log, &mut store, 0, "abc", 0);
        type_at(&mut log, &mut store, 3, "def", 5000);
        store.delete_bytes(at(1), 2).unwrap();
        log.record(EditKind::Delete, at(1), "bc", 10_000).unwrap();
        assert_eq!(store.contents(), "adef");

        assert_eq!(log.undo_step(&mut store), Ok(Some(at(3))));
        assert_eq!(store.contents(), "abcdef");
        assert_eq!(log.undo_step(&mut store), Ok(Some(at(3))));
        assert_eq!(log.undo_step(&mut store), Ok(Some(at(0))));
        assert_eq!(log.undo_step(&mut store), Ok(None));

        assert_eq!(log.redo_step(&mut store), Ok(Some(at(3))));
        assert_eq!(log.redo_step(&mut store), Ok(Some(at(6))));
        assert_eq!(log.redo_step(&mut store), Ok(Some(at(1))));
        assert_eq!(log.redo_step(&mut store), Ok(None));
        assert_eq!(store.contents(), "adef");
    }

    #[test]
    fn failed_undo_leaves_position_and_text() {
        let mut log = EntryLog::default();
        let mut store = RopeStore::new();
        type_at(&mut log, &mut store, 0, "hello", 0);
        // Someone edited the store behind the journal's back.
        store.delete_bytes(at(0), 5).unwrap();
        store.insert_bytes(at(0), "xy").unwrap();

        let err = log.undo(&mut store).unwrap_err();
        assert!(matches!(err, UndoError::Storage { .. }));
        assert_eq!(log.position(), 1);
        assert_eq!(store.contents(), "xy");
        assert!(!log.is_replaying());
    }

    #[test]
    fn undo_seals_the_window() {
        let mut log = EntryLog::default();
        let mut store = RopeStore::new();
        type_at(&mut log, &mut store, 0, "ab", 0);
        type_at(&mut log, &mut store, 2, "cd", 5000);
        log.undo(&mut store).unwrap();
        // Adjacent and within the window of "ab", but sealed by undo.
        type_at(&mut log, &mut store, 2, "x", 5001);
        assert_eq!(log.len(), 2);
        assert_eq!(store.contents(), "abx");
    }

    #[test]
    fn guard_resets_flag_on_drop() {
        let mut flag = false;
        {
            let _guard = ReplayGuard::enter(&mut flag);
        }
        assert!(!flag);
    }
}
