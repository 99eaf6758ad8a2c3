#![forbid(unsafe_code)]

//! An editable buffer: text store, undo journal and transaction depth.
//!
//! All text mutations should go through [`Buffer::insert`] and
//! [`Buffer::delete`], which apply the change and journal it in one step.
//! Journaled locations are re-resolved against the live text at replay
//! time, so a mutation that bypasses the buffer leaves replay to fail with
//! a storage or drift error rather than corrupt the text.
//!
//! # Modified Flag
//!
//! The buffer is modified exactly when the journal's current version
//! differs from the version recorded by the last [`Buffer::mark_saved`].
//! Undoing back to the saved state clears the flag; redoing forward sets it
//! again.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use quill_text::{Location, RopeStore, TextStore};

use crate::clock::{Clock, MonotonicClock};
use crate::transaction::{DepthProbe, EditDepth, EditScope, Publisher};
use crate::undo::{EditKind, EntryLog, LogConfig, RecordStatus, UndoError, VersionId};

/// A named text buffer with undo history.
pub struct Buffer<S: TextStore = RopeStore> {
    name: String,
    store: S,
    log: EntryLog,
    clock: Arc<dyn Clock>,
    saved_version_id: AtomicU64,
    transaction_depth: EditDepth,
}

impl<S: TextStore> fmt::Debug for Buffer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("name", &self.name)
            .field("len_bytes", &self.store.len_bytes())
            .field("log", &self.log)
            .field("saved_version_id", &self.saved_version_id())
            .field("transaction_depth", &self.transaction_depth())
            .finish()
    }
}

impl Buffer<RopeStore> {
    /// Empty buffer with default history settings.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_store(name, RopeStore::new())
    }

    /// Buffer holding `text`, considered saved.
    #[must_use]
    pub fn from_text(name: impl Into<String>, text: &str) -> Self {
        Self::with_store(name, RopeStore::from_text(text))
    }
}

impl<S: TextStore> Buffer<S> {
    /// Wrap an existing store. Its current contents are the saved state.
    #[must_use]
    pub fn with_store(name: impl Into<String>, store: S) -> Self {
        let log = EntryLog::default();
        let saved = log.current_version();
        Self {
            name: name.into(),
            store,
            log,
            clock: Arc::new(MonotonicClock::new()),
            saved_version_id: AtomicU64::new(saved),
            transaction_depth: EditDepth::new(),
        }
    }

    /// Replace the history configuration. Drops any existing history.
    #[must_use]
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.log = EntryLog::new(config);
        self.saved_version_id
            .store(self.log.current_version(), Ordering::Release);
        self
    }

    /// Use `clock` for edit timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Buffer name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Underlying text store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Whole text.
    #[must_use]
    pub fn contents(&self) -> String {
        self.store.contents()
    }

    /// Undo journal.
    #[must_use]
    pub fn log(&self) -> &EntryLog {
        &self.log
    }

    // ========================================================================
    // Editing
    // ========================================================================

    /// Insert `text` at `at` and journal it. Returns the location just past
    /// the inserted text.
    pub fn insert(&mut self, at: Location, text: &str) -> Result<Location, UndoError> {
        let end = self
            .store
            .insert_bytes(at, text)
            .map_err(UndoError::storage(at))?;
        self.record_insert(at, text)?;
        Ok(end)
    }

    /// Delete `len` bytes starting at `at` and journal them. Returns the
    /// removed text.
    pub fn delete(&mut self, at: Location, len: usize) -> Result<String, UndoError> {
        let removed = self
            .store
            .delete_bytes(at, len)
            .map_err(UndoError::storage(at))?;
        self.record_delete(at, &removed)?;
        Ok(removed)
    }

    /// Journal `text` just inserted at `at`.
    pub fn record_insert(&mut self, at: Location, text: &str) -> Result<RecordStatus, UndoError> {
        self.record(EditKind::Insert, at, text)
    }

    /// Journal `text` just removed from `at`.
    pub fn record_delete(&mut self, at: Location, text: &str) -> Result<RecordStatus, UndoError> {
        self.record(EditKind::Delete, at, text)
    }

    /// Journal an edit already applied to the store.
    ///
    /// Use this only when the store was mutated directly; `insert` and
    /// `delete` call it for you.
    pub fn record(
        &mut self,
        kind: EditKind,
        at: Location,
        text: &str,
    ) -> Result<RecordStatus, UndoError> {
        let now = self.clock.now_ms();
        self.log.record(kind, at, text, now)
    }

    /// Revert the most recent undoable entry.
    pub fn undo(&mut self) -> Result<bool, UndoError> {
        self.log.undo(&mut self.store)
    }

    /// Reapply the most recently undone entry.
    pub fn redo(&mut self) -> Result<bool, UndoError> {
        self.log.redo(&mut self.store)
    }

    /// Undo one entry and return where the cursor belongs afterwards.
    pub fn undo_step(&mut self) -> Result<Option<Location>, UndoError> {
        self.log.undo_step(&mut self.store)
    }

    /// Redo one entry and return where the cursor belongs afterwards.
    pub fn redo_step(&mut self) -> Result<Option<Location>, UndoError> {
        self.log.redo_step(&mut self.store)
    }

    /// Break coalescing, e.g. after the cursor moves.
    pub fn seal(&mut self) {
        self.log.seal();
    }

    /// Drop all history; the current text becomes unmodified.
    pub fn clear_history(&mut self) {
        self.log.clear();
        self.mark_saved();
    }

    // ========================================================================
    // Undo groups
    // ========================================================================

    /// Open an undo group bracket; returns the depth.
    pub fn group_begin(&mut self) -> u32 {
        self.log.group_begin()
    }

    /// Close an undo group bracket. Returns false if none was open.
    pub fn group_end(&mut self) -> bool {
        self.log.group_end()
    }

    /// Run `f` inside an undo group so its edits undo together.
    pub fn grouped<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.group_begin();
        let out = f(self);
        self.group_end();
        out
    }

    // ========================================================================
    // Save points
    // ========================================================================

    /// Record the current state as the one on disk.
    pub fn mark_saved(&mut self) {
        let version = self.log.mark_saved();
        self.saved_version_id.store(version, Ordering::Release);
    }

    /// Version recorded by the last save.
    #[must_use]
    pub fn saved_version_id(&self) -> VersionId {
        self.saved_version_id.load(Ordering::Acquire)
    }

    /// Whether the text differs from the last saved state.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.log.current_version() != self.saved_version_id()
    }

    // ========================================================================
    // Display transactions
    // ========================================================================

    /// Current display-publish depth.
    #[must_use]
    pub fn transaction_depth(&self) -> usize {
        self.transaction_depth.get()
    }

    /// Read-only depth handle for the resize gate.
    #[must_use]
    pub fn depth_probe(&self) -> DepthProbe {
        self.transaction_depth.probe()
    }

    /// Open a display-publish bracket.
    pub fn edit_begin(&self) -> usize {
        self.transaction_depth.begin()
    }

    /// Close a display-publish bracket; publishes on the outermost one.
    pub fn edit_commit(&self, publisher: &mut dyn Publisher) -> bool {
        self.transaction_depth.commit(publisher)
    }

    /// Abandon all open brackets and force a redraw.
    pub fn edit_abort(&self, publisher: &mut dyn Publisher) {
        self.transaction_depth.abort(publisher);
    }

    /// RAII display-publish bracket.
    ///
    /// The scope does not borrow the buffer, so edits can be made while it
    /// is open.
    pub fn edit_scope<'p>(&self, publisher: &'p mut dyn Publisher) -> EditScope<'p> {
        EditScope::new(&self.transaction_depth, publisher)
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Write the undo journal to `path`.
    #[cfg(feature = "state-persistence")]
    pub fn save_history(&self, path: &std::path::Path) -> Result<(), crate::undo::PersistError> {
        crate::undo::save_log(&self.log, &self.contents(), self.saved_version_id(), path)
    }

    /// Restore the undo journal from `path` if it matches the current text.
    ///
    /// Returns false when there was no journal file.
    #[cfg(feature = "state-persistence")]
    pub fn load_history(&mut self, path: &std::path::Path) -> Result<bool, crate::undo::PersistError> {
        let contents = self.contents();
        match crate::undo::load_log(&mut self.log, &contents, path)? {
            Some(saved) => {
                self.saved_version_id.store(saved, Ordering::Release);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Status-line form of [`Buffer::save_history`]: logs the error and
    /// returns false on failure.
    #[cfg(feature = "state-persistence")]
    pub fn save_to_file(&self, path: &std::path::Path) -> bool {
        match self.save_history(path) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(target: "quill.undo", buffer = %self.name, error = %err, "undo journal not saved");
                false
            }
        }
    }

    /// Status-line form of [`Buffer::load_history`]: true only when a
    /// journal was restored.
    #[cfg(feature = "state-persistence")]
    pub fn load_from_file(&mut self, path: &std::path::Path) -> bool {
        match self.load_history(path) {
            Ok(restored) => restored,
            Err(err) => {
                tracing::warn!(target: "quill.undo", buffer = %self.name, error = %err, "undo journal not loaded");
                false
            }
        }
    }
}
