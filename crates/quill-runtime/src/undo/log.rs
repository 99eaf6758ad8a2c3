#![forbid(unsafe_code)]

//! The per-buffer entry log.
//!
//! [`EntryLog`] is a linear journal with a position cursor. Entries before
//! the cursor are undoable; entries at or after it are redoable. Recording
//! a new edit discards the redo tail first.
//!
//! # Invariants
//!
//! 1. `0 <= position <= entries.len() <= capacity <= config.max_entries`
//! 2. `total_bytes` always equals the sum of `size_bytes()` over entries
//! 3. The redo tail is empty after every successful record
//! 4. `version_id`s strictly increase from front to back
//!
//! # Memory Model
//!
//! Entries live in a `VecDeque` so eviction from the front is O(1).
//! Capacity starts at `initial_capacity` and doubles on demand up to
//! `max_entries`. When the ceiling is reached, or the allocator refuses to
//! grow, the oldest entry is evicted and the base version moves up to it.
//!
//! ```text
//! record(e5) at position 3
//! ┌──────────────────────────────────────────────┐
//! │ [e1, e2, e3 | e4]          position = 3       │
//! │  truncate redo tail ──► [e1, e2, e3]          │
//! │  append            ──► [e1, e2, e3, e5]       │
//! └──────────────────────────────────────────────┘
//!
//! record(e6) at ceiling (max_entries = 4)
//! ┌──────────────────────────────────────────────┐
//! │ evict e1, base_version = e1.version_id        │
//! │ [e2, e3, e5, e6]                              │
//! └──────────────────────────────────────────────┘
//! ```

use std::collections::VecDeque;
use std::fmt;

use quill_text::Location;

use super::coalesce::{self, MergeConfig, MergeRefusal};
use super::entry::{BASE_VERSION, Edit, EditKind, UndoEntry, VersionId};
use super::error::UndoError;
use super::group::{GroupEnd, GroupState, LastEdit};

/// Default starting capacity of a log.
pub const DEFAULT_INITIAL_CAPACITY: usize = 128;

/// Default ceiling on retained entries.
pub const DEFAULT_MAX_ENTRIES: usize = 65_536;

/// Capacity a log starts with when the requested reservation is refused.
pub const FALLBACK_CAPACITY: usize = 16;

/// Configuration for an [`EntryLog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    /// Capacity reserved up front.
    pub initial_capacity: usize,
    /// Hard ceiling on retained entries.
    pub max_entries: usize,
    /// Coalescing rules.
    pub merge: MergeConfig,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_entries: DEFAULT_MAX_ENTRIES,
            merge: MergeConfig::default(),
        }
    }
}

impl LogConfig {
    /// Configuration with custom capacity bounds.
    #[must_use]
    pub fn new(initial_capacity: usize, max_entries: usize) -> Self {
        Self {
            initial_capacity,
            max_entries,
            merge: MergeConfig::default(),
        }
    }

    /// Set the coalescing rules.
    #[must_use]
    pub fn with_merge_config(mut self, merge: MergeConfig) -> Self {
        self.merge = merge;
        self
    }

    /// Unbounded configuration (for testing).
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_entries: usize::MAX,
            merge: MergeConfig::default(),
        }
    }

    fn ceiling(&self) -> usize {
        self.max_entries.max(1)
    }
}

/// What happened to a recorded edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    /// A new entry was appended.
    Appended,
    /// The edit extended the tail entry.
    Merged,
    /// A new entry was appended after evicting the oldest one.
    Evicted,
    /// The payload exceeded the per-entry cap; stored alone, never merged.
    Oversized,
    /// Recording is suspended during replay.
    Suppressed,
    /// Empty payload; nothing to journal.
    Empty,
}

/// Linear undo journal for one buffer.
pub struct EntryLog {
    pub(crate) entries: VecDeque<UndoEntry>,
    pub(crate) position: usize,
    capacity: usize,
    config: LogConfig,
    total_bytes: usize,
    pub(crate) base_version: VersionId,
    pub(crate) next_version: VersionId,
    pub(crate) group: GroupState,
    pub(crate) replaying: bool,
}

impl fmt::Debug for EntryLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryLog")
            .field("len", &self.entries.len())
            .field("position", &self.position)
            .field("capacity", &self.capacity)
            .field("total_bytes", &self.total_bytes)
            .field("base_version", &self.base_version)
            .field("config", &self.config)
            .finish()
    }
}

impl Default for EntryLog {
    fn default() -> Self {
        Self::new(LogConfig::default())
    }
}

impl EntryLog {
    /// Create an empty log.
    #[must_use]
    ///
    /// The up-front reservation is fallible. When the allocator refuses it
    /// the log starts at [`FALLBACK_CAPACITY`] and grows on demand.
    pub fn new(config: LogConfig) -> Self {
        let wanted = config.initial_capacity.clamp(1, config.ceiling());
        let mut entries = VecDeque::new();
        let capacity = match entries.try_reserve_exact(wanted) {
            Ok(()) => wanted,
            Err(err) => {
                let fallback = FALLBACK_CAPACITY.min(wanted);
                tracing::warn!(
                    target: "quill.undo",
                    requested = wanted,
                    fallback,
                    error = %err,
                    "undo log reservation refused; starting small"
                );
                fallback
            }
        };
        Self {
            entries,
            position: 0,
            capacity,
            config,
            total_bytes: 0,
            base_version: BASE_VERSION,
            next_version: BASE_VERSION + 1,
            group: GroupState::new(),
            replaying: false,
        }
    }

    // ========================================================================
    // Recording
    // ========================================================================

    /// Journal an edit that has already been applied to the text.
    ///
    /// Discards the redo tail, then folds the edit into the open group, or
    /// into the tail entry when coalescing allows, or appends a new entry.
    pub fn record(
        &mut self,
        kind: EditKind,
        location: Location,
        text: &str,
        now_ms: u64,
    ) -> Result<RecordStatus, UndoError> {
        if self.replaying {
            tracing::trace!(target: "quill.undo", kind = kind.label(), "record suppressed during replay");
            return Ok(RecordStatus::Suppressed);
        }
        if kind == EditKind::Replace {
            return Err(UndoError::UnsupportedKind(kind));
        }
        if text.is_empty() {
            return Ok(RecordStatus::Empty);
        }

        self.truncate_redo();

        let edit = Edit::new(kind, location, text);
        let end = match kind {
            EditKind::Insert => edit.end(),
            _ => location,
        };
        let status = match self.group.open_group() {
            Some(group_id) => self.record_grouped(edit, group_id, now_ms),
            None => self.record_loose(edit, now_ms),
        };
        self.group.note(LastEdit {
            at_ms: now_ms,
            kind,
            end,
        });
        Ok(status)
    }

    fn record_grouped(&mut self, edit: Edit, group_id: u64, now_ms: u64) -> RecordStatus {
        let joins_tail = self
            .entries
            .back()
            .is_some_and(|tail| tail.group_id() == Some(group_id));
        if !joins_tail {
            return self.append(edit, now_ms, Some(group_id));
        }
        let version = self.bump_version();
        if let Some(tail) = self.entries.back_mut() {
            let before = tail.size_bytes();
            tail.edits.push(edit);
            tail.timestamp_ms = now_ms;
            tail.version_id = version;
            tail.is_save_point = false;
            self.total_bytes = self.total_bytes.saturating_sub(before) + tail.size_bytes();
        }
        RecordStatus::Merged
    }

    fn record_loose(&mut self, edit: Edit, now_ms: u64) -> RecordStatus {
        if edit.payload().len() > self.config.merge.max_entry_bytes {
            tracing::warn!(
                target: "quill.undo",
                bytes = edit.payload().len(),
                cap = self.config.merge.max_entry_bytes,
                "edit exceeds per-entry cap; stored as a single entry"
            );
            let status = self.append(edit, now_ms, None);
            if let Some(tail) = self.entries.back_mut() {
                tail.mergeable = false;
            }
            return match status {
                RecordStatus::Evicted => RecordStatus::Evicted,
                _ => RecordStatus::Oversized,
            };
        }

        match self.try_merge(&edit, now_ms) {
            Ok(()) => RecordStatus::Merged,
            Err(refusal) => {
                tracing::trace!(
                    target: "quill.undo",
                    reason = refusal.reason(),
                    kind = edit.kind().label(),
                    "starting new entry"
                );
                self.append(edit, now_ms, None)
            }
        }
    }

    fn try_merge(&mut self, edit: &Edit, now_ms: u64) -> Result<(), MergeRefusal> {
        if self.group.is_sealed() {
            return Err(MergeRefusal::Sealed);
        }
        let Some(tail) = self.entries.back() else {
            return Err(MergeRefusal::Sealed);
        };
        let step = coalesce::plan(
            tail,
            edit.kind(),
            edit.location(),
            edit.payload(),
            now_ms,
            &self.config.merge,
        )?;
        let version = self.bump_version();
        if let Some(tail) = self.entries.back_mut() {
            let before = tail.size_bytes();
            coalesce::splice(tail, step, edit.location(), edit.payload(), now_ms);
            tail.version_id = version;
            tail.is_save_point = false;
            self.total_bytes = self.total_bytes.saturating_sub(before) + tail.size_bytes();
        }
        Ok(())
    }

    fn append(&mut self, edit: Edit, now_ms: u64, group_id: Option<u64>) -> RecordStatus {
        let status = if self.entries.len() >= self.capacity && !self.grow() {
            self.evict_oldest();
            RecordStatus::Evicted
        } else {
            RecordStatus::Appended
        };
        let version = self.bump_version();
        let entry = UndoEntry::new(edit, now_ms, group_id, version);
        self.total_bytes += entry.size_bytes();
        self.entries.push_back(entry);
        self.position = self.entries.len();
        status
    }

    /// Double capacity up to the ceiling. Returns false when no room was made.
    fn grow(&mut self) -> bool {
        let ceiling = self.config.ceiling();
        if self.capacity >= ceiling {
            return false;
        }
        let target = self.capacity.saturating_mul(2).clamp(self.capacity + 1, ceiling);
        let additional = target - self.entries.len();
        match self.entries.try_reserve_exact(additional) {
            Ok(()) => {
                tracing::debug!(
                    target: "quill.undo",
                    from = self.capacity,
                    to = target,
                    "undo log grown"
                );
                self.capacity = target;
                true
            }
            Err(err) => {
                tracing::warn!(
                    target: "quill.undo",
                    capacity = self.capacity,
                    error = %err,
                    "undo log growth failed; evicting oldest entry"
                );
                false
            }
        }
    }

    fn evict_oldest(&mut self) {
        let Some(oldest) = self.entries.pop_front() else {
            return;
        };
        self.total_bytes = self.total_bytes.saturating_sub(oldest.size_bytes());
        self.base_version = oldest.version_id;
        self.position = self.position.saturating_sub(1);
        tracing::warn!(
            target: "quill.undo",
            version = oldest.version_id,
            capacity = self.capacity,
            "undo log full; oldest entry evicted"
        );
    }

    fn truncate_redo(&mut self) {
        if self.position >= self.entries.len() {
            return;
        }
        let dropped = self.entries.len() - self.position;
        for entry in self.entries.drain(self.position..) {
            self.total_bytes = self.total_bytes.saturating_sub(entry.size_bytes());
        }
        tracing::debug!(target: "quill.undo", dropped, "redo tail discarded");
    }

    fn bump_version(&mut self) -> VersionId {
        let version = self.next_version;
        self.next_version += 1;
        version
    }

    // ========================================================================
    // Grouping
    // ========================================================================

    /// Open an explicit group bracket; returns the new depth.
    pub fn group_begin(&mut self) -> u32 {
        let depth = self.group.begin();
        tracing::trace!(target: "quill.undo", depth, "group begin");
        depth
    }

    /// Close a group bracket. Returns false when no bracket was open.
    pub fn group_end(&mut self) -> bool {
        match self.group.end() {
            GroupEnd::Unmatched => {
                tracing::warn!(
                    target: "quill.undo",
                    position = self.position,
                    "group_end without matching group_begin"
                );
                false
            }
            GroupEnd::Nested(depth) => {
                tracing::trace!(target: "quill.undo", depth, "group end (nested)");
                true
            }
            GroupEnd::Closed(group) => {
                tracing::trace!(target: "quill.undo", group, "group closed");
                true
            }
        }
    }

    /// Close the coalescing window so the next edit starts a new entry.
    pub fn seal(&mut self) {
        self.group.seal();
    }

    /// Grouping state.
    #[must_use]
    pub fn group_state(&self) -> &GroupState {
        &self.group
    }

    // ========================================================================
    // Save points
    // ========================================================================

    /// Version of the document state at the cursor.
    #[must_use]
    pub fn current_version(&self) -> VersionId {
        match self.position {
            0 => self.base_version,
            n => self.entries[n - 1].version_id,
        }
    }

    /// Tag the state at the cursor as saved; returns its version.
    pub fn mark_saved(&mut self) -> VersionId {
        for entry in &mut self.entries {
            entry.is_save_point = false;
        }
        if let Some(entry) = self.position.checked_sub(1).and_then(|i| self.entries.get_mut(i)) {
            entry.is_save_point = true;
        }
        let version = self.current_version();
        tracing::debug!(target: "quill.undo", version, position = self.position, "save point marked");
        version
    }

    /// Version of the state before the oldest retained entry.
    #[must_use]
    pub const fn base_version(&self) -> VersionId {
        self.base_version
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cursor: entries before it are undoable.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Current capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Configuration in effect.
    #[must_use]
    pub const fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Whether an undo step is available.
    #[must_use]
    pub const fn can_undo(&self) -> bool {
        self.position > 0
    }

    /// Whether a redo step is available.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.position < self.entries.len()
    }

    /// Approximate heap used by retained entries.
    #[must_use]
    pub const fn memory_usage(&self) -> usize {
        self.total_bytes
    }

    /// Entries, oldest first.
    pub fn entries(&self) -> impl ExactSizeIterator<Item = &UndoEntry> {
        self.entries.iter()
    }

    /// Entry at `index`, oldest first.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&UndoEntry> {
        self.entries.get(index)
    }

    /// Whether an undo or redo is in progress.
    #[must_use]
    pub const fn is_replaying(&self) -> bool {
        self.replaying
    }

    /// Drop every entry. The current text becomes the new base state.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.position = 0;
        self.total_bytes = 0;
        self.base_version = self.bump_version();
        self.group.seal();
        tracing::debug!(target: "quill.undo", base = self.base_version, "undo log cleared");
    }

    /// Rebuild from persisted parts. Callers validate ordering first.
    #[cfg(feature = "state-persistence")]
    pub(crate) fn restore(
        &mut self,
        entries: Vec<UndoEntry>,
        position: usize,
        base_version: VersionId,
        next_version: VersionId,
    ) {
        let ceiling = self.config.ceiling();
        let mut entries: VecDeque<UndoEntry> = entries.into();
        let mut position = position.min(entries.len());
        let mut base_version = base_version;
        let loaded = entries.len();
        // Redo entries go first; undoable history is only trimmed once the
        // tail past the cursor is gone.
        let excess = loaded.saturating_sub(ceiling);
        let redo_dropped = excess.min(loaded - position);
        entries.truncate(loaded - redo_dropped);
        while entries.len() > ceiling && position > 0 {
            let Some(oldest) = entries.pop_front() else {
                break;
            };
            base_version = oldest.version_id;
            position -= 1;
        }
        if entries.len() < loaded {
            tracing::warn!(
                target: "quill.undo",
                loaded,
                kept = entries.len(),
                redo_dropped,
                ceiling,
                "restored history trimmed to fit"
            );
        }
        let next_group = entries.iter().filter_map(UndoEntry::group_id).max().unwrap_or(0);
        self.capacity = self.capacity.max(entries.len()).min(ceiling);
        self.total_bytes = entries.iter().map(UndoEntry::size_bytes).sum();
        self.entries = entries;
        self.position = position;
        self.base_version = base_version;
        self.next_version = next_version.max(self.next_version);
        self.group.reset_ids(next_group);
        self.group.seal();
    }
}
