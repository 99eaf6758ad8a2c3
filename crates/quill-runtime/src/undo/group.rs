#![forbid(unsafe_code)]

//! Explicit undo groups and the coalescing window.
//!
//! `begin`/`end` brackets nest; only the outermost bracket allocates a
//! [`GroupId`], and every edit recorded while any bracket is open joins
//! that group's single entry. Closing the outermost bracket, undo and redo
//! all seal the window so the next edit starts a fresh entry.

use quill_text::Location;

use super::entry::{EditKind, GroupId};

/// The most recent edit folded into the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastEdit {
    /// Clock reading when it was recorded.
    pub at_ms: u64,
    /// Its kind.
    pub kind: EditKind,
    /// Where the cursor sits after it.
    pub end: Location,
}

/// Outcome of closing a bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupEnd {
    /// An inner bracket closed; the group stays open at this depth.
    Nested(u32),
    /// The outermost bracket closed.
    Closed(GroupId),
    /// No bracket was open.
    Unmatched,
}

/// Per-buffer grouping state.
#[derive(Debug, Clone, Default)]
pub struct GroupState {
    open_depth: u32,
    open_group: Option<GroupId>,
    next_group: GroupId,
    last_edit: Option<LastEdit>,
}

impl GroupState {
    /// No open bracket, sealed window.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a bracket; returns the new depth.
    pub fn begin(&mut self) -> u32 {
        if self.open_depth == 0 {
            self.next_group += 1;
            self.open_group = Some(self.next_group);
            self.last_edit = None;
        }
        self.open_depth = self.open_depth.saturating_add(1);
        self.open_depth
    }

    /// Close a bracket. Closing with none open is a no-op.
    pub fn end(&mut self) -> GroupEnd {
        match self.open_depth {
            0 => GroupEnd::Unmatched,
            1 => {
                self.open_depth = 0;
                self.last_edit = None;
                match self.open_group.take() {
                    Some(id) => GroupEnd::Closed(id),
                    None => GroupEnd::Unmatched,
                }
            }
            depth => {
                self.open_depth = depth - 1;
                GroupEnd::Nested(self.open_depth)
            }
        }
    }

    /// Current bracket depth.
    #[must_use]
    pub const fn depth(&self) -> u32 {
        self.open_depth
    }

    /// Group edits currently join, if a bracket is open.
    #[must_use]
    pub const fn open_group(&self) -> Option<GroupId> {
        self.open_group
    }

    /// Most recent edit, or `None` when the window is sealed.
    #[must_use]
    pub const fn last_edit(&self) -> Option<LastEdit> {
        self.last_edit
    }

    /// Whether the next edit is barred from heuristic coalescing.
    #[must_use]
    pub const fn is_sealed(&self) -> bool {
        self.last_edit.is_none()
    }

    /// Close the coalescing window.
    pub fn seal(&mut self) {
        self.last_edit = None;
    }

    pub(crate) fn note(&mut self, edit: LastEdit) {
        self.last_edit = Some(edit);
    }

    #[cfg(feature = "state-persistence")]
    pub(crate) fn reset_ids(&mut self, next_group: GroupId) {
        self.next_group = self.next_group.max(next_group);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outermost_bracket_allocates_group() {
        let mut g = GroupState::new();
        assert_eq!(g.begin(), 1);
        let id = g.open_group().unwrap();
        assert_eq!(g.begin(), 2);
        assert_eq!(g.open_group(), Some(id));
        assert_eq!(g.end(), GroupEnd::Nested(1));
        assert_eq!(g.open_group(), Some(id));
        assert_eq!(g.end(), GroupEnd::Closed(id));
        assert_eq!(g.open_group(), None);
    }

    #[test]
    fn successive_groups_get_fresh_ids() {
        let mut g = GroupState::new();
        g.begin();
        let first = g.open_group().unwrap();
        g.end();
        g.begin();
        assert_ne!(g.open_group(), Some(first));
    }

    #[test]
    fn unmatched_end_is_noop() {
        let mut g = GroupState::new();
        assert_eq!(g.end(), GroupEnd::Unmatched);
        assert_eq!(g.depth(), 0);
        assert_eq!(g.begin(), 1);
    }

    #[test]
    fn closing_group_seals_window() {
        let mut g = GroupState::new();
        g.begin();
        g.note(LastEdit {
            at_ms: 0,
            kind: EditKind::Insert,
            end: Location::new(0, 1),
        });
        assert!(!g.is_sealed());
        g.end();
        assert!(g.is_sealed());
    }
}
