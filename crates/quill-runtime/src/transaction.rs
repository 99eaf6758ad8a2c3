#![forbid(unsafe_code)]

//! Display-publish brackets around compound edits.
//!
//! A compound command (paste, indent region, undo of a group) makes many
//! mutations that should reach the screen as one frame. It opens a bracket
//! with [`EditDepth::begin`] and closes it with [`EditDepth::commit`]; the
//! outermost commit publishes by marking the screen dirty and forcing a
//! redraw. [`EditDepth::abort`] drops every open bracket and redraws
//! unconditionally.
//!
//! The depth is an atomic shared through [`DepthProbe`] so a signal-driven
//! resize check can ask "is an edit in progress?" without locks.
//!
//! This bracket is independent of undo grouping: it never affects how
//! edits are journaled.
//!
//! # Invariants
//!
//! 1. The depth never goes below zero; an unmatched commit saturates.
//! 2. Exactly one publish happens per outermost commit or abort.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Receiver of publish requests.
pub trait Publisher {
    /// Mark the whole screen as needing repaint.
    fn mark_dirty(&mut self);
    /// Repaint; `force` bypasses any deferral.
    fn redraw(&mut self, force: bool);
}

/// Headless publisher that counts what it was asked to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScreenFlags {
    /// Set by `mark_dirty`, cleared by a redraw.
    pub dirty: bool,
    /// Number of redraws requested.
    pub redraws: u64,
    /// Number of those that were forced.
    pub forced: u64,
}

impl Publisher for ScreenFlags {
    fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    fn redraw(&mut self, force: bool) {
        self.redraws += 1;
        if force {
            self.forced += 1;
        }
        self.dirty = false;
    }
}

/// Shared transaction depth counter.
#[derive(Debug, Clone, Default)]
pub struct EditDepth {
    depth: Arc<AtomicUsize>,
}

impl EditDepth {
    /// Closed counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current depth.
    #[must_use]
    pub fn get(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }

    /// Read-only handle for other contexts.
    #[must_use]
    pub fn probe(&self) -> DepthProbe {
        DepthProbe {
            depth: Arc::clone(&self.depth),
        }
    }

    /// Open a bracket; returns the new depth.
    pub fn begin(&self) -> usize {
        let depth = self.depth.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::trace!(target: "quill.transaction", depth, "edit begin");
        depth
    }

    /// Close a bracket. Publishes and returns true when it was the last one.
    pub fn commit(&self, publisher: &mut dyn Publisher) -> bool {
        let previous = match self
            .depth
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |d| {
                Some(d.saturating_sub(1))
            }) {
            Ok(d) | Err(d) => d,
        };
        if previous == 0 {
            tracing::warn!(target: "quill.transaction", previous, "edit_commit without matching edit_begin");
        }
        if previous > 1 {
            tracing::trace!(target: "quill.transaction", depth = previous - 1, "edit commit (nested)");
            return false;
        }
        tracing::debug!(target: "quill.transaction", previous, "edit commit; publishing");
        publish(publisher);
        true
    }

    /// Drop every open bracket and force a redraw.
    pub fn abort(&self, publisher: &mut dyn Publisher) {
        let previous = self.depth.swap(0, Ordering::AcqRel);
        tracing::debug!(target: "quill.transaction", previous, "edit abort; publishing");
        publish(publisher);
    }
}

fn publish(publisher: &mut dyn Publisher) {
    publisher.mark_dirty();
    publisher.redraw(true);
}

/// Read-only view of an [`EditDepth`]. Safe to poll from any thread.
#[derive(Debug, Clone)]
pub struct DepthProbe {
    depth: Arc<AtomicUsize>,
}

impl DepthProbe {
    /// Current depth.
    #[must_use]
    pub fn get(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }

    /// Whether any bracket is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.get() > 0
    }
}

/// RAII bracket: begins on creation, commits on drop unless finished.
pub struct EditScope<'p> {
    depth: EditDepth,
    publisher: &'p mut dyn Publisher,
    finished: bool,
}

impl<'p> EditScope<'p> {
    /// Open a bracket on `depth`.
    pub fn new(depth: &EditDepth, publisher: &'p mut dyn Publisher) -> Self {
        depth.begin();
        Self {
            depth: depth.clone(),
            publisher,
            finished: false,
        }
    }

    /// Close the bracket now; see [`EditDepth::commit`].
    pub fn commit(mut self) -> bool {
        self.finished = true;
        self.depth.commit(&mut *self.publisher)
    }

    /// Abort every open bracket now; see [`EditDepth::abort`].
    pub fn abort(mut self) {
        self.finished = true;
        self.depth.abort(&mut *self.publisher);
    }
}

impl Drop for EditScope<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.depth.commit(&mut *self.publisher);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_bracket_publishes_once() {
        let depth = EditDepth::new();
        let mut screen = ScreenFlags::default();
        depth.begin();
        assert!(depth.commit(&mut screen));
        assert_eq!(screen.redraws, 1);
        assert_eq!(screen.forced, 1);
        assert_eq!(depth.get(), 0);
    }

    #[test]
    fn nested_brackets_publish_on_outermost_commit() {
        let depth = EditDepth::new();
        let mut screen = ScreenFlags::default();
        depth.begin();
        depth.begin();
        assert!(!depth.commit(&mut screen));
        assert_eq!(screen.redraws, 0);
        assert!(depth.commit(&mut screen));
        assert_eq!(screen.redraws, 1);
    }

    #[test]
    fn unmatched_commit_saturates_and_publishes() {
        let depth = EditDepth::new();
        let mut screen = ScreenFlags::default();
        assert!(depth.commit(&mut screen));
        assert_eq!(depth.get(), 0);
        assert_eq!(screen.redraws, 1);
    }

    #[test]
    fn abort_resets_depth() {
        let depth = EditDepth::new();
        let mut screen = ScreenFlags::default();
        depth.begin();
        depth.begin();
        depth.begin();
        depth.abort(&mut screen);
        assert_eq!(depth.get(), 0);
        assert_eq!(screen.forced, 1);
    }

    #[test]
    fn probe_sees_depth() {
        let depth = EditDepth::new();
        let probe = depth.probe();
        assert!(!probe.is_open());
        depth.begin();
        assert!(probe.is_open());
        assert_eq!(probe.get(), 1);
    }

    #[test]
    fn scope_commits_on_drop() {
        let depth = EditDepth::new();
        let mut screen = ScreenFlags::default();
        {
            let _scope = EditScope::new(&depth, &mut screen);
            assert_eq!(depth.get(), 1);
        }
        assert_eq!(depth.get(), 0);
        assert_eq!(screen.redraws, 1);
    }

    #[test]
    fn explicit_scope_commit_does_not_double_publish() {
        let depth = EditDepth::new();
        let mut screen = ScreenFlags::default();
        let scope = EditScope::new(&depth, &mut screen);
        assert!(scope.commit());
        assert_eq!(screen.redraws, 1);
    }
}
