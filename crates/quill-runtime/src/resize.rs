#![forbid(unsafe_code)]

//! Deferred terminal-resize handling.
//!
//! The window-change signal only raises a flag. The main loop calls
//! [`ResizeGate::take`] between commands; while an edit transaction is open
//! the flag stays raised, so the screen is never re-laid-out halfway
//! through a compound edit.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::transaction::DepthProbe;

/// Pending-resize flag shared with a signal handler.
#[derive(Debug, Clone, Default)]
pub struct ResizeGate {
    pending: Arc<AtomicBool>,
}

impl ResizeGate {
    /// Gate with no pending resize.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag on every `SIGWINCH`.
    ///
    /// The handler only stores to an atomic. Unregister with
    /// `signal_hook::low_level::unregister` if the gate outlives its use.
    #[cfg(unix)]
    pub fn install(&self) -> std::io::Result<signal_hook::SigId> {
        let id = signal_hook::flag::register(
            signal_hook::consts::SIGWINCH,
            Arc::clone(&self.pending),
        )?;
        tracing::debug!(target: "quill.resize", signal = "SIGWINCH", "resize handler installed");
        Ok(id)
    }

    /// Raise the flag by hand (non-unix hosts, tests).
    pub fn notify(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// Whether a resize is waiting.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Consume a pending resize unless an edit transaction is open.
    ///
    /// Returns true when the caller should re-query the window size and
    /// re-layout now.
    pub fn take(&self, depth: &DepthProbe) -> bool {
        if !self.is_pending() {
            return false;
        }
        if depth.is_open() {
            tracing::trace!(target: "quill.resize", depth = depth.get(), "resize deferred");
            return false;
        }
        let taken = self.pending.swap(false, Ordering::AcqRel);
        if taken {
            tracing::trace!(target: "quill.resize", "resize applied");
        }
        taken
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{EditDepth, ScreenFlags};

    #[test]
    fn nothing_pending_takes_nothing() {
        let gate = ResizeGate::new();
        assert!(!gate.take(&EditDepth::new().probe()));
    }

    #[test]
    fn resize_waits_for_transaction_to_close() {
        let gate = ResizeGate::new();
        let depth = EditDepth::new();
        let mut screen = ScreenFlags::default();

        depth.begin();
        gate.notify();
        assert!(!gate.take(&depth.probe()));
        assert!(gate.is_pending());

        depth.commit(&mut screen);
        assert!(gate.take(&depth.probe()));
        assert!(!gate.is_pending());
        assert!(!gate.take(&depth.probe()));
    }

    #[cfg(unix)]
    #[test]
    fn sigwinch_raises_flag() {
        let gate = ResizeGate::new();
        let id = gate.install().unwrap();
        signal_hook::low_level::raise(signal_hook::consts::SIGWINCH).unwrap();
        assert!(gate.is_pending());
        assert!(signal_hook::low_level::unregister(id));
    }
}
