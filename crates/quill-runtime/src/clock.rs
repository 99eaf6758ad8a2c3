#![forbid(unsafe_code)]

//! Millisecond time sources for edit timestamps.
//!
//! Coalescing compares entry timestamps against a window, so the journal
//! only ever asks for "milliseconds since some fixed origin". Production
//! buffers use [`MonotonicClock`]; tests drive [`ManualClock`] by hand so
//! window boundaries are exact.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use web_time::Instant;

/// A source of monotonic millisecond timestamps.
pub trait Clock: Send + Sync {
    /// Milliseconds elapsed since this clock's origin.
    fn now_ms(&self) -> u64;
}

/// Wall-independent clock backed by [`web_time::Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Start a clock whose origin is now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Hand-driven clock. Clones share the same reading.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualClock")
            .field("now_ms", &self.now_ms())
            .finish()
    }
}

impl ManualClock {
    /// Clock reading zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock reading `ms`.
    #[must_use]
    pub fn at(ms: u64) -> Self {
        let clock = Self::new();
        clock.set(ms);
        clock
    }

    /// Move the reading forward by `ms`.
    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::Relaxed);
    }

    /// Jump to an absolute reading.
    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_reading() {
        let clock = ManualClock::at(10);
        let other = clock.clone();
        clock.advance(390);
        assert_eq!(other.now_ms(), 400);
        other.set(5);
        assert_eq!(clock.now_ms(), 5);
    }

    #[test]
    fn monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }
}
