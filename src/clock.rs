//! Injectable monotonic clock for deterministic restart-budget accounting.
//!
//! Restart bookkeeping needs a monotonic clock, and tests need to drive
//! it forward explicitly. [`SystemClock`] wraps the real OS clock;
//! [`ManualClock`] is a test-only clock advanced by hand.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;

/// A strictly monotonic, equality-comparable source of time for restart
/// budget accounting.
///
/// Implementations must never go backwards. Timestamps are expressed as
/// `chrono::DateTime<Utc>` (the runtime's mandatory timestamp type) even
/// though only relative ordering matters for restart budgets.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Real wall-clock time via `chrono::Utc::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock whose value is advanced explicitly by the test driving it,
/// making restart-budget windows deterministic in unit tests.
///
/// # Example
/// ```rust
/// use haven_rt::clock::{Clock, ManualClock};
/// use chrono::Duration;
///
/// let clock = ManualClock::new();
/// let t0 = clock.now();
/// clock.advance(Duration::seconds(30));
/// assert!(clock.now() > t0);
/// ```
#[derive(Debug, Clone)]
pub struct ManualClock {
    inner: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Utc::now())),
        }
    }

    pub fn at(start: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: ChronoDuration) {
        let mut guard = self.inner.lock();
        *guard += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.inner.lock() = to;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.inner.lock()
    }
}

/// Shared handle to whichever [`Clock`] a system was configured with.
pub type SharedClock = Arc<dyn Clock>;

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn manual_clock_advances_deterministically() {
        let clock = ManualClock::new();
        let t0 = clock.now();
        clock.advance(ChronoDuration::seconds(10));
        assert_eq!(clock.now(), t0 + ChronoDuration::seconds(10));
    }

    #[test]
    fn manual_clock_can_be_set() {
        let clock = ManualClock::new();
        let target = Utc::now() + ChronoDuration::days(1);
        clock.set(target);
        assert_eq!(clock.now(), target);
    }
}
