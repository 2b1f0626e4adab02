//! Deterministic time.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use storefront_core::Clock;

/// Fixed clock for deterministic tests
///
/// Returns the same time until advanced, making tests reproducible.
///
/// # Example
///
/// ```
/// use storefront_testing::FixedClock;
/// use storefront_core::Clock;
///
/// let clock = FixedClock::at_unix(100);
/// let time1 = clock.now();
/// let time2 = clock.now();
/// assert_eq!(time1, time2); // Always the same!
/// ```
#[derive(Debug)]
pub struct FixedClock {
    millis: AtomicI64,
}

impl FixedClock {
    /// Create a new fixed clock with the given time
    #[must_use]
    pub fn new(time: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(time.timestamp_millis()),
        }
    }

    /// Clock pinned at `secs` unix seconds.
    #[must_use]
    pub const fn at_unix(secs: i64) -> Self {
        Self {
            millis: AtomicI64::new(secs * 1000),
        }
    }

    /// Move time forward.
    pub fn advance_secs(&self, secs: i64) {
        self.millis.fetch_add(secs * 1000, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

/// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
#[must_use]
pub const fn test_clock() -> FixedClock {
    FixedClock::at_unix(1_735_689_600)
}
