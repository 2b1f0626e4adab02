//! Time abstraction.
//!
//! Order timestamps, session expiry and rate-limit windows all read the
//! clock through this trait so tests can pin time.

use chrono::{DateTime, Utc};

/// Clock trait - abstracts time operations for testability
///
/// # Examples
///
/// ```
/// use storefront_core::{Clock, SystemClock};
///
/// let clock = SystemClock;
/// assert!(clock.unix_seconds() > 0);
/// ```
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;

    /// Current time as unix seconds.
    fn unix_seconds(&self) -> i64 {
        self.now().timestamp()
    }

    /// Current time as unix milliseconds.
    fn unix_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
