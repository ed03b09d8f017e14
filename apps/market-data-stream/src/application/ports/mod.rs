//! Port Interfaces
//!
//! Defines the interfaces (ports) the stream client depends on, following
//! the Hexagonal Architecture pattern.
//!
//! ## Driven Ports (Outbound)
//!
//! - `Clock`: Source of wall-clock timestamps for outbound messages and
//!   heartbeat bookkeeping

use chrono::{DateTime, Utc};

/// Wall-clock time source.
///
/// Outbound messages carry epoch-millisecond timestamps taken from the
/// clock, so tests can pin them.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

/// Clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Convert a clock reading to a UTC timestamp.
#[must_use]
pub fn to_datetime(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}
