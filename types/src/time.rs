//! Timestamp type used throughout the protocol.
//!
//! Timestamps are Unix epoch seconds (UTC), matching the `created_at` field of
//! protocol events.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A Unix timestamp in seconds since epoch (UTC).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The epoch (time zero).
    pub const EPOCH: Self = Self(0);

    pub fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// Get the current system time as a `Timestamp`.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// This timestamp shifted forward by `secs`.
    pub fn plus_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    /// This timestamp shifted backward by `secs`, clamped at the epoch.
    pub fn minus_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_sub(secs))
    }

    /// Whether this timestamp has been reached relative to `now`.
    pub fn has_passed(&self, now: Timestamp) -> bool {
        now.0 >= self.0
    }
}

/// Source of the current time, so expiration logic can be driven deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// [`Clock`] backed by the system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shifting_saturates() {
        assert_eq!(Timestamp::new(5).minus_secs(10), Timestamp::EPOCH);
        assert_eq!(Timestamp::new(u64::MAX).plus_secs(1).as_secs(), u64::MAX);
    }

    #[test]
    fn has_passed_is_inclusive() {
        let deadline = Timestamp::new(100);
        assert!(!deadline.has_passed(Timestamp::new(99)));
        assert!(deadline.has_passed(Timestamp::new(100)));
    }

    #[test]
    fn serializes_as_plain_number() {
        assert_eq!(serde_json::to_string(&Timestamp::new(42)).unwrap(), "42");
    }
}
