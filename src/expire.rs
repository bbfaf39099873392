//! Expiry normalization.
//!
//! Callers may express a TTL three ways: an absolute point in time, a
//! relative duration, or a raw integer second count. Drivers need a single
//! integer usable directly as a backend TTL; [`Expiry::to_seconds`] is that
//! conversion, kept pure (explicit `now`) so it is trivially testable.

use std::time::{Duration, SystemTime};

/// An expiry a caller hands to `set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Use the store's configured default TTL.
    Default,
    /// Raw second count, passed through unchanged. Zero means no TTL.
    Seconds(i64),
    /// Relative duration from now.
    After(Duration),
    /// Absolute wall-clock deadline.
    At(SystemTime),
}

impl Expiry {
    /// Normalize to an integer second count relative to `now`.
    ///
    /// An absolute deadline already in the past yields a negative value;
    /// it is the caller's responsibility to special-case that if
    /// "already expired" semantics are undesired. Drivers reject negative
    /// counts the way the backend would.
    ///
    /// ```
    /// use stashq::Expiry;
    /// use std::time::{Duration, SystemTime};
    ///
    /// let now = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
    ///
    /// assert_eq!(Expiry::Seconds(90).to_seconds(0, now), 90);
    /// assert_eq!(Expiry::Default.to_seconds(600, now), 600);
    /// assert_eq!(Expiry::After(Duration::from_secs(30)).to_seconds(0, now), 30);
    /// assert_eq!(Expiry::At(now + Duration::from_secs(45)).to_seconds(0, now), 45);
    /// assert_eq!(Expiry::At(now - Duration::from_secs(10)).to_seconds(0, now), -10);
    /// ```
    pub fn to_seconds(&self, default_secs: i64, now: SystemTime) -> i64 {
        match *self {
            Expiry::Default => default_secs,
            Expiry::Seconds(secs) => secs,
            Expiry::After(duration) => duration.as_secs() as i64,
            Expiry::At(deadline) => match deadline.duration_since(now) {
                Ok(remaining) => remaining.as_secs() as i64,
                Err(e) => -(e.duration().as_secs() as i64),
            },
        }
    }
}

impl From<i64> for Expiry {
    fn from(secs: i64) -> Self {
        Expiry::Seconds(secs)
    }
}

impl From<Duration> for Expiry {
    fn from(duration: Duration) -> Self {
        Expiry::After(duration)
    }
}

impl From<SystemTime> for Expiry {
    fn from(deadline: SystemTime) -> Self {
        Expiry::At(deadline)
    }
}
