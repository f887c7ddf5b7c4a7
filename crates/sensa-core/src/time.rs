//! Absolute timestamps in milliseconds since the Unix epoch.
//!
//! Token expiry is persisted as a decimal string in a key-value store, so the
//! representation is kept as a plain integer rather than a `DateTime`.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Milliseconds since 1970-01-01T00:00:00Z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpochMillis(i64);

impl EpochMillis {
    /// Wraps a raw millisecond value.
    pub const fn new(millis: i64) -> Self {
        Self(millis)
    }

    /// The current wall-clock time.
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    /// `ttl` from now.
    pub fn from_now(ttl: Duration) -> Self {
        Self::now().saturating_add(ttl)
    }

    /// Adds a duration, saturating at `i64::MAX`.
    pub fn saturating_add(self, duration: Duration) -> Self {
        let millis = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
        Self(self.0.saturating_add(millis))
    }

    /// Subtracts a duration, saturating at `i64::MIN`.
    pub fn saturating_sub(self, duration: Duration) -> Self {
        let millis = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
        Self(self.0.saturating_sub(millis))
    }

    /// Returns the raw millisecond value.
    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// True once `now` has reached or passed this instant.
    pub fn is_reached(self, now: EpochMillis) -> bool {
        now >= self
    }

    /// Time left until this instant, or `None` if it has passed.
    pub fn remaining(self, now: EpochMillis) -> Option<Duration> {
        u64::try_from(self.0.saturating_sub(now.0))
            .ok()
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// Converts to a UTC datetime, if representable.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.0)
    }
}

impl fmt::Display for EpochMillis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
            None => write!(f, "{}ms", self.0),
        }
    }
}

impl FromStr for EpochMillis {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_now_is_in_the_future() {
        let before = EpochMillis::now();
        let expiry = EpochMillis::from_now(Duration::from_secs(3600));
        let delta = expiry.as_millis() - before.as_millis();
        assert!((3_600_000..3_601_000).contains(&delta));
    }

    #[test]
    fn reached_is_inclusive() {
        let t = EpochMillis::new(1_000);
        assert!(!t.is_reached(EpochMillis::new(999)));
        assert!(t.is_reached(EpochMillis::new(1_000)));
        assert!(t.is_reached(EpochMillis::new(1_001)));
    }

    #[test]
    fn remaining_time() {
        let t = EpochMillis::new(10_000);
        assert_eq!(
            t.remaining(EpochMillis::new(4_000)),
            Some(Duration::from_secs(6))
        );
        assert_eq!(t.remaining(EpochMillis::new(10_000)), None);
        assert_eq!(t.remaining(EpochMillis::new(20_000)), None);
    }

    #[test]
    fn parses_stored_decimal() {
        assert_eq!(
            "1700000000000".parse::<EpochMillis>().unwrap(),
            EpochMillis::new(1_700_000_000_000)
        );
        assert_eq!(" 42 ".parse::<EpochMillis>().unwrap(), EpochMillis::new(42));
        assert!("soon".parse::<EpochMillis>().is_err());
    }

    #[test]
    fn displays_as_rfc3339() {
        let t = EpochMillis::new(0);
        assert_eq!(t.to_string(), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn serializes_as_plain_integer() {
        let json = serde_json::to_string(&EpochMillis::new(1234)).unwrap();
        assert_eq!(json, "1234");
    }

    #[test]
    fn saturating_arithmetic() {
        let max = EpochMillis::new(i64::MAX);
        assert_eq!(max.saturating_add(Duration::from_secs(1)), max);
        let t = EpochMillis::new(5_000);
        assert_eq!(
            t.saturating_sub(Duration::from_secs(2)),
            EpochMillis::new(3_000)
        );
    }
}
