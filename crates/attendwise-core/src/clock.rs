use chrono::{DateTime, Utc};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of "now" for a single decision. Callers read it once per decision.
pub trait Clock: Send + Sync {
    /// `None` when the current instant cannot be determined.
    fn now(&self) -> Option<DateTime<Utc>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Option<DateTime<Utc>> {
        let since_epoch = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
        let secs = i64::try_from(since_epoch.as_secs()).ok()?;
        DateTime::from_timestamp(secs, since_epoch.subsec_nanos())
    }
}

/// A clock pinned to one instant (or to a failed read).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub Option<DateTime<Utc>>);

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self(Some(now))
    }

    pub fn broken() -> Self {
        Self(None)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Option<DateTime<Utc>> {
        self.0
    }
}
