use attendwise_models::{Event, EventSession, EventStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::temporal::normalize;

/// The start/end pair every time-dependent decision is made against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    /// The selected session's times, falling back per field to the event's
    /// own times where the session carries none.
    pub fn relevant(event: &Event, session: Option<&EventSession>) -> Self {
        let start = session
            .map(|s| s.start_time.as_str())
            .filter(|raw| !raw.is_empty())
            .or(event.start_time.as_deref());
        let end = session
            .map(|s| s.end_time.as_str())
            .filter(|raw| !raw.is_empty())
            .or(event.end_time.as_deref());
        Self::new(normalize(start), normalize(end))
    }

    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.start.is_some_and(|start| now < start)
    }

    pub fn has_finished(&self, now: DateTime<Utc>) -> bool {
        self.end.is_some_and(|end| end < now)
    }

    /// Strictly inside the window; an unknown bound is never "inside".
    pub fn is_ongoing(&self, now: DateTime<Utc>) -> bool {
        match (self.start, self.end) {
            (Some(start), Some(end)) => start < now && now < end,
            _ => false,
        }
    }
}

/// Whether the event as a whole is over: marked past or cancelled, or every
/// one of its sessions has a known end before `now`.
pub fn event_finished(event: &Event, now: DateTime<Utc>) -> bool {
    if matches!(event.status, EventStatus::Past | EventStatus::Cancelled) {
        return true;
    }
    !event.sessions.is_empty()
        && event
            .sessions
            .iter()
            .all(|s| normalize(s.end_time.as_str()).is_some_and(|end| end < now))
}
