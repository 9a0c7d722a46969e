use std::collections::HashSet;

use attendwise_models::{Event, EventSession};
use chrono::{DateTime, Duration, SubsecRound, TimeDelta, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::CoreError;
use crate::recurrence;
use crate::temporal::normalize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedSession {
    pub id: Uuid,
    pub event_id: String,
    pub session_number: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl PlannedSession {
    pub fn into_session(self, timezone: &str) -> EventSession {
        EventSession {
            id: self.id.to_string(),
            event_id: self.event_id,
            session_number: self.session_number,
            start_time: self.start.to_rfc3339(),
            end_time: self.end.to_rfc3339(),
            timezone: timezone.to_string(),
            location_override: None,
            is_cancelled: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlanRequest<'a> {
    pub event_id: &'a str,
    pub rule: &'a str,
    pub event_start: DateTime<Utc>,
    pub event_end: DateTime<Utc>,
    /// Starts that already have a session, cancelled ones included.
    pub existing_starts: HashSet<DateTime<Utc>>,
    pub max_session_number: u32,
    pub now: DateTime<Utc>,
    pub window: Duration,
    pub limit: usize,
}

/// Sessions for every occurrence in `[now, now + window]` that has no
/// session yet, each lasting as long as the event itself.
pub fn plan_sessions(request: &PlanRequest<'_>) -> Result<Vec<PlannedSession>, CoreError> {
    let options = recurrence::parse(request.rule);
    if !options.is_recurring() {
        return Ok(Vec::new());
    }

    let duration = request.event_end - request.event_start;
    let to = request
        .now
        .checked_add_signed(request.window)
        .ok_or_else(|| {
            CoreError::OutOfRange(format!("{} plus {}", request.now, request.window))
        })?;
    let occurrences = recurrence::expand(
        &options,
        request.event_start,
        request.now,
        to,
        request.limit,
    );

    let mut next_number = request.max_session_number;
    let planned = occurrences
        .into_iter()
        .map(|at| at.trunc_subsecs(0))
        .filter(|start| !request.existing_starts.contains(start))
        .map(|start| {
            let end = start.checked_add_signed(duration).ok_or_else(|| {
                CoreError::OutOfRange(format!("session at {start} lasting {duration}"))
            })?;
            next_number = next_number.saturating_add(1);
            Ok(PlannedSession {
                id: Uuid::new_v4(),
                event_id: request.event_id.to_string(),
                session_number: next_number,
                start,
                end,
            })
        })
        .collect::<Result<Vec<_>, CoreError>>()?;

    tracing::info!(
        event_id = request.event_id,
        planned = planned.len(),
        until = %to,
        "planned recurring sessions"
    );
    Ok(planned)
}

/// Plan from a decoded event, treating its current sessions as existing.
pub fn plan_for_event(
    event: &Event,
    now: DateTime<Utc>,
    window_days: u32,
    limit: usize,
) -> Result<Vec<PlannedSession>, CoreError> {
    let (Some(event_start), Some(event_end)) = (
        normalize(event.start_time.as_deref()),
        normalize(event.end_time.as_deref()),
    ) else {
        return Err(CoreError::IncompleteEvent(event.id.clone()));
    };
    if !event.is_recurring {
        return Ok(Vec::new());
    }

    let existing_starts = event
        .sessions
        .iter()
        .filter_map(|s| normalize(s.start_time.as_str()))
        .map(|at| at.trunc_subsecs(0))
        .collect();
    let max_session_number = event
        .sessions
        .iter()
        .map(|s| s.session_number)
        .max()
        .unwrap_or(0);

    let window = TimeDelta::try_days(i64::from(window_days)).ok_or_else(|| {
        CoreError::OutOfRange(format!("a window of {window_days} days"))
    })?;
    plan_sessions(&PlanRequest {
        event_id: &event.id,
        rule: event.rule_string(),
        event_start,
        event_end,
        existing_starts,
        max_session_number,
        now,
        window,
        limit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, d, h, 0, 0).unwrap()
    }

    fn request(rule: &str) -> PlanRequest<'_> {
        PlanRequest {
            event_id: "evt-1",
            rule,
            event_start: at(3, 9),
            event_end: at(3, 11),
            existing_starts: HashSet::new(),
            max_session_number: 0,
            now: at(1, 0),
            window: Duration::days(30),
            limit: 1000,
        }
    }

    #[test]
    fn sessions_follow_the_rule_within_the_window() {
        let planned = plan_sessions(&request("FREQ=WEEKLY;BYDAY=MO")).unwrap();
        let starts: Vec<_> = planned.iter().map(|p| p.start).collect();
        assert_eq!(starts, vec![at(3, 9), at(10, 9), at(17, 9), at(24, 9)]);
        assert!(planned.iter().all(|p| p.end - p.start == Duration::hours(2)));
        assert_eq!(
            planned.iter().map(|p| p.session_number).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
        let ids: HashSet<_> = planned.iter().map(|p| p.id).collect();
        assert_eq!(ids.len(), planned.len());
    }

    #[test]
    fn existing_starts_are_skipped_and_numbering_continues() {
        let mut req = request("RRULE:FREQ=DAILY;COUNT=4");
        req.existing_starts = [at(3, 9), at(4, 9)].into_iter().collect();
        req.max_session_number = 7;

        let planned = plan_sessions(&req).unwrap();
        assert_eq!(
            planned.iter().map(|p| (p.start, p.session_number)).collect::<Vec<_>>(),
            vec![(at(5, 9), 8), (at(6, 9), 9)]
        );
    }

    #[test]
    fn empty_or_malformed_rules_plan_nothing() {
        assert!(plan_sessions(&request("")).unwrap().is_empty());
        assert!(plan_sessions(&request("FREQ=SOMETIMES")).unwrap().is_empty());
    }

    #[test]
    fn plan_for_event_uses_current_sessions() {
        let event: Event = serde_json::from_value(json!({
            "id": "evt-1",
            "created_by": "usr-host",
            "status": "published",
            "timezone": "Asia/Jakarta",
            "start_time": {"Time": "2025-03-03T09:00:00Z", "Valid": true},
            "end_time": {"Time": "2025-03-03T10:30:00Z", "Valid": true},
            "is_recurring": true,
            "recurrence_rule": {"rrule": "FREQ=WEEKLY;BYDAY=MO;COUNT=3"},
            "sessions": [{
                "id": "ses-1",
                "session_number": 1,
                "start_time": "2025-03-03T09:00:00Z",
                "end_time": "2025-03-03T10:30:00Z"
            }]
        }))
        .unwrap();

        let planned = plan_for_event(&event, at(1, 0), 30, 100).unwrap();
        assert_eq!(planned.len(), 2);
        assert_eq!(planned[0].start, at(10, 9));
        assert_eq!(planned[0].session_number, 2);

        let session = planned[1].clone().into_session(&event.timezone);
        assert_eq!(session.event_id, "evt-1");
        assert_eq!(session.session_number, 3);
        assert_eq!(session.start_time, "2025-03-17T09:00:00+00:00");
        assert_eq!(session.end_time, "2025-03-17T10:30:00+00:00");
        assert_eq!(normalize(session.start_time.as_str()), Some(at(17, 9)));
    }

    #[test]
    fn events_without_times_cannot_be_planned() {
        let event: Event = serde_json::from_value(json!({
            "id": "evt-2",
            "created_by": "usr-host",
            "status": "draft",
            "is_recurring": true,
            "recurrence_rule": {"rrule": "FREQ=DAILY"}
        }))
        .unwrap();
        let err = plan_for_event(&event, at(1, 0), 30, 100).unwrap_err();
        assert_eq!(err.error_code(), "INCOMPLETE_EVENT");
    }

    #[test]
    fn windows_past_the_calendar_are_rejected() {
        let event: Event = serde_json::from_value(json!({
            "id": "evt-3",
            "created_by": "usr-host",
            "status": "published",
            "start_time": {"Time": "2025-03-03T09:00:00Z", "Valid": true},
            "end_time": {"Time": "2025-03-03T10:00:00Z", "Valid": true},
            "is_recurring": true,
            "recurrence_rule": {"rrule": "FREQ=DAILY"}
        }))
        .unwrap();
        let err = plan_for_event(&event, at(1, 0), u32::MAX, 10).unwrap_err();
        assert_eq!(err.error_code(), "OUT_OF_RANGE");

        let mut req = request("FREQ=DAILY");
        req.now = DateTime::<Utc>::MAX_UTC - Duration::days(1);
        req.window = Duration::days(2);
        assert!(plan_sessions(&req).is_err());
    }

    #[test]
    fn sessions_ending_past_the_calendar_are_rejected() {
        let mut req = request("FREQ=DAILY");
        req.event_start = DateTime::<Utc>::MAX_UTC - Duration::days(3);
        req.event_end = DateTime::<Utc>::MAX_UTC - Duration::days(1);
        req.now = req.event_start;
        req.window = Duration::days(3);
        let err = plan_sessions(&req).unwrap_err();
        assert_eq!(err.error_code(), "OUT_OF_RANGE");
    }
}
