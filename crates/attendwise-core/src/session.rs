use attendwise_models::EventSession;
use chrono::{DateTime, Utc};

use crate::temporal::normalize;

/// [`select_initial_session_at`] against the current instant.
pub fn select_initial_session(sessions: &[EventSession], requested_id: Option<&str>) -> String {
    select_initial_session_at(sessions, requested_id, Utc::now())
}

/// Pick the session to display first, in priority order:
///
/// 1. no sessions: `""`;
/// 2. `requested_id`, if it names one of `sessions` exactly;
/// 3. the earliest session starting strictly after `now` (first wins ties);
/// 4. the first session.
pub fn select_initial_session_at(
    sessions: &[EventSession],
    requested_id: Option<&str>,
    now: DateTime<Utc>,
) -> String {
    let Some(first) = sessions.first() else {
        return String::new();
    };

    if let Some(requested) = requested_id {
        if sessions.iter().any(|s| s.id == requested) {
            return requested.to_string();
        }
    }

    sessions
        .iter()
        .filter_map(|s| {
            normalize(s.start_time.as_str())
                .filter(|start| *start > now)
                .map(|start| (start, s))
        })
        .min_by_key(|(start, _)| *start)
        .map_or_else(|| first.id.clone(), |(_, s)| s.id.clone())
}

pub fn find_session<'a>(sessions: &'a [EventSession], id: &str) -> Option<&'a EventSession> {
    sessions.iter().find(|s| s.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, SecondsFormat, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn starting(id: &str, offset: Duration) -> EventSession {
        let start = now() + offset;
        let end = start + Duration::hours(1);
        EventSession::new(
            id,
            start.to_rfc3339_opts(SecondsFormat::Secs, true),
            end.to_rfc3339_opts(SecondsFormat::Secs, true),
        )
    }

    #[test]
    fn no_sessions_yields_empty_sentinel() {
        assert_eq!(select_initial_session_at(&[], Some("x"), now()), "");
        assert_eq!(select_initial_session(&[], None), "");
    }

    #[test]
    fn requested_session_wins_regardless_of_time() {
        let sessions = vec![
            starting("past", Duration::hours(-5)),
            starting("soon", Duration::hours(1)),
        ];
        assert_eq!(select_initial_session_at(&sessions, Some("past"), now()), "past");
    }

    #[test]
    fn requested_match_is_exact_and_case_sensitive() {
        let sessions = vec![
            starting("late", Duration::hours(3)),
            starting("Soon", Duration::hours(1)),
        ];
        assert_eq!(select_initial_session_at(&sessions, Some("soon"), now()), "Soon");
        assert_eq!(select_initial_session_at(&sessions, Some("nope"), now()), "Soon");
    }

    #[test]
    fn earliest_upcoming_session_is_chosen() {
        let sessions = vec![
            starting("plus1", Duration::hours(1)),
            starting("plus2", Duration::hours(2)),
            starting("minus1", Duration::hours(-1)),
        ];
        assert_eq!(select_initial_session_at(&sessions, None, now()), "plus1");

        let reordered = vec![
            starting("plus2", Duration::hours(2)),
            starting("minus1", Duration::hours(-1)),
            starting("plus1", Duration::hours(1)),
        ];
        assert_eq!(select_initial_session_at(&reordered, None, now()), "plus1");
    }

    #[test]
    fn ties_go_to_the_first_in_sequence() {
        let sessions = vec![
            starting("a", Duration::hours(2)),
            starting("b", Duration::hours(1)),
            starting("c", Duration::hours(1)),
        ];
        assert_eq!(select_initial_session_at(&sessions, None, now()), "b");
    }

    #[test]
    fn all_past_or_running_falls_back_to_first() {
        let sessions = vec![
            starting("running", Duration::minutes(-30)),
            starting("earlier", Duration::hours(-3)),
            starting("now", Duration::zero()),
        ];
        assert_eq!(select_initial_session_at(&sessions, None, now()), "running");
    }

    #[test]
    fn unparseable_starts_are_never_upcoming() {
        let mut broken = starting("broken", Duration::hours(1));
        broken.start_time = "tbd".into();
        let sessions = vec![starting("past", Duration::hours(-1)), broken];
        assert_eq!(select_initial_session_at(&sessions, None, now()), "past");
    }

    #[test]
    fn selection_is_repeatable() {
        let sessions = vec![
            starting("x", Duration::hours(4)),
            starting("y", Duration::hours(2)),
        ];
        let first = select_initial_session_at(&sessions, None, now());
        let second = select_initial_session_at(&sessions, None, now());
        assert_eq!(first, second);
        assert_eq!(find_session(&sessions, &first).map(|s| s.id.as_str()), Some("y"));
    }
}
