use serde::{Deserialize, Serialize};

use crate::nullable;
use crate::session::EventSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Draft,
    Published,
    Ongoing,
    Upcoming,
    Past,
    Cancelled,
}

/// The `recurrence_rule` column: `{"rrule": "FREQ=WEEKLY;..."}` or `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRulePayload {
    #[serde(default)]
    pub rrule: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(default)]
    pub community_id: String,
    pub created_by: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "nullable::string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "nullable::string")]
    pub location_address: Option<String>,
    /// IANA zone identifier, carried through for display only.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    pub status: EventStatus,
    #[serde(default, deserialize_with = "nullable::time")]
    pub start_time: Option<String>,
    #[serde(default, deserialize_with = "nullable::time")]
    pub end_time: Option<String>,
    #[serde(default, deserialize_with = "nullable::time")]
    pub registration_closes_at: Option<String>,
    #[serde(default, deserialize_with = "nullable::count")]
    pub max_attendees: Option<u32>,
    #[serde(default)]
    pub current_attendees: u32,
    #[serde(default)]
    pub face_verification_required: bool,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default, deserialize_with = "nullable::float")]
    pub fee: Option<f64>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurrence_rule: Option<RecurrenceRulePayload>,
    #[serde(default)]
    pub sessions: Vec<EventSession>,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Event {
    /// The persisted rule string, or `""` when the event does not recur.
    pub fn rule_string(&self) -> &str {
        self.recurrence_rule
            .as_ref()
            .map(|payload| payload.rrule.as_str())
            .unwrap_or("")
    }

    pub fn session(&self, id: &str) -> Option<&EventSession> {
        self.sessions.iter().find(|s| s.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIRE: &str = r#"{
        "id": "evt-1",
        "community_id": "com-1",
        "created_by": "usr-host",
        "name": "Rust Meetup",
        "description": {"String": "Monthly talks", "Valid": true},
        "location_address": {"String": "", "Valid": false},
        "timezone": "Asia/Ho_Chi_Minh",
        "status": "published",
        "start_time": {"Time": "2025-03-01T18:00:00Z", "Valid": true},
        "end_time": {"Time": "2025-03-01T21:00:00Z", "Valid": true},
        "registration_closes_at": {"Time": "0001-01-01T00:00:00Z", "Valid": false},
        "max_attendees": {"Int32": 40, "Valid": true},
        "current_attendees": 12,
        "face_verification_required": true,
        "is_paid": true,
        "fee": {"Float64": 5.5, "Valid": true},
        "is_recurring": true,
        "recurrence_rule": {"rrule": "FREQ=WEEKLY;INTERVAL=1;BYDAY=SA"},
        "sessions": [
            {
                "id": "ses-1",
                "event_id": "evt-1",
                "session_number": 1,
                "start_time": "2025-03-01T18:00:00Z",
                "end_time": "2025-03-01T21:00:00Z",
                "timezone": "Asia/Ho_Chi_Minh",
                "is_cancelled": false
            }
        ]
    }"#;

    #[test]
    fn decodes_backend_event_record() {
        let event: Event = serde_json::from_str(WIRE).unwrap();
        assert_eq!(event.status, EventStatus::Published);
        assert_eq!(event.start_time.as_deref(), Some("2025-03-01T18:00:00Z"));
        assert!(event.registration_closes_at.is_none());
        assert_eq!(event.max_attendees, Some(40));
        assert_eq!(event.current_attendees, 12);
        assert_eq!(event.description.as_deref(), Some("Monthly talks"));
        assert!(event.location_address.is_none());
        assert_eq!(event.fee, Some(5.5));
        assert_eq!(event.rule_string(), "FREQ=WEEKLY;INTERVAL=1;BYDAY=SA");
        assert_eq!(event.session("ses-1").map(|s| s.session_number), Some(1));
        assert!(event.session("SES-1").is_none());
    }

    #[test]
    fn missing_optional_columns_default_to_absent() {
        let event: Event = serde_json::from_str(
            r#"{"id": "e", "created_by": "u", "status": "cancelled", "recurrence_rule": null}"#,
        )
        .unwrap();
        assert_eq!(event.status, EventStatus::Cancelled);
        assert!(event.start_time.is_none());
        assert!(event.max_attendees.is_none());
        assert!(event.description.is_none());
        assert!(event.fee.is_none());
        assert_eq!(event.timezone, "UTC");
        assert_eq!(event.rule_string(), "");
        assert!(event.sessions.is_empty());
    }
}
