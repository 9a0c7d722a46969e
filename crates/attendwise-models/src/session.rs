use serde::{Deserialize, Serialize};

use crate::nullable;

/// A concrete scheduled occurrence of an event. Times are the raw strings the
/// event service stores; they may or may not carry a UTC offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSession {
    pub id: String,
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub session_number: u32,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    #[serde(default)]
    pub timezone: String,
    #[serde(default, deserialize_with = "nullable::string")]
    pub location_override: Option<String>,
    #[serde(default)]
    pub is_cancelled: bool,
}

impl EventSession {
    pub fn new(
        id: impl Into<String>,
        start_time: impl Into<String>,
        end_time: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            event_id: String::new(),
            session_number: 0,
            start_time: start_time.into(),
            end_time: end_time.into(),
            timezone: String::new(),
            location_override: None,
            is_cancelled: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_override_accepts_wrapped_and_plain_forms() {
        let session: EventSession = serde_json::from_str(
            r#"{"id": "ses-1", "location_override": {"String": "Room 2", "Valid": true}}"#,
        )
        .unwrap();
        assert_eq!(session.location_override.as_deref(), Some("Room 2"));

        let json = serde_json::to_string(&session).unwrap();
        let again: EventSession = serde_json::from_str(&json).unwrap();
        assert_eq!(again, session);

        let session: EventSession = serde_json::from_str(
            r#"{"id": "ses-2", "location_override": {"String": "", "Valid": false}}"#,
        )
        .unwrap();
        assert!(session.location_override.is_none());
    }
}
