use serde::{Deserialize, Serialize};

use crate::nullable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Pending,
    #[serde(alias = "registered")]
    Active,
    Attended,
}

/// A user's registration for an event. At most one exists per (user, event).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub user_id: String,
    pub status: RegistrationStatus,
    /// Set once the attendee has checked in after the session started.
    #[serde(default, deserialize_with = "nullable::boolean")]
    pub is_late: bool,
}

impl Registration {
    pub fn with_status(status: RegistrationStatus) -> Self {
        Self {
            event_id: String::new(),
            user_id: String::new(),
            status,
            is_late: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_decodes_as_active() {
        let reg: Registration =
            serde_json::from_str(r#"{"event_id": "e", "user_id": "u", "status": "registered"}"#)
                .unwrap();
        assert_eq!(reg.status, RegistrationStatus::Active);
        assert!(!reg.is_late);
    }

    #[test]
    fn late_flag_reads_through_the_wrapper() {
        let reg: Registration = serde_json::from_str(
            r#"{"status": "attended", "is_late": {"Bool": true, "Valid": true}}"#,
        )
        .unwrap();
        assert!(reg.is_late);

        let reg: Registration = serde_json::from_str(
            r#"{"status": "attended", "is_late": {"Bool": true, "Valid": false}}"#,
        )
        .unwrap();
        assert!(!reg.is_late);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let reg = serde_json::from_str::<Registration>(r#"{"status": "no_show"}"#);
        assert!(reg.is_err());
    }
}
