use attendwise_models::{Event, EventSession, EventStatus, Registration, RegistrationStatus, User};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::temporal::normalize;
use crate::window::TimeWindow;

pub const CLOCK_UNAVAILABLE: &str = "Error: Could not determine current time.";
pub const EVENT_CANCELLED: &str = "Event Cancelled";
pub const EVENT_OVER: &str = "Event Ended";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionState {
    LoginToRegister,
    EventEnded { message: String },
    RegistrationClosed,
    EventFull,
    FaceIdRequired,
    CanRegister,
    PendingApproval,
    Attended,
    CanCheckIn,
    RegisteredUpcoming,
    HostManage,
}

impl ActionState {
    fn ended(message: &str) -> Self {
        ActionState::EventEnded {
            message: message.to_string(),
        }
    }

    /// Machine-readable state code.
    pub fn code(&self) -> &'static str {
        match self {
            ActionState::LoginToRegister => "LOGIN_TO_REGISTER",
            ActionState::EventEnded { .. } => "EVENT_ENDED",
            ActionState::RegistrationClosed => "REGISTRATION_CLOSED",
            ActionState::EventFull => "EVENT_FULL",
            ActionState::FaceIdRequired => "FACE_ID_REQUIRED",
            ActionState::CanRegister => "CAN_REGISTER",
            ActionState::PendingApproval => "PENDING_APPROVAL",
            ActionState::Attended => "ATTENDED",
            ActionState::CanCheckIn => "CAN_CHECK_IN",
            ActionState::RegisteredUpcoming => "REGISTERED_UPCOMING",
            ActionState::HostManage => "HOST_MANAGE",
        }
    }

    /// Button text for the rendered call to action.
    pub fn label(&self) -> &str {
        match self {
            ActionState::LoginToRegister => "Login to Register",
            ActionState::EventEnded { message } => message,
            ActionState::RegistrationClosed => "Registration Closed",
            ActionState::EventFull => "Event Full",
            ActionState::FaceIdRequired => "Face ID Required",
            ActionState::CanRegister => "Register Now",
            ActionState::PendingApproval => "Pending Approval",
            ActionState::Attended => "Checked In",
            ActionState::CanCheckIn => "Check In",
            ActionState::RegisteredUpcoming => "Registered",
            ActionState::HostManage => "Manage Event",
        }
    }

    /// States whose call to action submits a mutation (register, check in).
    pub fn triggers_mutation(&self) -> bool {
        matches!(self, ActionState::CanRegister | ActionState::CanCheckIn)
    }
}

/// Everything the resolver looks at besides the clock.
#[derive(Debug, Clone, Copy)]
pub struct ActionContext<'a> {
    pub event: &'a Event,
    pub user: Option<&'a User>,
    pub is_host: bool,
    pub registration: Option<&'a Registration>,
    pub selected_session: Option<&'a EventSession>,
}

impl<'a> ActionContext<'a> {
    pub fn new(event: &'a Event) -> Self {
        Self {
            event,
            user: None,
            is_host: false,
            registration: None,
            selected_session: None,
        }
    }

    pub fn user(mut self, user: Option<&'a User>) -> Self {
        self.user = user;
        self
    }

    pub fn host(mut self, is_host: bool) -> Self {
        self.is_host = is_host;
        self
    }

    pub fn registration(mut self, registration: Option<&'a Registration>) -> Self {
        self.registration = registration;
        self
    }

    pub fn session(mut self, session: Option<&'a EventSession>) -> Self {
        self.selected_session = session;
        self
    }
}

/// The conventional host test: the viewer created the event.
pub fn is_event_host(event: &Event, user: Option<&User>) -> bool {
    user.is_some_and(|u| u.id == event.created_by)
}

/// The single state the event page renders. Rules are checked in a fixed
/// priority order and the first match wins.
pub fn resolve(ctx: &ActionContext<'_>) -> ActionState {
    resolve_with(ctx, &SystemClock)
}

/// Reads `clock` exactly once, then resolves against that instant.
pub fn resolve_with(ctx: &ActionContext<'_>, clock: &dyn Clock) -> ActionState {
    resolve_at(ctx, clock.now())
}

pub fn resolve_at(ctx: &ActionContext<'_>, now: Option<DateTime<Utc>>) -> ActionState {
    let event = ctx.event;
    let window = TimeWindow::relevant(event, ctx.selected_session);

    let Some(now) = now else {
        return ActionState::ended(CLOCK_UNAVAILABLE);
    };

    if event.status == EventStatus::Cancelled {
        return ActionState::ended(EVENT_CANCELLED);
    }
    if window.has_finished(now) {
        return ActionState::ended(EVENT_OVER);
    }

    if ctx.is_host {
        return ActionState::HostManage;
    }

    let Some(user) = ctx.user else {
        return ActionState::LoginToRegister;
    };

    if let Some(registration) = ctx.registration {
        return match registration.status {
            RegistrationStatus::Attended => ActionState::Attended,
            RegistrationStatus::Pending => ActionState::PendingApproval,
            RegistrationStatus::Active if window.is_ongoing(now) => ActionState::CanCheckIn,
            RegistrationStatus::Active => ActionState::RegisteredUpcoming,
        };
    }

    if normalize(event.registration_closes_at.as_deref()).is_some_and(|closes| closes < now) {
        return ActionState::RegistrationClosed;
    }
    if event
        .max_attendees
        .is_some_and(|max| event.current_attendees >= max)
    {
        return ActionState::EventFull;
    }
    if event.face_verification_required && !user.face_id_enrolled {
        return ActionState::FaceIdRequired;
    }

    ActionState::CanRegister
}

/// Filled-seat summary shown next to the call to action when the event has a
/// cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capacity {
    pub current: u32,
    pub max: u32,
    /// Rounded to the nearest whole percent; `0` for a zero cap.
    pub percent: u32,
}

pub fn capacity(event: &Event) -> Option<Capacity> {
    let max = event.max_attendees?;
    let percent = if max == 0 {
        0
    } else {
        ((f64::from(event.current_attendees) / f64::from(max)) * 100.0).round() as u32
    };
    Some(Capacity {
        current: event.current_attendees,
        max,
        percent,
    })
}
