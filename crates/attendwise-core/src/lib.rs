//! Event lifecycle engine: timestamp normalization, default session choice,
//! the call-to-action resolver, live countdowns and recurrence rules.
//!
//! Everything here is advisory. The event service remains the authority for
//! registration, check-in and capacity decisions.

pub mod action;
pub mod clock;
pub mod countdown;
pub mod error;
pub mod planner;
pub mod recurrence;
pub mod session;
pub mod temporal;
pub mod window;

pub use action::{resolve, resolve_at, resolve_with, ActionContext, ActionState};
pub use clock::{Clock, FixedClock, SystemClock};
pub use countdown::{Breakdown, Countdown, CountdownRegistry, CountdownState, CountdownTimer};
pub use error::CoreError;
pub use planner::{plan_for_event, plan_sessions, PlanRequest, PlannedSession};
pub use recurrence::{Frequency, RecurrenceEditor, RecurrenceEnd, RecurrenceOptions, Weekdays};
pub use session::{find_session, select_initial_session, select_initial_session_at};
pub use temporal::{normalize, normalize_in};
pub use window::TimeWindow;
