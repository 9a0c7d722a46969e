pub mod event;
pub mod nullable;
pub mod registration;
pub mod session;
pub mod user;

pub use event::{Event, EventStatus, RecurrenceRulePayload};
pub use registration::{Registration, RegistrationStatus};
pub use session::EventSession;
pub use user::User;
