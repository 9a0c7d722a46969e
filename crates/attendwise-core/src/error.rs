use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid timestamp: {0:?}")]
    InvalidTimestamp(String),
    #[error("invalid recurrence rule: {0}")]
    InvalidRule(String),
    #[error("event {0} needs a start and end time to be scheduled")]
    IncompleteEvent(String),
    #[error("time arithmetic out of range: {0}")]
    OutOfRange(String),
}

impl CoreError {
    /// Short machine-readable code, used by the command-line front end.
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::InvalidTimestamp(_) => "INVALID_TIMESTAMP",
            CoreError::InvalidRule(_) => "INVALID_RULE",
            CoreError::IncompleteEvent(_) => "INCOMPLETE_EVENT",
            CoreError::OutOfRange(_) => "OUT_OF_RANGE",
        }
    }
}
