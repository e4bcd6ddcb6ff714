//! Timer error types.

use super::models::TimerId;
use crate::errors::ErrorKind;
use thiserror::Error;

/// Timer errors
#[derive(Debug, Error)]
pub enum TimerError {
    #[error("Timer not found: {0}")]
    NotFound(TimerId),

    /// The actor task has stopped
    #[error("Timer {0} is closed")]
    Closed(TimerId),

    #[error("Checkpoint I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Checkpoint serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TimerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TimerError::NotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::DependencyFailure,
        }
    }

    /// Get a client-safe error message
    pub fn client_message(&self) -> String {
        match self {
            TimerError::NotFound(_) => "Timer not found".to_string(),
            TimerError::Closed(_) => "Timer is not running".to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}

pub type TimerResult<T> = Result<T, TimerError>;
