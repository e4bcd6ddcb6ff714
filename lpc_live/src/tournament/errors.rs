//! Tournament error types.

use super::models::{EntrantId, EntrantStatus};
use crate::db::StoreError;
use crate::errors::ErrorKind;
use thiserror::Error;

/// Tournament errors
#[derive(Debug, Error)]
pub enum TournamentError {
    #[error("Entrant not found: {0}")]
    EntrantNotFound(EntrantId),

    #[error("Entrant {entrant_id} is {actual:?}, expected {expected:?}")]
    InvalidState {
        entrant_id: EntrantId,
        expected: EntrantStatus,
        actual: EntrantStatus,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TournamentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TournamentError::EntrantNotFound(_) => ErrorKind::NotFound,
            TournamentError::InvalidState { .. } => ErrorKind::InvalidState,
            TournamentError::InvalidInput(_) => ErrorKind::InvalidInput,
            TournamentError::Store(e) => e.kind(),
        }
    }

    /// Get a client-safe error message
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::EntrantNotFound(_) => "Entrant not found".to_string(),
            TournamentError::InvalidState {
                expected: EntrantStatus::Active,
                ..
            } => "Entrant is already eliminated".to_string(),
            TournamentError::InvalidState { .. } => "Entrant is not eliminated".to_string(),
            TournamentError::Store(e) => e.client_message(),
            _ => self.to_string(),
        }
    }
}

pub type TournamentResult<T> = Result<T, TournamentError>;
