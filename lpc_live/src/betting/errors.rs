//! Betting error types.

use super::models::{OptionId, PollId, PollState};
use crate::db::StoreError;
use crate::errors::ErrorKind;
use crate::ledger::LedgerError;
use crate::players::PlayerId;
use thiserror::Error;

/// Betting errors
#[derive(Debug, Error)]
pub enum BettingError {
    #[error("Poll not found: {0}")]
    PollNotFound(PollId),

    #[error("Poll {poll_id} is {state:?}")]
    InvalidState { poll_id: PollId, state: PollState },

    #[error("Option {option_id} does not belong to poll {poll_id}")]
    InvalidOption { poll_id: PollId, option_id: OptionId },

    #[error("Player {player_id} already voted on poll {poll_id}")]
    DuplicateVote { poll_id: PollId, player_id: PlayerId },

    #[error("Poll {0} is already resolved")]
    AlreadyResolved(PollId),

    #[error("Unknown betting code")]
    UnknownCode,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Poll is resolved but some balances could not be settled
    #[error("Settlement of poll {poll_id} failed for {failed} votes")]
    Settlement { poll_id: PollId, failed: usize },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BettingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BettingError::PollNotFound(_) | BettingError::UnknownCode => ErrorKind::NotFound,
            BettingError::InvalidState { .. } => ErrorKind::InvalidState,
            BettingError::InvalidOption { .. } | BettingError::InvalidInput(_) => {
                ErrorKind::InvalidInput
            }
            BettingError::DuplicateVote { .. } | BettingError::AlreadyResolved(_) => {
                ErrorKind::Conflict
            }
            BettingError::Settlement { .. } => ErrorKind::DependencyFailure,
            BettingError::Ledger(e) => e.kind(),
            BettingError::Store(e) => e.kind(),
        }
    }

    /// Get a client-safe error message
    pub fn client_message(&self) -> String {
        match self {
            BettingError::PollNotFound(_) => "Poll not found".to_string(),
            BettingError::InvalidState { .. } => "Poll is not open for voting".to_string(),
            BettingError::InvalidOption { .. } => "Invalid option".to_string(),
            BettingError::DuplicateVote { .. } => "You have already voted on this poll".to_string(),
            BettingError::AlreadyResolved(_) => "Poll is already resolved".to_string(),
            BettingError::Settlement { .. } => "Poll resolved with settlement errors".to_string(),
            BettingError::Ledger(e) => e.client_message(),
            BettingError::Store(e) => e.client_message(),
            _ => self.to_string(),
        }
    }
}

/// Result type for betting operations
pub type BettingResult<T> = Result<T, BettingError>;
