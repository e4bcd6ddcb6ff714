//! Ledger error types.

use crate::db::StoreError;
use crate::errors::ErrorKind;
use crate::players::PlayerId;
use crate::tournament::models::TournamentId;
use thiserror::Error;

/// Ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    /// No balance row for the player in this tournament
    #[error("No balance for player {player_id} in tournament {tournament_id}")]
    BalanceNotFound {
        player_id: PlayerId,
        tournament_id: TournamentId,
    },

    /// Balance row already exists
    #[error("Balance already granted to player {player_id} in tournament {tournament_id}")]
    AlreadyGranted {
        player_id: PlayerId,
        tournament_id: TournamentId,
    },

    /// Invalid amount (must not be negative)
    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),

    /// Insufficient balance
    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: i64, required: i64 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::BalanceNotFound { .. } => ErrorKind::NotFound,
            LedgerError::AlreadyGranted { .. } => ErrorKind::Conflict,
            LedgerError::InvalidAmount(_) | LedgerError::InsufficientBalance { .. } => {
                ErrorKind::InvalidInput
            }
            LedgerError::Store(e) => e.kind(),
        }
    }

    /// Get a client-safe error message that doesn't leak player IDs
    pub fn client_message(&self) -> String {
        match self {
            LedgerError::BalanceNotFound { .. } => "Balance not found".to_string(),
            LedgerError::AlreadyGranted { .. } => "Balance already exists".to_string(),
            LedgerError::Store(e) => e.client_message(),
            _ => self.to_string(),
        }
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
