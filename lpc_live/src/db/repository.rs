//! Repository trait definitions for testability and dependency injection.
//!
//! Managers only ever see these traits as `Arc<dyn …>`. Two implementations
//! ship with the crate: [`MemoryStore`](super::memory::MemoryStore) for tests
//! and single-process deployments, and [`PgStore`](super::postgres::PgStore).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

use super::timeouts::TimeoutError;
use crate::betting::models::{BettingPoll, BettingVote, NewVote, OptionId, PollId, VoteId};
use crate::errors::ErrorKind;
use crate::ledger::models::PlayerBalance;
use crate::players::{Player, PlayerId};
use crate::tournament::models::{
    Entrant, EntrantId, NewEntrant, PayoutPlace, ScoreRecord, TournamentId,
};

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// Query did not finish in time
    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),

    /// Unique constraint violated
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// JSON column could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Store refused the operation (used by failure-injecting test stores)
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::UniqueViolation(_) => ErrorKind::Conflict,
            _ => ErrorKind::DependencyFailure,
        }
    }

    /// Get a client-safe error message that doesn't leak store internals
    pub fn client_message(&self) -> String {
        match self {
            StoreError::UniqueViolation(_) => "Already exists".to_string(),
            StoreError::Timeout(_) => "Service temporarily unavailable".to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error()
            && db_err.code().as_deref() == Some("23505")
        {
            return StoreError::UniqueViolation(db_err.message().to_string());
        }
        StoreError::Database(err)
    }
}

impl From<TimeoutError> for StoreError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(duration) => StoreError::Timeout(duration),
            TimeoutError::Database(e) => e.into(),
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Tournament registrations
#[async_trait]
pub trait EntrantRepository: Send + Sync {
    /// Insert a registration and return it with its assigned ID
    async fn insert_entrant(&self, entrant: &NewEntrant) -> StoreResult<Entrant>;

    /// Find a registration by ID
    async fn get_entrant(&self, entrant_id: EntrantId) -> StoreResult<Option<Entrant>>;

    /// All registrations of a tournament, in registration order
    async fn list_entrants(&self, tournament_id: TournamentId) -> StoreResult<Vec<Entrant>>;

    /// Overwrite the editable fields of a registration
    async fn save_entrant(&self, entrant: &Entrant) -> StoreResult<()>;

    /// Set or clear the elimination timestamp and placement
    async fn set_elimination(
        &self,
        entrant_id: EntrantId,
        eliminated_at: Option<DateTime<Utc>>,
        placement: Option<u32>,
    ) -> StoreResult<()>;
}

/// Per-tournament score records
#[async_trait]
pub trait ScoreRepository: Send + Sync {
    /// Insert or replace the record for `(tournament_id, player_id)`
    async fn upsert_score(&self, record: &ScoreRecord) -> StoreResult<()>;

    /// Delete a record, returning whether one existed
    async fn delete_score(&self, tournament_id: TournamentId, player_id: PlayerId) -> StoreResult<bool>;

    /// Every record across all tournaments
    async fn list_scores(&self) -> StoreResult<Vec<ScoreRecord>>;

    /// Records of one tournament
    async fn tournament_scores(&self, tournament_id: TournamentId) -> StoreResult<Vec<ScoreRecord>>;
}

/// Payout structures
#[async_trait]
pub trait PayoutRepository: Send + Sync {
    /// Replace a tournament's payout structure
    async fn set_payout_structure(
        &self,
        tournament_id: TournamentId,
        places: &[PayoutPlace],
    ) -> StoreResult<()>;

    /// Payout structure, empty if none was configured
    async fn payout_structure(&self, tournament_id: TournamentId) -> StoreResult<Vec<PayoutPlace>>;
}

/// Betting polls and their options
#[async_trait]
pub trait PollRepository: Send + Sync {
    /// Create an active poll with options in the given display order
    async fn insert_poll(
        &self,
        tournament_id: TournamentId,
        title: &str,
        options: &[String],
    ) -> StoreResult<BettingPoll>;

    /// Find a poll by ID
    async fn get_poll(&self, poll_id: PollId) -> StoreResult<Option<BettingPoll>>;

    /// Polls of a tournament, newest first
    async fn list_polls(&self, tournament_id: TournamentId) -> StoreResult<Vec<BettingPoll>>;

    /// Toggle `is_active` on an unresolved poll; false if nothing matched
    async fn set_poll_active(&self, poll_id: PollId, active: bool) -> StoreResult<bool>;

    /// Mark an unresolved poll resolved. Returns false if it was already
    /// resolved (or missing), in which case nothing changes.
    async fn mark_resolved(
        &self,
        poll_id: PollId,
        winning_option_id: OptionId,
        resolved_at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Delete an unresolved poll with its options and votes
    async fn delete_poll(&self, poll_id: PollId) -> StoreResult<bool>;
}

/// Betting votes
#[async_trait]
pub trait VoteRepository: Send + Sync {
    /// Insert a vote; `UniqueViolation` if the player already voted on the poll
    async fn insert_vote(&self, vote: &NewVote) -> StoreResult<BettingVote>;

    /// The player's vote on a poll, if any
    async fn find_vote(&self, poll_id: PollId, player_id: PlayerId) -> StoreResult<Option<BettingVote>>;

    /// All votes on a poll, oldest first
    async fn poll_votes(&self, poll_id: PollId) -> StoreResult<Vec<BettingVote>>;

    /// A player's votes on polls of a tournament, newest first
    async fn player_votes(
        &self,
        player_id: PlayerId,
        tournament_id: TournamentId,
    ) -> StoreResult<Vec<BettingVote>>;

    /// Record the settled winnings of a vote
    async fn set_winnings(&self, vote_id: VoteId, winnings: i64) -> StoreResult<()>;

    /// Sum of the player's bets on unresolved polls of a tournament
    async fn active_bet_total(&self, player_id: PlayerId, tournament_id: TournamentId) -> StoreResult<i64>;
}

/// Per-tournament currency balances
#[async_trait]
pub trait BalanceRepository: Send + Sync {
    /// Create a balance row; `UniqueViolation` if it exists
    async fn create_balance(
        &self,
        player_id: PlayerId,
        tournament_id: TournamentId,
        starting_balance: i64,
    ) -> StoreResult<PlayerBalance>;

    /// Find a balance row
    async fn get_balance(
        &self,
        player_id: PlayerId,
        tournament_id: TournamentId,
    ) -> StoreResult<Option<PlayerBalance>>;

    /// Add `delta` to the balance, returning the new balance or `None` if
    /// the row does not exist
    async fn adjust_balance(
        &self,
        player_id: PlayerId,
        tournament_id: TournamentId,
        delta: i64,
    ) -> StoreResult<Option<i64>>;
}

/// Player identity lookup
#[async_trait]
pub trait PlayerDirectory: Send + Sync {
    /// Add a player; `UniqueViolation` if the betting code is taken
    async fn create_player(&self, name: &str, betting_code: Option<&str>) -> StoreResult<Player>;

    /// Find a player by ID
    async fn find_player(&self, player_id: PlayerId) -> StoreResult<Option<Player>>;

    /// Find a player by normalized betting code
    async fn find_by_code(&self, code: &str) -> StoreResult<Option<Player>>;
}
