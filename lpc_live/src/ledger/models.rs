//! Balance ledger data models.

use crate::players::PlayerId;
use crate::tournament::models::TournamentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A player's currency balance in one tournament.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerBalance {
    pub player_id: PlayerId,
    pub tournament_id: TournamentId,
    pub balance: i64,
    /// Never changes after the row is created
    pub starting_balance: i64,
    pub updated_at: DateTime<Utc>,
}

/// Balance summary shown on the voting page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceStats {
    pub current_balance: i64,
    pub starting_balance: i64,
    /// Bets on unresolved polls
    pub total_active_bets: i64,
    pub available_balance: i64,
    pub total_votes: u32,
}
