//! In-memory store.
//!
//! Implements every repository trait over a single `RwLock`-guarded state.
//! Used by the test suites and by the server's `--memory` mode.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::repository::{
    BalanceRepository, EntrantRepository, PayoutRepository, PlayerDirectory, PollRepository,
    ScoreRepository, StoreError, StoreResult, VoteRepository,
};
use crate::betting::models::{
    BettingOption, BettingPoll, BettingVote, NewVote, OptionId, PollId, VoteId,
};
use crate::ledger::models::PlayerBalance;
use crate::players::{Player, PlayerId, normalize_code};
use crate::tournament::models::{
    Entrant, EntrantId, NewEntrant, PayoutPlace, ScoreRecord, TournamentId,
};

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    entrants: BTreeMap<EntrantId, Entrant>,
    scores: BTreeMap<(TournamentId, PlayerId), ScoreRecord>,
    payouts: HashMap<TournamentId, Vec<PayoutPlace>>,
    polls: BTreeMap<PollId, BettingPoll>,
    votes: BTreeMap<VoteId, BettingVote>,
    balances: HashMap<(PlayerId, TournamentId), PlayerBalance>,
    players: BTreeMap<PlayerId, Player>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Store backed by process memory
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a player with a known ID
    pub async fn insert_player(&self, player: Player) {
        let mut state = self.state.write().await;
        state.next_id = state.next_id.max(player.id);
        state.players.insert(player.id, player);
    }
}

#[async_trait]
impl EntrantRepository for MemoryStore {
    async fn insert_entrant(&self, entrant: &NewEntrant) -> StoreResult<Entrant> {
        let mut state = self.state.write().await;
        let id = state.next_id();
        let row = Entrant {
            id,
            tournament_id: entrant.tournament_id,
            player_id: entrant.player_id,
            full_name: entrant.full_name.clone(),
            buy_in_amount: entrant.buy_in_amount,
            rebuy_count: entrant.rebuy_count,
            addon_count: entrant.addon_count,
            tier: entrant.tier,
            confirmed: entrant.confirmed,
            eliminated_at: None,
            placement: None,
            registered_at: Utc::now(),
        };
        state.entrants.insert(id, row.clone());
        Ok(row)
    }

    async fn get_entrant(&self, entrant_id: EntrantId) -> StoreResult<Option<Entrant>> {
        Ok(self.state.read().await.entrants.get(&entrant_id).cloned())
    }

    async fn list_entrants(&self, tournament_id: TournamentId) -> StoreResult<Vec<Entrant>> {
        let state = self.state.read().await;
        Ok(state
            .entrants
            .values()
            .filter(|e| e.tournament_id == tournament_id)
            .cloned()
            .collect())
    }

    async fn save_entrant(&self, entrant: &Entrant) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if let Some(row) = state.entrants.get_mut(&entrant.id) {
            row.full_name = entrant.full_name.clone();
            row.player_id = entrant.player_id;
            row.buy_in_amount = entrant.buy_in_amount;
            row.rebuy_count = entrant.rebuy_count;
            row.addon_count = entrant.addon_count;
            row.tier = entrant.tier;
            row.confirmed = entrant.confirmed;
        }
        Ok(())
    }

    async fn set_elimination(
        &self,
        entrant_id: EntrantId,
        eliminated_at: Option<DateTime<Utc>>,
        placement: Option<u32>,
    ) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if let Some(row) = state.entrants.get_mut(&entrant_id) {
            row.eliminated_at = eliminated_at;
            row.placement = placement;
        }
        Ok(())
    }
}

#[async_trait]
impl ScoreRepository for MemoryStore {
    async fn upsert_score(&self, record: &ScoreRecord) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state
            .scores
            .insert((record.tournament_id, record.player_id), record.clone());
        Ok(())
    }

    async fn delete_score(&self, tournament_id: TournamentId, player_id: PlayerId) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        Ok(state.scores.remove(&(tournament_id, player_id)).is_some())
    }

    async fn list_scores(&self) -> StoreResult<Vec<ScoreRecord>> {
        Ok(self.state.read().await.scores.values().cloned().collect())
    }

    async fn tournament_scores(&self, tournament_id: TournamentId) -> StoreResult<Vec<ScoreRecord>> {
        let state = self.state.read().await;
        Ok(state
            .scores
            .range((tournament_id, PlayerId::MIN)..=(tournament_id, PlayerId::MAX))
            .map(|(_, record)| record.clone())
            .collect())
    }
}

#[async_trait]
impl PayoutRepository for MemoryStore {
    async fn set_payout_structure(
        &self,
        tournament_id: TournamentId,
        places: &[PayoutPlace],
    ) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.payouts.insert(tournament_id, places.to_vec());
        Ok(())
    }

    async fn payout_structure(&self, tournament_id: TournamentId) -> StoreResult<Vec<PayoutPlace>> {
        let state = self.state.read().await;
        Ok(state.payouts.get(&tournament_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl PollRepository for MemoryStore {
    async fn insert_poll(
        &self,
        tournament_id: TournamentId,
        title: &str,
        options: &[String],
    ) -> StoreResult<BettingPoll> {
        let mut state = self.state.write().await;
        let poll_id = state.next_id();
        let mut poll_options = Vec::with_capacity(options.len());
        for (order, text) in options.iter().enumerate() {
            poll_options.push(BettingOption {
                id: state.next_id(),
                poll_id,
                text: text.clone(),
                display_order: order as i32,
            });
        }

        let poll = BettingPoll {
            id: poll_id,
            tournament_id,
            title: title.to_string(),
            options: poll_options,
            is_active: true,
            resolved_at: None,
            winning_option_id: None,
            created_at: Utc::now(),
        };
        state.polls.insert(poll_id, poll.clone());
        Ok(poll)
    }

    async fn get_poll(&self, poll_id: PollId) -> StoreResult<Option<BettingPoll>> {
        Ok(self.state.read().await.polls.get(&poll_id).cloned())
    }

    async fn list_polls(&self, tournament_id: TournamentId) -> StoreResult<Vec<BettingPoll>> {
        let state = self.state.read().await;
        Ok(state
            .polls
            .values()
            .rev()
            .filter(|p| p.tournament_id == tournament_id)
            .cloned()
            .collect())
    }

    async fn set_poll_active(&self, poll_id: PollId, active: bool) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        match state.polls.get_mut(&poll_id) {
            Some(poll) if !poll.is_resolved() => {
                poll.is_active = active;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_resolved(
        &self,
        poll_id: PollId,
        winning_option_id: OptionId,
        resolved_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        match state.polls.get_mut(&poll_id) {
            Some(poll) if !poll.is_resolved() => {
                poll.is_active = false;
                poll.resolved_at = Some(resolved_at);
                poll.winning_option_id = Some(winning_option_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_poll(&self, poll_id: PollId) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let deletable = state.polls.get(&poll_id).is_some_and(|p| !p.is_resolved());
        if deletable {
            state.polls.remove(&poll_id);
            state.votes.retain(|_, v| v.poll_id != poll_id);
        }
        Ok(deletable)
    }
}

#[async_trait]
impl VoteRepository for MemoryStore {
    async fn insert_vote(&self, vote: &NewVote) -> StoreResult<BettingVote> {
        let mut state = self.state.write().await;
        let duplicate = state
            .votes
            .values()
            .any(|v| v.poll_id == vote.poll_id && v.player_id == vote.player_id);
        if duplicate {
            return Err(StoreError::UniqueViolation(format!(
                "vote ({}, {})",
                vote.poll_id, vote.player_id
            )));
        }

        let id = state.next_id();
        let row = BettingVote {
            id,
            poll_id: vote.poll_id,
            player_id: vote.player_id,
            option_id: vote.option_id,
            bet_amount: vote.bet_amount,
            winnings: 0,
            created_at: Utc::now(),
        };
        state.votes.insert(id, row.clone());
        Ok(row)
    }

    async fn find_vote(&self, poll_id: PollId, player_id: PlayerId) -> StoreResult<Option<BettingVote>> {
        let state = self.state.read().await;
        Ok(state
            .votes
            .values()
            .find(|v| v.poll_id == poll_id && v.player_id == player_id)
            .cloned())
    }

    async fn poll_votes(&self, poll_id: PollId) -> StoreResult<Vec<BettingVote>> {
        let state = self.state.read().await;
        Ok(state
            .votes
            .values()
            .filter(|v| v.poll_id == poll_id)
            .cloned()
            .collect())
    }

    async fn player_votes(
        &self,
        player_id: PlayerId,
        tournament_id: TournamentId,
    ) -> StoreResult<Vec<BettingVote>> {
        let state = self.state.read().await;
        Ok(state
            .votes
            .values()
            .rev()
            .filter(|v| v.player_id == player_id)
            .filter(|v| {
                state
                    .polls
                    .get(&v.poll_id)
                    .is_some_and(|p| p.tournament_id == tournament_id)
            })
            .cloned()
            .collect())
    }

    async fn set_winnings(&self, vote_id: VoteId, winnings: i64) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if let Some(vote) = state.votes.get_mut(&vote_id) {
            vote.winnings = winnings;
        }
        Ok(())
    }

    async fn active_bet_total(&self, player_id: PlayerId, tournament_id: TournamentId) -> StoreResult<i64> {
        let state = self.state.read().await;
        Ok(state
            .votes
            .values()
            .filter(|v| v.player_id == player_id)
            .filter(|v| {
                state
                    .polls
                    .get(&v.poll_id)
                    .is_some_and(|p| p.tournament_id == tournament_id && !p.is_resolved())
            })
            .map(|v| v.bet_amount)
            .sum())
    }
}

#[async_trait]
impl BalanceRepository for MemoryStore {
    async fn create_balance(
        &self,
        player_id: PlayerId,
        tournament_id: TournamentId,
        starting_balance: i64,
    ) -> StoreResult<PlayerBalance> {
        let mut state = self.state.write().await;
        if state.balances.contains_key(&(player_id, tournament_id)) {
            return Err(StoreError::UniqueViolation(format!(
                "balance ({player_id}, {tournament_id})"
            )));
        }

        let row = PlayerBalance {
            player_id,
            tournament_id,
            balance: starting_balance,
            starting_balance,
            updated_at: Utc::now(),
        };
        state.balances.insert((player_id, tournament_id), row.clone());
        Ok(row)
    }

    async fn get_balance(
        &self,
        player_id: PlayerId,
        tournament_id: TournamentId,
    ) -> StoreResult<Option<PlayerBalance>> {
        let state = self.state.read().await;
        Ok(state.balances.get(&(player_id, tournament_id)).cloned())
    }

    async fn adjust_balance(
        &self,
        player_id: PlayerId,
        tournament_id: TournamentId,
        delta: i64,
    ) -> StoreResult<Option<i64>> {
        let mut state = self.state.write().await;
        Ok(state
            .balances
            .get_mut(&(player_id, tournament_id))
            .map(|row| {
                row.balance += delta;
                row.updated_at = Utc::now();
                row.balance
            }))
    }
}

#[async_trait]
impl PlayerDirectory for MemoryStore {
    async fn create_player(&self, name: &str, betting_code: Option<&str>) -> StoreResult<Player> {
        let mut state = self.state.write().await;
        let code = betting_code.map(normalize_code).filter(|c| !c.is_empty());
        if let Some(code) = &code
            && state
                .players
                .values()
                .any(|p| p.betting_code.as_ref() == Some(code))
        {
            return Err(StoreError::UniqueViolation(format!("betting code {code}")));
        }

        let id = state.next_id();
        let player = Player {
            id,
            name: name.to_string(),
            betting_code: code,
        };
        state.players.insert(id, player.clone());
        Ok(player)
    }

    async fn find_player(&self, player_id: PlayerId) -> StoreResult<Option<Player>> {
        Ok(self.state.read().await.players.get(&player_id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> StoreResult<Option<Player>> {
        let code = normalize_code(code);
        let state = self.state.read().await;
        Ok(state
            .players
            .values()
            .find(|p| p.betting_code.as_deref() == Some(code.as_str()))
            .cloned())
    }
}
