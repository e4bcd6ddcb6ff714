//! Betting poll lifecycle, wagers and resolution.

use super::errors::{BettingError, BettingResult};
use super::models::{
    BettingPoll, BettingVote, NewPoll, NewVote, OptionId, OptionTally, PollId, PollState,
    VoteHistoryEntry, Winner, tally,
};
use super::settlement::pari_mutuel;
use crate::db::{PlayerDirectory, PollRepository, StoreError, Stores, VoteRepository};
use crate::events::{ChangeEvent, EventBus};
use crate::ledger::{BalanceLedger, LedgerError};
use crate::players::{Player, PlayerId, normalize_code};
use crate::sync::KeyedLocks;
use crate::tournament::models::TournamentId;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Outcome of resolving a poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub poll: BettingPoll,
    pub winning_option_id: OptionId,
    pub total_pool: i64,
    pub winning_pool: i64,
    pub winners: Vec<Winner>,
}

/// Betting market
///
/// Votes and resolution of one poll are serialized on the poll's lock.
/// Balance checks additionally take the voter's ledger lock, always after
/// the poll lock.
#[derive(Clone)]
pub struct BettingMarket {
    polls: Arc<dyn PollRepository>,
    votes: Arc<dyn VoteRepository>,
    players: Arc<dyn PlayerDirectory>,
    ledger: BalanceLedger,
    events: EventBus,
    locks: Arc<KeyedLocks<PollId>>,
}

impl BettingMarket {
    /// Create a new betting market
    pub fn new(stores: &Stores, ledger: BalanceLedger, events: EventBus) -> Self {
        Self {
            polls: stores.polls.clone(),
            votes: stores.votes.clone(),
            players: stores.players.clone(),
            ledger,
            events,
            locks: Arc::new(KeyedLocks::new()),
        }
    }

    pub fn ledger(&self) -> &BalanceLedger {
        &self.ledger
    }

    /// Create an open poll. Blank options are dropped; at least two must
    /// remain.
    pub async fn create_poll(&self, poll: NewPoll) -> BettingResult<BettingPoll> {
        let title = poll.title.trim();
        if title.is_empty() {
            return Err(BettingError::InvalidInput("title must not be blank".to_string()));
        }
        let options: Vec<String> = poll
            .options
            .iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        if options.len() < 2 {
            return Err(BettingError::InvalidInput(
                "a poll needs at least two options".to_string(),
            ));
        }

        let created = self
            .polls
            .insert_poll(poll.tournament_id, title, &options)
            .await?;

        log::info!(
            "Created poll {} '{}' with {} options in tournament {}",
            created.id,
            created.title,
            created.options.len(),
            created.tournament_id
        );
        self.events.publish(ChangeEvent::PollCreated {
            tournament_id: created.tournament_id,
            poll_id: created.id,
        });

        Ok(created)
    }

    /// Close or reopen an unresolved poll.
    pub async fn set_active(&self, poll_id: PollId, active: bool) -> BettingResult<BettingPoll> {
        let _guard = self.locks.lock(poll_id).await;
        let mut poll = self.require_poll(poll_id).await?;
        if poll.is_resolved() {
            return Err(BettingError::AlreadyResolved(poll_id));
        }

        if !self.polls.set_poll_active(poll_id, active).await? {
            return Err(BettingError::AlreadyResolved(poll_id));
        }
        poll.is_active = active;

        self.events.publish(ChangeEvent::PollUpdated {
            tournament_id: poll.tournament_id,
            poll_id,
            is_active: active,
        });
        Ok(poll)
    }

    /// Delete an unresolved poll together with its votes.
    pub async fn delete_poll(&self, poll_id: PollId) -> BettingResult<()> {
        let _guard = self.locks.lock(poll_id).await;
        let poll = self.require_poll(poll_id).await?;
        if poll.is_resolved() {
            return Err(BettingError::AlreadyResolved(poll_id));
        }

        if !self.polls.delete_poll(poll_id).await? {
            return Err(BettingError::AlreadyResolved(poll_id));
        }

        log::info!("Deleted poll {} in tournament {}", poll_id, poll.tournament_id);
        self.events.publish(ChangeEvent::PollDeleted {
            tournament_id: poll.tournament_id,
            poll_id,
        });
        Ok(())
    }

    pub async fn poll(&self, poll_id: PollId) -> BettingResult<BettingPoll> {
        self.require_poll(poll_id).await
    }

    /// Polls of a tournament, newest first
    pub async fn polls(&self, tournament_id: TournamentId) -> BettingResult<Vec<BettingPoll>> {
        Ok(self.polls.list_polls(tournament_id).await?)
    }

    /// Place a wager.
    ///
    /// The stake is checked against the available balance under the voter's
    /// lock and reserved by the vote itself; the balance row is untouched
    /// until resolution.
    pub async fn place_vote(&self, vote: NewVote) -> BettingResult<BettingVote> {
        if vote.bet_amount < 0 {
            return Err(LedgerError::InvalidAmount(vote.bet_amount).into());
        }

        let poll_guard = self.locks.lock(vote.poll_id).await;
        let poll = self.require_poll(vote.poll_id).await?;
        let state = poll.state();
        if state != PollState::Open {
            return Err(BettingError::InvalidState {
                poll_id: poll.id,
                state,
            });
        }
        if poll.option(vote.option_id).is_none() {
            return Err(BettingError::InvalidOption {
                poll_id: poll.id,
                option_id: vote.option_id,
            });
        }

        let player_guard = self
            .ledger
            .lock_player(poll.tournament_id, vote.player_id)
            .await;
        let duplicate = BettingError::DuplicateVote {
            poll_id: poll.id,
            player_id: vote.player_id,
        };
        if self
            .votes
            .find_vote(vote.poll_id, vote.player_id)
            .await?
            .is_some()
        {
            return Err(duplicate);
        }

        self.ledger
            .reserve_locked(vote.player_id, poll.tournament_id, vote.bet_amount)
            .await?;

        let placed = match self.votes.insert_vote(&vote).await {
            Ok(placed) => placed,
            Err(StoreError::UniqueViolation(_)) => return Err(duplicate),
            Err(e) => return Err(e.into()),
        };
        drop(player_guard);

        let tallies = tally(&poll, &self.votes.poll_votes(poll.id).await?);
        drop(poll_guard);

        log::info!(
            "Player {} bet {} on option {} of poll {}",
            placed.player_id,
            placed.bet_amount,
            placed.option_id,
            placed.poll_id
        );
        self.events.publish(ChangeEvent::TallyChanged {
            tournament_id: poll.tournament_id,
            poll_id: poll.id,
            tallies,
        });

        Ok(placed)
    }

    /// Resolve a poll and pay out.
    ///
    /// The poll is marked resolved before any money moves, so a second call
    /// fails with `AlreadyResolved` without touching balances. Every voter's
    /// balance is then adjusted by `winnings - bet`. Settlement failures for
    /// individual votes are logged and reported together after the rest
    /// have been applied.
    pub async fn resolve_poll(
        &self,
        poll_id: PollId,
        winning_option_id: OptionId,
    ) -> BettingResult<Resolution> {
        let _poll_guard = self.locks.lock(poll_id).await;
        let mut poll = self.require_poll(poll_id).await?;
        if poll.is_resolved() {
            return Err(BettingError::AlreadyResolved(poll_id));
        }
        if poll.option(winning_option_id).is_none() {
            return Err(BettingError::InvalidOption {
                poll_id,
                option_id: winning_option_id,
            });
        }

        let votes = self.votes.poll_votes(poll_id).await?;
        let _player_guards = self
            .ledger
            .lock_players(
                poll.tournament_id,
                votes.iter().map(|v| v.player_id).collect::<Vec<_>>(),
            )
            .await;

        let resolved_at = Utc::now();
        if !self
            .polls
            .mark_resolved(poll_id, winning_option_id, resolved_at)
            .await?
        {
            return Err(BettingError::AlreadyResolved(poll_id));
        }
        poll.is_active = false;
        poll.resolved_at = Some(resolved_at);
        poll.winning_option_id = Some(winning_option_id);

        let settlements = pari_mutuel(&votes, winning_option_id);
        let mut failed = 0;
        let mut winners = Vec::new();

        for (vote, settlement) in votes.iter().zip(&settlements) {
            if settlement.winnings > 0
                && let Err(e) = self.votes.set_winnings(vote.id, settlement.winnings).await
            {
                log::error!("Failed to record winnings for vote {}: {}", vote.id, e);
                failed += 1;
                continue;
            }

            let delta = settlement.balance_delta();
            if delta != 0
                && let Err(e) = self
                    .ledger
                    .settle_locked(vote.player_id, poll.tournament_id, delta)
                    .await
            {
                log::error!(
                    "Failed to settle {} for player {} on poll {}: {}",
                    delta,
                    vote.player_id,
                    poll_id,
                    e
                );
                failed += 1;
                continue;
            }

            if vote.option_id == winning_option_id && settlement.winnings > 0 {
                winners.push(Winner {
                    player_id: vote.player_id,
                    player_name: self.player_name(vote.player_id).await,
                    bet_amount: vote.bet_amount,
                    winnings: settlement.winnings,
                });
            }
        }

        let total_pool: i64 = votes.iter().map(|v| v.bet_amount).sum();
        let winning_pool: i64 = votes
            .iter()
            .filter(|v| v.option_id == winning_option_id)
            .map(|v| v.bet_amount)
            .sum();

        log::info!(
            "Resolved poll {} on option {}: pool {}, {} winners",
            poll_id,
            winning_option_id,
            total_pool,
            winners.len()
        );

        let settled_votes = self.votes.poll_votes(poll_id).await?;
        self.events.publish(ChangeEvent::TallyChanged {
            tournament_id: poll.tournament_id,
            poll_id,
            tallies: tally(&poll, &settled_votes),
        });
        self.events.publish(ChangeEvent::PollResolved {
            tournament_id: poll.tournament_id,
            poll_id,
            winning_option_id,
            winners: winners.clone(),
        });

        if failed > 0 {
            return Err(BettingError::Settlement { poll_id, failed });
        }

        Ok(Resolution {
            poll,
            winning_option_id,
            total_pool,
            winning_pool,
            winners,
        })
    }

    /// Open polls of a tournament the player has not voted on yet
    pub async fn open_polls_for(
        &self,
        player_id: PlayerId,
        tournament_id: TournamentId,
    ) -> BettingResult<Vec<BettingPoll>> {
        let polls = self.polls.list_polls(tournament_id).await?;
        let voted: Vec<PollId> = self
            .votes
            .player_votes(player_id, tournament_id)
            .await?
            .iter()
            .map(|v| v.poll_id)
            .collect();

        Ok(polls
            .into_iter()
            .filter(|p| p.state() == PollState::Open && !voted.contains(&p.id))
            .collect())
    }

    pub async fn vote_tallies(&self, poll_id: PollId) -> BettingResult<Vec<OptionTally>> {
        let poll = self.require_poll(poll_id).await?;
        let votes = self.votes.poll_votes(poll_id).await?;
        Ok(tally(&poll, &votes))
    }

    /// A player's votes in a tournament with their outcome, newest first
    pub async fn vote_history(
        &self,
        player_id: PlayerId,
        tournament_id: TournamentId,
    ) -> BettingResult<Vec<VoteHistoryEntry>> {
        let polls = self.polls.list_polls(tournament_id).await?;
        let votes = self.votes.player_votes(player_id, tournament_id).await?;

        Ok(votes
            .into_iter()
            .filter_map(|vote| {
                let poll = polls.iter().find(|p| p.id == vote.poll_id)?;
                let option_text = poll
                    .option(vote.option_id)
                    .map(|o| o.text.clone())
                    .unwrap_or_default();
                Some(VoteHistoryEntry {
                    poll_id: poll.id,
                    poll_title: poll.title.clone(),
                    option_id: vote.option_id,
                    option_text,
                    bet_amount: vote.bet_amount,
                    winnings: vote.winnings,
                    won: poll.winning_option_id.map(|w| w == vote.option_id),
                    created_at: vote.created_at,
                })
            })
            .collect())
    }

    /// Add a player to the identity directory. The betting code is stored
    /// normalized; a code already in use is a `Conflict`.
    pub async fn register_player(&self, name: &str, betting_code: Option<&str>) -> BettingResult<Player> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BettingError::InvalidInput("player name is required".to_string()));
        }

        let player = self.players.create_player(name, betting_code).await?;
        log::info!("Registered player {} ({})", player.id, player.name);
        Ok(player)
    }

    /// Look up the player behind a betting code (trimmed, case-insensitive).
    pub async fn authenticate(&self, code: &str) -> BettingResult<Player> {
        let code = normalize_code(code);
        if code.is_empty() {
            return Err(BettingError::InvalidInput("betting code is required".to_string()));
        }

        self.players
            .find_by_code(&code)
            .await?
            .ok_or(BettingError::UnknownCode)
    }

    async fn require_poll(&self, poll_id: PollId) -> BettingResult<BettingPoll> {
        self.polls
            .get_poll(poll_id)
            .await?
            .ok_or(BettingError::PollNotFound(poll_id))
    }

    async fn player_name(&self, player_id: PlayerId) -> String {
        match self.players.find_player(player_id).await {
            Ok(Some(player)) => player.name,
            Ok(None) => format!("Player {player_id}"),
            Err(e) => {
                log::warn!("Failed to look up player {}: {}", player_id, e);
                format!("Player {player_id}")
            }
        }
    }
}
