//! Per-tournament currency balances with active-bet reservation.

use super::errors::{LedgerError, LedgerResult};
use super::models::{BalanceStats, PlayerBalance};
use crate::config::LiveConfig;
use crate::db::{BalanceRepository, StoreError, Stores, VoteRepository};
use crate::events::{ChangeEvent, EventBus};
use crate::players::PlayerId;
use crate::sync::KeyedLocks;
use crate::tournament::models::TournamentId;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

/// Balance ledger
///
/// A bet is never debited when placed; it is reserved by counting it
/// against the available balance until its poll resolves. Checks and
/// settlements for one player run under that player's lock.
#[derive(Clone)]
pub struct BalanceLedger {
    balances: Arc<dyn BalanceRepository>,
    votes: Arc<dyn VoteRepository>,
    events: EventBus,
    locks: Arc<KeyedLocks<(TournamentId, PlayerId)>>,
    starting_balance: i64,
}

impl BalanceLedger {
    /// Create a new balance ledger
    pub fn new(stores: &Stores, events: EventBus, config: &LiveConfig) -> Self {
        Self {
            balances: stores.balances.clone(),
            votes: stores.votes.clone(),
            events,
            locks: Arc::new(KeyedLocks::new()),
            starting_balance: config.starting_balance,
        }
    }

    /// Open a balance for a player. `None` uses the configured default.
    pub async fn grant(
        &self,
        player_id: PlayerId,
        tournament_id: TournamentId,
        starting_balance: Option<i64>,
    ) -> LedgerResult<PlayerBalance> {
        let amount = starting_balance.unwrap_or(self.starting_balance);
        if amount < 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let _guard = self.lock_player(tournament_id, player_id).await;
        let row = match self
            .balances
            .create_balance(player_id, tournament_id, amount)
            .await
        {
            Ok(row) => row,
            Err(StoreError::UniqueViolation(_)) => {
                return Err(LedgerError::AlreadyGranted {
                    player_id,
                    tournament_id,
                });
            }
            Err(e) => return Err(e.into()),
        };

        log::info!(
            "Granted {} to player {} in tournament {}",
            amount,
            player_id,
            tournament_id
        );
        self.events.publish(ChangeEvent::BalanceChanged {
            tournament_id,
            player_id,
        });

        Ok(row)
    }

    /// Return the player's balance, granting the default one if missing.
    pub async fn ensure_balance(
        &self,
        player_id: PlayerId,
        tournament_id: TournamentId,
    ) -> LedgerResult<PlayerBalance> {
        match self.grant(player_id, tournament_id, None).await {
            Err(LedgerError::AlreadyGranted { .. }) => self.balance(player_id, tournament_id).await,
            other => other,
        }
    }

    pub async fn balance(
        &self,
        player_id: PlayerId,
        tournament_id: TournamentId,
    ) -> LedgerResult<PlayerBalance> {
        self.balances
            .get_balance(player_id, tournament_id)
            .await?
            .ok_or(LedgerError::BalanceNotFound {
                player_id,
                tournament_id,
            })
    }

    /// Balance minus bets on unresolved polls.
    pub async fn available_balance(
        &self,
        player_id: PlayerId,
        tournament_id: TournamentId,
    ) -> LedgerResult<i64> {
        let _guard = self.lock_player(tournament_id, player_id).await;
        self.available_locked(player_id, tournament_id).await
    }

    /// Same as [`available_balance`](Self::available_balance) for a caller
    /// that already holds the player's lock.
    pub async fn available_locked(
        &self,
        player_id: PlayerId,
        tournament_id: TournamentId,
    ) -> LedgerResult<i64> {
        let row = self.balance(player_id, tournament_id).await?;
        let active = self.votes.active_bet_total(player_id, tournament_id).await?;
        Ok(row.balance - active)
    }

    /// Fail unless `amount` fits in the available balance. Caller holds the
    /// player's lock.
    pub async fn reserve_locked(
        &self,
        player_id: PlayerId,
        tournament_id: TournamentId,
        amount: i64,
    ) -> LedgerResult<i64> {
        if amount < 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        let available = self.available_locked(player_id, tournament_id).await?;
        if amount > available {
            return Err(LedgerError::InsufficientBalance {
                available,
                required: amount,
            });
        }
        Ok(available - amount)
    }

    /// Apply a settlement delta. Caller holds the player's lock.
    pub async fn settle_locked(
        &self,
        player_id: PlayerId,
        tournament_id: TournamentId,
        delta: i64,
    ) -> LedgerResult<i64> {
        let balance = self
            .balances
            .adjust_balance(player_id, tournament_id, delta)
            .await?
            .ok_or(LedgerError::BalanceNotFound {
                player_id,
                tournament_id,
            })?;

        self.events.publish(ChangeEvent::BalanceChanged {
            tournament_id,
            player_id,
        });
        Ok(balance)
    }

    pub async fn stats(
        &self,
        player_id: PlayerId,
        tournament_id: TournamentId,
    ) -> LedgerResult<BalanceStats> {
        let row = self.balance(player_id, tournament_id).await?;
        let active = self.votes.active_bet_total(player_id, tournament_id).await?;
        let votes = self.votes.player_votes(player_id, tournament_id).await?;

        Ok(BalanceStats {
            current_balance: row.balance,
            starting_balance: row.starting_balance,
            total_active_bets: active,
            available_balance: row.balance - active,
            total_votes: u32::try_from(votes.len()).unwrap_or(u32::MAX),
        })
    }

    pub async fn lock_player(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> OwnedMutexGuard<()> {
        self.locks.lock((tournament_id, player_id)).await
    }

    /// Lock several players of one tournament in ascending ID order.
    pub async fn lock_players(
        &self,
        tournament_id: TournamentId,
        player_ids: impl IntoIterator<Item = PlayerId>,
    ) -> Vec<OwnedMutexGuard<()>> {
        self.locks
            .lock_many(player_ids.into_iter().map(|p| (tournament_id, p)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    fn ledger() -> BalanceLedger {
        BalanceLedger::new(&Stores::memory(), EventBus::new(16), &LiveConfig::default())
    }

    #[tokio::test]
    async fn test_grant_and_read() {
        let ledger = ledger();
        let row = ledger.grant(1, 10, Some(500)).await.unwrap();
        assert_eq!(row.balance, 500);
        assert_eq!(row.starting_balance, 500);
        assert_eq!(ledger.available_balance(1, 10).await.unwrap(), 500);
    }

    #[tokio::test]
    async fn test_double_grant_conflicts() {
        let ledger = ledger();
        ledger.grant(1, 10, None).await.unwrap();
        let err = ledger.grant(1, 10, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let row = ledger.ensure_balance(1, 10).await.unwrap();
        assert_eq!(row.balance, crate::config::DEFAULT_STARTING_BALANCE);
    }

    #[tokio::test]
    async fn test_negative_grant_rejected() {
        let ledger = ledger();
        assert!(matches!(
            ledger.grant(1, 10, Some(-5)).await,
            Err(LedgerError::InvalidAmount(-5))
        ));
    }

    #[tokio::test]
    async fn test_reserve_checks_available() {
        let ledger = ledger();
        ledger.grant(1, 10, Some(100)).await.unwrap();
        let _guard = ledger.lock_player(10, 1).await;

        assert_eq!(ledger.reserve_locked(1, 10, 60).await.unwrap(), 40);
        let err = ledger.reserve_locked(1, 10, 101).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientBalance { available: 100, required: 101 }
        ));
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_settle_missing_balance() {
        let ledger = ledger();
        let err = ledger.settle_locked(3, 10, 50).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.client_message(), "Balance not found");
    }
}
