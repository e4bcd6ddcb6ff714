//! Elimination workflow and tournament economics.

use super::economics::{self, PayoutLine, PrizePools, Remaining, TournamentEconomics};
use super::errors::{TournamentError, TournamentResult};
use super::models::{
    Entrant, EntrantId, EntrantStatus, EntrantUpdate, EliminationOutcome, NewEntrant, PayoutPlace,
    ScoreRecord, ScoringOutcome, TournamentId,
};
use crate::config::{AddonPolicy, LiveConfig};
use crate::db::{EntrantRepository, PayoutRepository, ScoreRepository, StoreResult, Stores};
use crate::events::{ChangeEvent, EventBus};
use crate::scoring::PointsProjection;
use crate::sync::KeyedLocks;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Tournament manager
///
/// Drives each entrant through ACTIVE → ELIMINATED → ACTIVE and keeps the
/// score records in step. All mutations of one tournament are serialized,
/// so the active count read for a placement cannot race another
/// elimination.
#[derive(Clone)]
pub struct TournamentManager {
    entrants: Arc<dyn EntrantRepository>,
    scores: Arc<dyn ScoreRepository>,
    payouts: Arc<dyn PayoutRepository>,
    events: EventBus,
    locks: Arc<KeyedLocks<TournamentId>>,
    addon_policy: AddonPolicy,
    default_average_buy_in: f64,
}

impl TournamentManager {
    /// Create a new tournament manager
    pub fn new(stores: &Stores, events: EventBus, config: &LiveConfig) -> Self {
        Self {
            entrants: stores.entrants.clone(),
            scores: stores.scores.clone(),
            payouts: stores.payouts.clone(),
            events,
            locks: Arc::new(KeyedLocks::new()),
            addon_policy: config.addon_policy,
            default_average_buy_in: config.default_average_buy_in,
        }
    }

    /// Register an entrant
    pub async fn register_entrant(&self, entrant: NewEntrant) -> TournamentResult<Entrant> {
        let mut entrant = entrant;
        entrant.full_name = entrant.full_name.trim().to_string();
        if entrant.full_name.is_empty() {
            return Err(TournamentError::InvalidInput("name must not be blank".to_string()));
        }
        validate_buy_in(entrant.buy_in_amount)?;

        let _guard = self.locks.lock(entrant.tournament_id).await;
        let created = self.entrants.insert_entrant(&entrant).await?;

        log::info!(
            "Registered entrant {} ({}) in tournament {}",
            created.id,
            created.full_name,
            created.tournament_id
        );
        self.events.publish(ChangeEvent::EntrantRegistered {
            tournament_id: created.tournament_id,
            entrant_id: created.id,
        });

        Ok(created)
    }

    /// Edit a registration's buy-in, rebuys, add-ons, tier or confirmation.
    ///
    /// Existing score records are not rewritten; use
    /// [`rescore_tournament`](Self::rescore_tournament) for that.
    pub async fn update_entrant(
        &self,
        entrant_id: EntrantId,
        update: EntrantUpdate,
    ) -> TournamentResult<Entrant> {
        if let Some(name) = &update.full_name
            && name.trim().is_empty()
        {
            return Err(TournamentError::InvalidInput("name must not be blank".to_string()));
        }
        validate_buy_in(update.buy_in_amount)?;

        let tournament_id = self.require_entrant(entrant_id).await?.tournament_id;
        let _guard = self.locks.lock(tournament_id).await;

        let mut entrant = self.require_entrant(entrant_id).await?;
        update.apply(&mut entrant);
        entrant.full_name = entrant.full_name.trim().to_string();
        self.entrants.save_entrant(&entrant).await?;

        self.events.publish(ChangeEvent::EntrantUpdated {
            tournament_id,
            entrant_id,
        });

        Ok(entrant)
    }

    /// Eliminate an active entrant.
    ///
    /// The placement is the number of entrants still active, this one
    /// included. The score record is written afterwards; if that write
    /// fails the elimination stands and the failure is reported in the
    /// outcome.
    pub async fn eliminate(&self, entrant_id: EntrantId) -> TournamentResult<EliminationOutcome> {
        let tournament_id = self.require_entrant(entrant_id).await?.tournament_id;
        let _guard = self.locks.lock(tournament_id).await;

        let mut entrant = self.require_entrant(entrant_id).await?;
        ensure_status(&entrant, EntrantStatus::Active)?;

        let roster = self.entrants.list_entrants(tournament_id).await?;
        let active = roster.iter().filter(|e| e.is_active()).count();
        let placement = u32::try_from(active).unwrap_or(u32::MAX).max(1);
        let eliminated_at = Utc::now();

        self.entrants
            .set_elimination(entrant_id, Some(eliminated_at), Some(placement))
            .await?;
        entrant.eliminated_at = Some(eliminated_at);
        entrant.placement = Some(placement);

        log::info!(
            "Eliminated {} from tournament {} in place {}",
            entrant.full_name,
            tournament_id,
            placement
        );

        let scoring = match entrant.player_id {
            None => {
                log::info!(
                    "Entrant {} has no linked player, skipping score record",
                    entrant_id
                );
                ScoringOutcome::SkippedNoPlayer
            }
            Some(_) => match self.record_score(&entrant, &roster, eliminated_at).await {
                Ok(record) => ScoringOutcome::Recorded { record },
                Err(e) => {
                    log::error!(
                        "Failed to record score for entrant {} in tournament {}: {}",
                        entrant_id,
                        tournament_id,
                        e
                    );
                    ScoringOutcome::Failed {
                        reason: e.client_message(),
                    }
                }
            },
        };

        self.events.publish(ChangeEvent::EntrantEliminated {
            tournament_id,
            entrant_id,
            placement,
        });
        if matches!(scoring, ScoringOutcome::Recorded { .. }) {
            self.events
                .publish(ChangeEvent::ScoresChanged { tournament_id });
        }

        Ok(EliminationOutcome {
            entrant,
            placement,
            scoring,
        })
    }

    /// Return an eliminated entrant to play and drop their score record.
    pub async fn reinstate(&self, entrant_id: EntrantId) -> TournamentResult<Entrant> {
        let tournament_id = self.require_entrant(entrant_id).await?.tournament_id;
        let _guard = self.locks.lock(tournament_id).await;

        let mut entrant = self.require_entrant(entrant_id).await?;
        ensure_status(&entrant, EntrantStatus::Eliminated)?;

        if let Some(player_id) = entrant.player_id {
            let existed = self.scores.delete_score(tournament_id, player_id).await?;
            if !existed {
                log::warn!(
                    "No score record for player {} in tournament {} while reinstating",
                    player_id,
                    tournament_id
                );
            }
        }

        self.entrants.set_elimination(entrant_id, None, None).await?;
        entrant.eliminated_at = None;
        entrant.placement = None;

        log::info!(
            "Reinstated {} in tournament {}",
            entrant.full_name,
            tournament_id
        );
        self.events.publish(ChangeEvent::EntrantReinstated {
            tournament_id,
            entrant_id,
        });
        self.events.publish(ChangeEvent::ScoresChanged { tournament_id });

        Ok(entrant)
    }

    /// Recompute every score record of a tournament from its current
    /// economics and payout structure.
    pub async fn rescore_tournament(&self, tournament_id: TournamentId) -> TournamentResult<Vec<ScoreRecord>> {
        let _guard = self.locks.lock(tournament_id).await;

        let roster = self.entrants.list_entrants(tournament_id).await?;
        let economics = self.economics_of(tournament_id, &roster);
        let pools = PrizePools::from_entrants(&roster, self.addon_policy);
        let structure = self.payouts.payout_structure(tournament_id).await?;
        let now = Utc::now();

        let mut records = Vec::new();
        for entrant in roster.iter().filter(|e| !e.is_active()) {
            let (Some(player_id), Some(placement)) = (entrant.player_id, entrant.placement) else {
                continue;
            };
            let record = ScoreRecord {
                tournament_id,
                player_id,
                player_name: entrant.full_name.clone(),
                placement,
                points: economics.points_for(placement),
                earnings: economics::earnings_for(
                    &structure,
                    pools,
                    placement,
                    economics::premium_placement(&roster, entrant),
                ),
                rebuy_count: entrant.rebuy_count,
                addon_count: entrant.addon_count,
                recorded_at: now,
            };
            self.scores.upsert_score(&record).await?;
            records.push(record);
        }

        log::info!(
            "Rescored {} records in tournament {}",
            records.len(),
            tournament_id
        );
        self.events.publish(ChangeEvent::ScoresChanged { tournament_id });

        Ok(records)
    }

    /// All registrations of a tournament
    pub async fn entrants(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Entrant>> {
        Ok(self.entrants.list_entrants(tournament_id).await?)
    }

    /// Entrants still in play
    pub async fn active_entrants(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Entrant>> {
        let mut entrants = self.entrants(tournament_id).await?;
        entrants.retain(Entrant::is_active);
        Ok(entrants)
    }

    /// Eliminated entrants, most recent elimination first
    pub async fn eliminated_entrants(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Entrant>> {
        let mut entrants = self.entrants(tournament_id).await?;
        entrants.retain(|e| !e.is_active());
        entrants.sort_by_key(|e| e.placement);
        Ok(entrants)
    }

    pub async fn economics(&self, tournament_id: TournamentId) -> TournamentResult<TournamentEconomics> {
        let roster = self.entrants.list_entrants(tournament_id).await?;
        Ok(self.economics_of(tournament_id, &roster))
    }

    pub async fn prize_pools(&self, tournament_id: TournamentId) -> TournamentResult<PrizePools> {
        let roster = self.entrants.list_entrants(tournament_id).await?;
        Ok(PrizePools::from_entrants(&roster, self.addon_policy))
    }

    /// Best and worst points still reachable by an entrant in play
    pub async fn points_projection(&self, tournament_id: TournamentId) -> TournamentResult<PointsProjection> {
        let roster = self.entrants.list_entrants(tournament_id).await?;
        let economics = self.economics_of(tournament_id, &roster);
        let active = roster.iter().filter(|e| e.is_active()).count();

        Ok(PointsProjection::compute(
            u32::try_from(active).unwrap_or(u32::MAX),
            economics.total_players,
            economics.total_prize_pool,
            economics.average_buy_in,
        ))
    }

    /// Replace the payout structure. Existing score records keep their
    /// earnings until the tournament is rescored.
    pub async fn set_payout_structure(
        &self,
        tournament_id: TournamentId,
        places: Vec<PayoutPlace>,
    ) -> TournamentResult<()> {
        economics::validate_structure(&places).map_err(TournamentError::InvalidInput)?;
        self.payouts
            .set_payout_structure(tournament_id, &places)
            .await?;
        log::info!(
            "Set {} payout places for tournament {}",
            places.len(),
            tournament_id
        );
        Ok(())
    }

    pub async fn payout_structure(&self, tournament_id: TournamentId) -> TournamentResult<Vec<PayoutPlace>> {
        Ok(self.payouts.payout_structure(tournament_id).await?)
    }

    /// Payout amounts per placement with paid / next markers, overall and
    /// within the premium tier
    pub async fn payout_ladder(&self, tournament_id: TournamentId) -> TournamentResult<Vec<PayoutLine>> {
        let roster = self.entrants.list_entrants(tournament_id).await?;
        let structure = self.payouts.payout_structure(tournament_id).await?;
        let pools = PrizePools::from_entrants(&roster, self.addon_policy);

        Ok(economics::payout_ladder(
            &structure,
            pools,
            Remaining::of(&roster),
        ))
    }

    async fn require_entrant(&self, entrant_id: EntrantId) -> TournamentResult<Entrant> {
        self.entrants
            .get_entrant(entrant_id)
            .await?
            .ok_or(TournamentError::EntrantNotFound(entrant_id))
    }

    fn economics_of(&self, tournament_id: TournamentId, roster: &[Entrant]) -> TournamentEconomics {
        TournamentEconomics::from_entrants(
            tournament_id,
            roster,
            self.addon_policy,
            self.default_average_buy_in,
        )
    }

    async fn record_score(
        &self,
        entrant: &Entrant,
        roster: &[Entrant],
        recorded_at: DateTime<Utc>,
    ) -> StoreResult<ScoreRecord> {
        let tournament_id = entrant.tournament_id;
        let placement = entrant.placement.unwrap_or_default();
        let economics = self.economics_of(tournament_id, roster);
        let pools = PrizePools::from_entrants(roster, self.addon_policy);
        let structure = self.payouts.payout_structure(tournament_id).await?;

        let record = ScoreRecord {
            tournament_id,
            player_id: entrant.player_id.unwrap_or_default(),
            player_name: entrant.full_name.clone(),
            placement,
            points: economics.points_for(placement),
            earnings: economics::earnings_for(
                &structure,
                pools,
                placement,
                economics::premium_placement(roster, entrant),
            ),
            rebuy_count: entrant.rebuy_count,
            addon_count: entrant.addon_count,
            recorded_at,
        };
        self.scores.upsert_score(&record).await?;

        Ok(record)
    }
}

fn ensure_status(entrant: &Entrant, expected: EntrantStatus) -> TournamentResult<()> {
    let actual = entrant.status();
    if actual != expected {
        return Err(TournamentError::InvalidState {
            entrant_id: entrant.id,
            expected,
            actual,
        });
    }
    Ok(())
}

fn validate_buy_in(amount: Option<i64>) -> TournamentResult<()> {
    match amount {
        Some(a) if a < 0 => Err(TournamentError::InvalidInput(format!(
            "buy-in must not be negative: {a}"
        ))),
        _ => Ok(()),
    }
}
