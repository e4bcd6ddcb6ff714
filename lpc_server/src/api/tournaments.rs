//! Tournament API handlers.
//!
//! Registrations, the elimination state machine, prize economics and the
//! season leaderboard.
//!
//! # Examples
//!
//! Register an entrant:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/tournaments/1/entrants \
//!   -H "Content-Type: application/json" \
//!   -d '{"full_name": "Ada", "player_id": 7, "buy_in_amount": 150}'
//! ```
//!
//! Eliminate them:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/entrants/12/eliminate
//! ```

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use lpc_live::{
    players::PlayerId,
    rankings::RankingEntry,
    scoring::PointsProjection,
    tournament::{
        BuyInTier, EliminationOutcome, Entrant, EntrantId, EntrantUpdate, NewEntrant,
        PayoutLine, PayoutPlace, PrizePools, ScoreRecord, ScoringOutcome, TournamentEconomics,
        TournamentId,
    },
};
use serde::{Deserialize, Serialize};

use super::{ApiError, AppState};
use crate::{logging, metrics};

#[derive(Debug, Deserialize)]
pub struct RegisterEntrantRequest {
    pub full_name: String,
    #[serde(default)]
    pub player_id: Option<PlayerId>,
    #[serde(default)]
    pub buy_in_amount: Option<i64>,
    #[serde(default)]
    pub rebuy_count: u32,
    #[serde(default)]
    pub addon_count: u32,
    #[serde(default)]
    pub tier: BuyInTier,
    #[serde(default)]
    pub confirmed: Option<bool>,
}

impl RegisterEntrantRequest {
    fn into_new_entrant(self, tournament_id: TournamentId) -> NewEntrant {
        NewEntrant {
            tournament_id,
            player_id: self.player_id,
            full_name: self.full_name,
            buy_in_amount: self.buy_in_amount,
            rebuy_count: self.rebuy_count,
            addon_count: self.addon_count,
            tier: self.tier,
            confirmed: self.confirmed.unwrap_or(true),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EntrantsResponse {
    pub active: Vec<Entrant>,
    /// Latest elimination first
    pub eliminated: Vec<Entrant>,
}

#[derive(Debug, Serialize)]
pub struct EconomicsResponse {
    pub economics: TournamentEconomics,
    pub pools: PrizePools,
    pub projection: PointsProjection,
}

#[derive(Debug, Deserialize)]
pub struct RankingsQuery {
    #[serde(default)]
    pub limit: Option<usize>,
    /// Recompute from the score store before answering
    #[serde(default)]
    pub refresh: bool,
}

/// Register an entrant.
///
/// # Errors
///
/// - `400 Bad Request`: Blank name or negative amounts
pub async fn register_entrant(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
    Json(request): Json<RegisterEntrantRequest>,
) -> Result<(StatusCode, Json<Entrant>), ApiError> {
    let entrant = state
        .tournaments
        .register_entrant(request.into_new_entrant(tournament_id))
        .await?;
    Ok((StatusCode::CREATED, Json(entrant)))
}

/// Active and eliminated entrants of a tournament.
pub async fn list_entrants(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<EntrantsResponse>, ApiError> {
    Ok(Json(EntrantsResponse {
        active: state.tournaments.active_entrants(tournament_id).await?,
        eliminated: state.tournaments.eliminated_entrants(tournament_id).await?,
    }))
}

/// Edit a registration. Scores already recorded are not recomputed; use
/// the rescore endpoint for that.
pub async fn update_entrant(
    State(state): State<AppState>,
    Path(entrant_id): Path<EntrantId>,
    Json(update): Json<EntrantUpdate>,
) -> Result<Json<Entrant>, ApiError> {
    Ok(Json(state.tournaments.update_entrant(entrant_id, update).await?))
}

/// Eliminate an entrant.
///
/// The response carries the placement and whether the score record was
/// written. A failed score write still returns `200 OK`: the elimination
/// stands.
///
/// # Errors
///
/// - `404 Not Found`: Unknown entrant
/// - `409 Conflict`: Entrant already eliminated
pub async fn eliminate(
    State(state): State<AppState>,
    Path(entrant_id): Path<EntrantId>,
) -> Result<Json<EliminationOutcome>, ApiError> {
    let outcome = state.tournaments.eliminate(entrant_id).await?;

    metrics::eliminations_total();
    if let ScoringOutcome::Failed { reason } = &outcome.scoring {
        metrics::scoring_failures_total();
        tracing::warn!(entrant_id, reason = %reason, "Elimination recorded without score");
    }
    logging::log_admin_action(
        "eliminate",
        Some(outcome.entrant.tournament_id),
        entrant_id,
    );

    Ok(Json(outcome))
}

/// Undo an elimination.
///
/// # Errors
///
/// - `409 Conflict`: Entrant is not eliminated
pub async fn reinstate(
    State(state): State<AppState>,
    Path(entrant_id): Path<EntrantId>,
) -> Result<Json<Entrant>, ApiError> {
    let entrant = state.tournaments.reinstate(entrant_id).await?;

    metrics::reinstatements_total();
    logging::log_admin_action("reinstate", Some(entrant.tournament_id), entrant_id);

    Ok(Json(entrant))
}

/// Recompute every score record of a tournament.
pub async fn rescore(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<Vec<ScoreRecord>>, ApiError> {
    let records = state.tournaments.rescore_tournament(tournament_id).await?;
    logging::log_admin_action("rescore", Some(tournament_id), tournament_id);
    Ok(Json(records))
}

pub async fn economics(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<EconomicsResponse>, ApiError> {
    Ok(Json(EconomicsResponse {
        economics: state.tournaments.economics(tournament_id).await?,
        pools: state.tournaments.prize_pools(tournament_id).await?,
        projection: state.tournaments.points_projection(tournament_id).await?,
    }))
}

/// Payout ladder with paid / next / pending status per placement.
pub async fn payout_ladder(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<Vec<PayoutLine>>, ApiError> {
    Ok(Json(state.tournaments.payout_ladder(tournament_id).await?))
}

/// Replace the payout structure.
///
/// # Errors
///
/// - `400 Bad Request`: Duplicate placements or percentages out of range
pub async fn set_payout_structure(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
    Json(places): Json<Vec<PayoutPlace>>,
) -> Result<Json<Vec<PayoutLine>>, ApiError> {
    state
        .tournaments
        .set_payout_structure(tournament_id, places)
        .await?;
    logging::log_admin_action("set_payouts", Some(tournament_id), tournament_id);
    Ok(Json(state.tournaments.payout_ladder(tournament_id).await?))
}

/// Player of the Year standings.
pub async fn rankings(
    State(state): State<AppState>,
    Query(query): Query<RankingsQuery>,
) -> Result<Json<Vec<RankingEntry>>, ApiError> {
    let rankings = if query.refresh {
        state.standings.refresh().await?
    } else {
        state.standings.rankings().await
    };

    let limit = query.limit.unwrap_or(rankings.len());
    Ok(Json(rankings.iter().take(limit).cloned().collect()))
}
