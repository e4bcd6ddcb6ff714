//! Betting API handlers.
//!
//! Admin endpoints manage polls; the voting page identifies players by
//! their betting code, which is sent with every vote.
//!
//! # Examples
//!
//! Register a player with a betting code:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/players \
//!   -H "Content-Type: application/json" \
//!   -d '{"name": "Grace", "betting_code": "ACE-42"}'
//! ```
//!
//! Open a voting session:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/tournaments/1/voting/session \
//!   -H "Content-Type: application/json" \
//!   -d '{"code": "ACE-42"}'
//! ```
//!
//! Place a vote:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/polls/3/votes \
//!   -H "Content-Type: application/json" \
//!   -d '{"code": "ACE-42", "option_id": 9, "bet_amount": 100}'
//! ```

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use lpc_live::{
    betting::{
        BettingPoll, BettingVote, NewPoll, NewVote, OptionId, OptionTally, PollId, Resolution,
        VoteHistoryEntry,
    },
    ledger::{BalanceStats, PlayerBalance},
    players::{Player, PlayerId},
    tournament::TournamentId,
};
use serde::{Deserialize, Serialize};

use super::{ApiError, AppState};
use crate::{logging, metrics};

#[derive(Debug, Deserialize)]
pub struct CreatePollRequest {
    pub title: String,
    pub options: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub code: String,
    pub option_id: OptionId,
    pub bet_amount: i64,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub winning_option_id: OptionId,
}

#[derive(Debug, Deserialize)]
pub struct GrantRequest {
    pub player_id: PlayerId,
    /// Defaults to the configured starting balance
    #[serde(default)]
    pub starting_balance: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterPlayerRequest {
    pub name: String,
    #[serde(default)]
    pub betting_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct PollResponse {
    #[serde(flatten)]
    pub poll: BettingPoll,
    pub tallies: Vec<OptionTally>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub player_id: PlayerId,
    pub player_name: String,
    pub stats: BalanceStats,
    /// Open polls the player has not voted on yet
    pub open_polls: Vec<BettingPoll>,
    pub history: Vec<VoteHistoryEntry>,
}

pub async fn create_poll(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
    Json(request): Json<CreatePollRequest>,
) -> Result<(StatusCode, Json<BettingPoll>), ApiError> {
    let poll = state
        .market
        .create_poll(NewPoll {
            tournament_id,
            title: request.title,
            options: request.options,
        })
        .await?;
    logging::log_admin_action("create_poll", Some(tournament_id), poll.id);
    Ok((StatusCode::CREATED, Json(poll)))
}

/// Polls of a tournament, newest first
pub async fn list_polls(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<Vec<BettingPoll>>, ApiError> {
    Ok(Json(state.market.polls(tournament_id).await?))
}

/// A poll with its live tallies
pub async fn get_poll(
    State(state): State<AppState>,
    Path(poll_id): Path<PollId>,
) -> Result<Json<PollResponse>, ApiError> {
    let poll = state.market.poll(poll_id).await?;
    let tallies = state.market.vote_tallies(poll_id).await?;
    Ok(Json(PollResponse { poll, tallies }))
}

/// Close or reopen a poll.
///
/// # Errors
///
/// - `409 Conflict`: Poll already resolved
pub async fn set_poll_active(
    State(state): State<AppState>,
    Path(poll_id): Path<PollId>,
    Json(request): Json<SetActiveRequest>,
) -> Result<Json<BettingPoll>, ApiError> {
    let poll = state.market.set_active(poll_id, request.is_active).await?;
    logging::log_admin_action(
        if request.is_active { "open_poll" } else { "close_poll" },
        Some(poll.tournament_id),
        poll_id,
    );
    Ok(Json(poll))
}

pub async fn delete_poll(
    State(state): State<AppState>,
    Path(poll_id): Path<PollId>,
) -> Result<StatusCode, ApiError> {
    state.market.delete_poll(poll_id).await?;
    logging::log_admin_action("delete_poll", None, poll_id);
    Ok(StatusCode::NO_CONTENT)
}

/// Place a vote on behalf of the player owning `code`.
///
/// # Errors
///
/// - `404 Not Found`: Unknown code, unknown poll or no balance yet
/// - `409 Conflict`: Poll closed or resolved, or the player already voted
/// - `400 Bad Request`: Option not in poll, negative or unaffordable bet
pub async fn place_vote(
    State(state): State<AppState>,
    Path(poll_id): Path<PollId>,
    Json(request): Json<VoteRequest>,
) -> Result<(StatusCode, Json<BettingVote>), ApiError> {
    let player = state.market.authenticate(&request.code).await?;
    let vote = state
        .market
        .place_vote(NewVote {
            poll_id,
            player_id: player.id,
            option_id: request.option_id,
            bet_amount: request.bet_amount,
        })
        .await?;

    metrics::votes_total();
    metrics::bet_size(vote.bet_amount);

    Ok((StatusCode::CREATED, Json(vote)))
}

/// Resolve a poll and settle every vote.
///
/// # Errors
///
/// - `409 Conflict`: Already resolved
/// - `503 Service Unavailable`: Resolved, but some balances could not be
///   settled
pub async fn resolve_poll(
    State(state): State<AppState>,
    Path(poll_id): Path<PollId>,
    Json(request): Json<ResolveRequest>,
) -> Result<Json<Resolution>, ApiError> {
    let resolution = state
        .market
        .resolve_poll(poll_id, request.winning_option_id)
        .await?;

    metrics::polls_resolved_total();
    logging::log_admin_action("resolve_poll", Some(resolution.poll.tournament_id), poll_id);

    Ok(Json(resolution))
}

/// Add a player to the identity directory so they can vote with their
/// betting code.
///
/// # Errors
///
/// - `400 Bad Request`: Blank name
/// - `409 Conflict`: Betting code already in use
pub async fn register_player(
    State(state): State<AppState>,
    Json(request): Json<RegisterPlayerRequest>,
) -> Result<(StatusCode, Json<Player>), ApiError> {
    let player = state
        .market
        .register_player(&request.name, request.betting_code.as_deref())
        .await?;
    logging::log_admin_action("register_player", None, player.id);
    Ok((StatusCode::CREATED, Json(player)))
}

/// Give a player their starting balance for a tournament.
///
/// # Errors
///
/// - `409 Conflict`: Balance already granted
pub async fn grant_balance(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
    Json(request): Json<GrantRequest>,
) -> Result<(StatusCode, Json<PlayerBalance>), ApiError> {
    let balance = state
        .market
        .ledger()
        .grant(request.player_id, tournament_id, request.starting_balance)
        .await?;
    logging::log_admin_action("grant_balance", Some(tournament_id), request.player_id);
    Ok((StatusCode::CREATED, Json(balance)))
}

/// Everything the voting page shows after a player enters their code.
///
/// A player without a balance in this tournament is granted the default
/// starting balance.
pub async fn voting_session(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
    Json(request): Json<SessionRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let player = state.market.authenticate(&request.code).await?;
    let ledger = state.market.ledger();
    ledger.ensure_balance(player.id, tournament_id).await?;

    Ok(Json(SessionResponse {
        player_id: player.id,
        player_name: player.name,
        stats: ledger.stats(player.id, tournament_id).await?,
        open_polls: state.market.open_polls_for(player.id, tournament_id).await?,
        history: state.market.vote_history(player.id, tournament_id).await?,
    }))
}
