//! Tournament clock API handlers.
//!
//! One timer per tournament, spawned on first use with the standard blind
//! structure and resumed from its checkpoint after a restart.
//!
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/tournaments/1/timer \
//!   -H "Content-Type: application/json" \
//!   -d '{"command": "seek", "seconds": 300}'
//! ```

use axum::{
    Json,
    extract::{Path, State},
};
use lpc_live::{
    timer::{BlindLevel, TimerCommand, TimerHandle, TimerSnapshot, standard_structure},
    tournament::TournamentId,
};
use serde::Deserialize;

use super::{ApiError, AppState};
use crate::logging;

/// Director command as sent by the admin screen
#[derive(Debug, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum TimerCommandRequest {
    Start,
    Pause,
    Resume,
    Reset,
    NextLevel,
    PrevLevel,
    SetLevel { level: usize },
    Seek { seconds: u32 },
    LoadLevels { levels: Vec<BlindLevel> },
}

impl From<TimerCommandRequest> for TimerCommand {
    fn from(request: TimerCommandRequest) -> Self {
        match request {
            TimerCommandRequest::Start => TimerCommand::Start,
            TimerCommandRequest::Pause => TimerCommand::Pause,
            TimerCommandRequest::Resume => TimerCommand::Resume,
            TimerCommandRequest::Reset => TimerCommand::Reset,
            TimerCommandRequest::NextLevel => TimerCommand::NextLevel,
            TimerCommandRequest::PrevLevel => TimerCommand::PrevLevel,
            TimerCommandRequest::SetLevel { level } => TimerCommand::SetLevel(level),
            TimerCommandRequest::Seek { seconds } => TimerCommand::Seek(seconds),
            TimerCommandRequest::LoadLevels { levels } => TimerCommand::LoadLevels(levels),
        }
    }
}

/// Live timer of a tournament, spawning it if needed
pub async fn timer_for(
    state: &AppState,
    tournament_id: TournamentId,
) -> Result<TimerHandle, ApiError> {
    let blinds = standard_structure(state.config.default_level_secs);
    Ok(state.timers.get_or_spawn(tournament_id, &blinds).await?)
}

pub async fn get_timer(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<TimerSnapshot>, ApiError> {
    let timer = timer_for(&state, tournament_id).await?;
    Ok(Json(timer.snapshot().await?))
}

/// Apply a director command and return the resulting snapshot.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Unknown command
/// - `400 Bad Request`: `load_levels` with an empty structure
pub async fn timer_command(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
    Json(request): Json<TimerCommandRequest>,
) -> Result<Json<TimerSnapshot>, ApiError> {
    if let TimerCommandRequest::LoadLevels { levels } = &request
        && levels.is_empty()
    {
        return Err(ApiError::bad_request("Blind structure must have at least one level"));
    }

    let command = TimerCommand::from(request);
    logging::log_admin_action(&format!("timer {:?}", command), Some(tournament_id), tournament_id);

    let timer = timer_for(&state, tournament_id).await?;
    Ok(Json(timer.command(command).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_payloads() {
        let seek: TimerCommandRequest =
            serde_json::from_str(r#"{"command": "seek", "seconds": 90}"#).unwrap();
        assert_eq!(TimerCommand::from(seek), TimerCommand::Seek(90));

        let next: TimerCommandRequest =
            serde_json::from_str(r#"{"command": "next_level"}"#).unwrap();
        assert_eq!(TimerCommand::from(next), TimerCommand::NextLevel);

        assert!(serde_json::from_str::<TimerCommandRequest>(r#"{"command": "rewind"}"#).is_err());
    }
}
