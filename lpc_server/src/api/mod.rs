//! HTTP/WebSocket API for league live operations.
//!
//! The admin, display and voting front-ends talk to this API. Every handler
//! is a thin wrapper over a library manager; errors are mapped to statuses
//! in [`error`].
//!
//! # Modules
//!
//! - [`tournaments`]: Registrations, eliminations, economics and standings
//! - [`betting`]: Polls, votes and the voting session
//! - [`timer`]: The tournament clock
//! - [`websocket`]: Live change events and timer snapshots
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use lpc_live::{config::LiveConfig, db::Stores};
//! use lpc_server::api::{AppState, create_router};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let state = AppState::new(&Stores::memory(), LiveConfig::default(), None).await;
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively; the display screens are served from
//! other origins.

pub mod betting;
pub mod error;
pub mod request_id;
pub mod timer;
pub mod tournaments;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, patch, post},
};
use lpc_live::{
    BalanceLedger, BettingMarket, Database, EventBus, LiveConfig, LiveStandings, Stores,
    TimerRegistry, TournamentManager,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub use error::{ApiError, ErrorResponse};

/// Application state shared across all HTTP handlers and WebSocket connections.
///
/// Cloning is cheap; every manager shares its stores and locks.
#[derive(Clone)]
pub struct AppState {
    pub tournaments: TournamentManager,
    pub market: BettingMarket,
    pub standings: Arc<LiveStandings>,
    pub timers: TimerRegistry,
    pub events: EventBus,
    pub config: Arc<LiveConfig>,
    /// `None` when running on the in-memory store
    pub database: Option<Database>,
}

impl AppState {
    /// Wire the managers over `stores` and start the standings refresher.
    pub async fn new(stores: &Stores, config: LiveConfig, database: Option<Database>) -> Self {
        let events = EventBus::new(config.event_capacity);
        let tournaments = TournamentManager::new(stores, events.clone(), &config);
        let ledger = BalanceLedger::new(stores, events.clone(), &config);
        let market = BettingMarket::new(stores, ledger, events.clone());
        let timers = TimerRegistry::from_config(&config);

        let standings = Arc::new(LiveStandings::new(stores.scores.clone()));
        if let Err(e) = standings.refresh().await {
            tracing::warn!("Initial standings refresh failed: {}", e);
        }
        standings.spawn_refresh(&events);

        Self {
            tournaments,
            market,
            standings,
            timers,
            events,
            config: Arc::new(config),
            database,
        }
    }
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Endpoint Summary
///
/// ```text
/// GET    /health                                        - Health check
/// GET    /ws/{tournament_id}?topics=scores,polls&timer=true - Live updates
///
/// POST   /api/v1/tournaments/{id}/entrants              - Register entrant
/// GET    /api/v1/tournaments/{id}/entrants              - Active and eliminated entrants
/// PATCH  /api/v1/entrants/{id}                          - Edit registration
/// POST   /api/v1/entrants/{id}/eliminate                - Eliminate
/// POST   /api/v1/entrants/{id}/reinstate                - Undo elimination
/// POST   /api/v1/tournaments/{id}/rescore               - Recompute score records
/// GET    /api/v1/tournaments/{id}/economics             - Pools and points projection
/// GET    /api/v1/tournaments/{id}/payouts               - Payout ladder
/// PUT    /api/v1/tournaments/{id}/payouts               - Set payout structure
/// GET    /api/v1/rankings?limit=N                       - Player of the Year standings
///
/// GET    /api/v1/tournaments/{id}/timer                 - Timer snapshot
/// POST   /api/v1/tournaments/{id}/timer                 - Timer command
///
/// POST   /api/v1/players                                - Register player with betting code
/// GET    /api/v1/tournaments/{id}/polls                 - List polls
/// POST   /api/v1/tournaments/{id}/polls                 - Create poll
/// POST   /api/v1/tournaments/{id}/balances              - Grant starting balance
/// POST   /api/v1/tournaments/{id}/voting/session        - Voting page session by code
/// GET    /api/v1/polls/{id}                             - Poll with tallies
/// PATCH  /api/v1/polls/{id}                             - Open or close
/// DELETE /api/v1/polls/{id}                             - Delete unresolved poll
/// POST   /api/v1/polls/{id}/votes                       - Place a vote
/// POST   /api/v1/polls/{id}/resolve                     - Resolve and pay out
/// ```
pub fn create_router(state: AppState) -> Router {
    let root_routes = Router::new()
        .route("/health", get(health_check))
        .route("/ws/{tournament_id}", get(websocket::websocket_handler));

    Router::new()
        .merge(root_routes)
        .nest("/api/v1", create_v1_router())
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router() -> Router<AppState> {
    let tournament_routes = Router::new()
        .route(
            "/tournaments/{tournament_id}/entrants",
            get(tournaments::list_entrants).post(tournaments::register_entrant),
        )
        .route("/entrants/{entrant_id}", patch(tournaments::update_entrant))
        .route("/entrants/{entrant_id}/eliminate", post(tournaments::eliminate))
        .route("/entrants/{entrant_id}/reinstate", post(tournaments::reinstate))
        .route("/tournaments/{tournament_id}/rescore", post(tournaments::rescore))
        .route("/tournaments/{tournament_id}/economics", get(tournaments::economics))
        .route(
            "/tournaments/{tournament_id}/payouts",
            get(tournaments::payout_ladder).put(tournaments::set_payout_structure),
        )
        .route("/rankings", get(tournaments::rankings));

    let timer_routes = Router::new().route(
        "/tournaments/{tournament_id}/timer",
        get(timer::get_timer).post(timer::timer_command),
    );

    let betting_routes = Router::new()
        .route("/players", post(betting::register_player))
        .route(
            "/tournaments/{tournament_id}/polls",
            get(betting::list_polls).post(betting::create_poll),
        )
        .route("/tournaments/{tournament_id}/balances", post(betting::grant_balance))
        .route(
            "/tournaments/{tournament_id}/voting/session",
            post(betting::voting_session),
        )
        .route(
            "/polls/{poll_id}",
            get(betting::get_poll)
                .patch(betting::set_poll_active)
                .delete(betting::delete_poll),
        )
        .route("/polls/{poll_id}/votes", post(betting::place_vote))
        .route("/polls/{poll_id}/resolve", post(betting::resolve_poll));

    Router::new()
        .merge(tournament_routes)
        .merge(timer_routes)
        .merge(betting_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the store is reachable, `503 Service Unavailable`
/// otherwise.
///
/// ```bash
/// curl http://localhost:6969/health
/// # {"status":"healthy","storage":"postgres","database":true,"timers":1,...}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (storage, db_healthy) = match &state.database {
        Some(db) => ("postgres", db.health_check().await.is_ok()),
        None => ("memory", true),
    };

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "storage": storage,
        "database": db_healthy,
        "timers": state.timers.timer_ids().await.len(),
        "event_subscribers": state.events.subscriber_count(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
