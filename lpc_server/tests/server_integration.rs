//! Integration tests for the HTTP API over the in-memory store.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use lpc_live::{
    config::LiveConfig,
    db::{MemoryStore, Stores},
    players::Player,
};
use lpc_server::api::{AppState, create_router};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt; // For `oneshot` method

/// Router over fresh in-memory stores, with one player who can vote.
async fn create_test_server() -> axum::Router {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_player(Player {
            id: 500,
            name: "Grace".to_string(),
            betting_code: Some("ace-42".to_string()),
        })
        .await;

    let state = AppState::new(&Stores::from_store(store), LiveConfig::default(), None).await;
    create_router(state)
}

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn register(app: &axum::Router, tournament_id: i64, name: &str, player_id: i64) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        &format!("/api/v1/tournaments/{tournament_id}/entrants"),
        Some(json!({"full_name": name, "player_id": player_id, "buy_in_amount": 150})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().unwrap()
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check_endpoint() {
    let app = create_test_server().await;

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["storage"], "memory");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = create_test_server().await;

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "director-7")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.headers()["x-request-id"], "director-7");
}

// ============================================================================
// Tournament Tests
// ============================================================================

#[tokio::test]
async fn test_elimination_flow_feeds_rankings() {
    let app = create_test_server().await;
    let ada = register(&app, 1, "Ada", 7).await;
    let bob = register(&app, 1, "Bob", 8).await;

    let (status, body) = send(&app, "POST", &format!("/api/v1/entrants/{bob}/eliminate"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["placement"], 2);
    assert_eq!(body["scoring"]["status"], "recorded");

    let (status, body) = send(&app, "POST", &format!("/api/v1/entrants/{ada}/eliminate"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["placement"], 1);

    let (_, entrants) = send(&app, "GET", "/api/v1/tournaments/1/entrants", None).await;
    assert_eq!(entrants["active"].as_array().unwrap().len(), 0);
    // Latest elimination first
    assert_eq!(entrants["eliminated"][0]["full_name"], "Ada");

    let (status, rankings) = send(&app, "GET", "/api/v1/rankings?refresh=true", None).await;
    assert_eq!(status, StatusCode::OK);
    let rankings = rankings.as_array().unwrap();
    assert_eq!(rankings.len(), 2);
    assert_eq!(rankings[0]["rank"], 1);
    assert_eq!(rankings[0]["player_id"], 7);
    assert_eq!(rankings[0]["player_name"], "Ada");

    let (_, limited) = send(&app, "GET", "/api/v1/rankings?limit=1&refresh=true", None).await;
    assert_eq!(limited.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_error_statuses() {
    let app = create_test_server().await;

    let (status, body) = send(&app, "POST", "/api/v1/entrants/999/eliminate", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let ada = register(&app, 2, "Ada", 7).await;
    let (status, _) = send(&app, "POST", &format!("/api/v1/entrants/{ada}/reinstate"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    send(&app, "POST", &format!("/api/v1/entrants/{ada}/eliminate"), None).await;
    let (status, _) = send(&app, "POST", &format!("/api/v1/entrants/{ada}/eliminate"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, "POST", &format!("/api/v1/entrants/{ada}/reinstate"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["placement"].is_null());

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/tournaments/2/entrants",
        Some(json!({"full_name": "   "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Betting Tests
// ============================================================================

#[tokio::test]
async fn test_vote_and_resolve_by_code() {
    let app = create_test_server().await;

    let (status, poll) = send(
        &app,
        "POST",
        "/api/v1/tournaments/3/polls",
        Some(json!({"title": "Who busts first?", "options": ["Ada", "Bob"]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let poll_id = poll["id"].as_i64().unwrap();
    let option_id = poll["options"][0]["id"].as_i64().unwrap();

    // Session grants the starting balance
    let (status, session) = send(
        &app,
        "POST",
        "/api/v1/tournaments/3/voting/session",
        Some(json!({"code": " ACE-42 "})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["player_name"], "Grace");
    assert_eq!(session["stats"]["current_balance"], 1000);
    assert_eq!(session["open_polls"].as_array().unwrap().len(), 1);

    let vote = json!({"code": "ace-42", "option_id": option_id, "bet_amount": 100});
    let (status, _) = send(&app, "POST", &format!("/api/v1/polls/{poll_id}/votes"), Some(vote.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(&app, "POST", &format!("/api/v1/polls/{poll_id}/votes"), Some(vote)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/polls/{poll_id}/votes"),
        Some(json!({"code": "nobody", "option_id": option_id, "bet_amount": 10})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, detail) = send(&app, "GET", &format!("/api/v1/polls/{poll_id}"), None).await;
    assert_eq!(detail["title"], "Who busts first?");
    assert!(detail["tallies"].is_array());

    let (status, resolution) = send(
        &app,
        "POST",
        &format!("/api/v1/polls/{poll_id}/resolve"),
        Some(json!({"winning_option_id": option_id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolution["total_pool"], 100);
    assert_eq!(resolution["winners"][0]["winnings"], 100);

    let (status, _) = send(&app, "DELETE", &format!("/api/v1/polls/{poll_id}"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_registered_player_can_open_voting_session() {
    let state = AppState::new(&Stores::memory(), LiveConfig::default(), None).await;
    let app = create_router(state);

    let (status, player) = send(
        &app,
        "POST",
        "/api/v1/players",
        Some(json!({"name": "Hopper", "betting_code": "Bug-1"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(player["betting_code"], "bug-1");

    let (status, session) = send(
        &app,
        "POST",
        "/api/v1/tournaments/8/voting/session",
        Some(json!({"code": "BUG-1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["player_id"], player["id"]);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/players",
        Some(json!({"name": "Someone Else", "betting_code": "bug-1"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

// ============================================================================
// Timer Tests
// ============================================================================

#[tokio::test]
async fn test_timer_commands() {
    let app = create_test_server().await;

    let (status, snapshot) = send(&app, "GET", "/api/v1/tournaments/4/timer", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["phase"], "stopped");
    assert_eq!(snapshot["state"]["current_level"], 0);

    let (status, snapshot) = send(
        &app,
        "POST",
        "/api/v1/tournaments/4/timer",
        Some(json!({"command": "seek", "seconds": 300})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["state"]["time_remaining"], 300);

    let (_, snapshot) = send(
        &app,
        "POST",
        "/api/v1/tournaments/4/timer",
        Some(json!({"command": "next_level"})),
    )
    .await;
    assert_eq!(snapshot["state"]["current_level"], 1);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/tournaments/4/timer",
        Some(json!({"command": "load_levels", "levels": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
