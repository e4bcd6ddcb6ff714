//! WebSocket feed tests against a real listener.

use futures_util::{SinkExt, StreamExt};
use lpc_live::{config::LiveConfig, db::Stores, events::Topic, tournament::NewEntrant};
use lpc_server::api::{AppState, create_router};
use serde_json::Value;
use std::time::Duration;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};

type Socket = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn spawn_server() -> (String, AppState) {
    let state = AppState::new(&Stores::memory(), LiveConfig::default(), None).await;
    let app = create_router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("ws://{addr}"), state)
}

async fn next_json(socket: &mut Socket) -> Value {
    loop {
        let message = timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for message")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(text) = message {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

#[tokio::test]
async fn test_events_are_filtered_by_tournament_and_topic() {
    let (base, state) = spawn_server().await;
    let (mut socket, _) = connect_async(format!("{base}/ws/1?topics=registrations"))
        .await
        .unwrap();

    // Another tournament and another topic are not forwarded
    state
        .tournaments
        .register_entrant(NewEntrant::new(2, "Elsewhere"))
        .await
        .unwrap();
    state.events.publish(lpc_live::ChangeEvent::ScoresChanged { tournament_id: 1 });

    let ada = state
        .tournaments
        .register_entrant(NewEntrant::new(1, "Ada"))
        .await
        .unwrap();

    let message = next_json(&mut socket).await;
    assert_eq!(message["kind"], "event");
    assert_eq!(message["event"]["type"], "entrant_registered");
    assert_eq!(message["event"]["entrant_id"], ada.id);
}

#[tokio::test]
async fn test_timer_snapshot_and_ping() {
    let (base, _state) = spawn_server().await;
    let (mut socket, _) = connect_async(format!("{base}/ws/9?timer=true")).await.unwrap();

    let initial = next_json(&mut socket).await;
    assert_eq!(initial["kind"], "timer");
    assert_eq!(initial["snapshot"]["timer_id"], 9);

    socket
        .send(Message::text(r#"{"type": "ping"}"#))
        .await
        .unwrap();
    assert_eq!(next_json(&mut socket).await["kind"], "pong");

    socket.send(Message::text("not json")).await.unwrap();
    assert_eq!(next_json(&mut socket).await["kind"], "error");
}

#[tokio::test]
async fn test_subscribe_replaces_topics() {
    let (base, state) = spawn_server().await;
    let (mut socket, _) = connect_async(format!("{base}/ws/5?topics=polls")).await.unwrap();

    let subscribe = serde_json::json!({"type": "subscribe", "topics": [Topic::Scores]});
    socket.send(Message::text(subscribe.to_string())).await.unwrap();
    // Round-trip a ping so the new filter is in place before publishing
    socket.send(Message::text(r#"{"type": "ping"}"#)).await.unwrap();
    assert_eq!(next_json(&mut socket).await["kind"], "pong");

    state.events.publish(lpc_live::ChangeEvent::ScoresChanged { tournament_id: 5 });

    let message = next_json(&mut socket).await;
    assert_eq!(message["event"]["type"], "scores_changed");
}

#[tokio::test]
async fn test_unknown_topic_is_rejected() {
    let (base, _state) = spawn_server().await;
    assert!(connect_async(format!("{base}/ws/1?topics=weather")).await.is_err());
}
