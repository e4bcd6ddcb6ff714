//! WebSocket feed for live displays.
//!
//! Forwards the library's change events for one tournament, filtered by
//! topic, together with timer snapshots. Clients that fall behind get a
//! `resync` message and should re-fetch over HTTP.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws/{tournament_id}?topics=scores,polls&timer=true`
//! 2. Server subscribes to the event bus (and the timer) before upgrading
//! 3. A send task pushes matching events and timer snapshots
//! 4. The receive loop handles pings and topic changes
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:6969/ws/1?topics=scores&timer=true');
//!
//! ws.onmessage = (event) => {
//!   const data = JSON.parse(event.data);
//!   if (data.kind === "timer") {
//!     renderClock(data.snapshot);
//!   } else if (data.kind === "event" || data.kind === "resync") {
//!     refetchStandings();
//!   }
//! };
//!
//! ws.send(JSON.stringify({ type: "subscribe", topics: ["scores", "polls"] }));
//! ```

use axum::{
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use lpc_live::{
    events::{ChangeEvent, Topic},
    timer::TimerSnapshot,
    tournament::TournamentId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::sync::{broadcast, mpsc, watch};

use super::{AppState, timer::timer_for};
use crate::metrics;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Comma-separated topics; all topics when absent
    #[serde(default)]
    topics: Option<String>,
    /// Stream timer snapshots
    #[serde(default)]
    timer: bool,
}

/// Client messages received via WebSocket
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Ping,
    /// Replace the topic filter
    Subscribe { topics: Vec<Topic> },
}

/// Messages sent to the client
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ServerMessage {
    Event { event: ChangeEvent },
    Timer { snapshot: TimerSnapshot },
    /// Events were dropped; state must be re-read
    Resync { skipped: u64 },
    Pong,
    Error { message: String },
}

/// Instructions from the receive loop to the send task
enum Control {
    Reply(ServerMessage),
    SetTopics(HashSet<Topic>),
}

/// Which events a connection wants
struct EventFilter {
    tournament_id: TournamentId,
    topics: HashSet<Topic>,
}

impl EventFilter {
    fn matches(&self, event: &ChangeEvent) -> bool {
        event.tournament_id() == self.tournament_id
            && (self.topics.is_empty() || self.topics.contains(&event.topic()))
    }
}

/// Parse `topics=scores,polls`. An empty set means every topic.
fn parse_topics(raw: Option<&str>) -> Result<HashSet<Topic>, String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::parse)
        .collect()
}

/// Upgrade HTTP connection to WebSocket for a tournament's live feed.
///
/// # Response
///
/// On success, upgrades connection to WebSocket protocol (101 Switching Protocols).
/// Unknown topics return `400 Bad Request`.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path(tournament_id): Path<TournamentId>,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let topics = match parse_topics(query.topics.as_deref()) {
        Ok(topics) => topics,
        Err(e) => return (StatusCode::BAD_REQUEST, e).into_response(),
    };

    let timer = if query.timer {
        match timer_for(&state, tournament_id).await {
            Ok(handle) => Some(handle.subscribe()),
            Err(e) => return e.into_response(),
        }
    } else {
        None
    };

    // Subscribe before the upgrade so nothing published meanwhile is lost
    let events = state.events.subscribe();
    let filter = EventFilter {
        tournament_id,
        topics,
    };

    ws.on_upgrade(move |socket| handle_socket(socket, filter, events, timer))
}

/// Handle an established WebSocket connection.
async fn handle_socket(
    socket: WebSocket,
    mut filter: EventFilter,
    mut events: broadcast::Receiver<ChangeEvent>,
    mut timer: Option<watch::Receiver<TimerSnapshot>>,
) {
    let (mut sender, mut receiver) = socket.split();
    let tournament_id = filter.tournament_id;

    info!("WebSocket connected: tournament={}", tournament_id);
    metrics::websocket_connections_total();

    let (control_tx, mut control_rx) = mpsc::channel::<Control>(32);

    let mut send_task = tokio::spawn(async move {
        if let Some(rx) = timer.as_mut() {
            let snapshot = rx.borrow_and_update().clone();
            if !send_message(&mut sender, &ServerMessage::Timer { snapshot }).await {
                return;
            }
        }

        loop {
            let message = tokio::select! {
                received = events.recv() => match received {
                    Ok(event) if filter.matches(&event) => ServerMessage::Event { event },
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("WebSocket for tournament {} lagged by {} events", tournament_id, skipped);
                        ServerMessage::Resync { skipped }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },

                snapshot = next_snapshot(&mut timer) => match snapshot {
                    Some(snapshot) => ServerMessage::Timer { snapshot },
                    None => {
                        debug!("Timer for tournament {} stopped", tournament_id);
                        timer = None;
                        continue;
                    }
                },

                Some(control) = control_rx.recv() => match control {
                    Control::Reply(message) => message,
                    Control::SetTopics(topics) => {
                        filter.topics = topics;
                        continue;
                    }
                },
            };

            if !send_message(&mut sender, &message).await {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            let text = match message {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };

            let control = match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Ping) => Control::Reply(ServerMessage::Pong),
                Ok(ClientMessage::Subscribe { topics }) => {
                    Control::SetTopics(topics.into_iter().collect())
                }
                Err(e) => {
                    debug!("Failed to parse client message: {}", e);
                    Control::Reply(ServerMessage::Error {
                        message: "Invalid message format".to_string(),
                    })
                }
            };

            if control_tx.send(control).await.is_err() {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!("WebSocket disconnected: tournament={}", tournament_id);
}

/// Next timer snapshot; never resolves without a timer. `None` once the
/// timer actor has stopped.
async fn next_snapshot(timer: &mut Option<watch::Receiver<TimerSnapshot>>) -> Option<TimerSnapshot> {
    match timer {
        Some(rx) => match rx.changed().await {
            Ok(()) => Some(rx.borrow_and_update().clone()),
            Err(_) => None,
        },
        None => std::future::pending().await,
    }
}

async fn send_message<S>(sender: &mut S, message: &ServerMessage) -> bool
where
    S: futures_util::Sink<Message> + Unpin,
{
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            warn!("Failed to serialize WebSocket message: {}", e);
            return true;
        }
    };

    if sender.send(Message::Text(json.into())).await.is_err() {
        return false;
    }
    metrics::websocket_messages_sent();
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_topics() {
        assert!(parse_topics(None).unwrap().is_empty());
        assert!(parse_topics(Some("")).unwrap().is_empty());

        let topics = parse_topics(Some("scores, polls")).unwrap();
        assert!(topics.contains(&Topic::Scores));
        assert!(topics.contains(&Topic::Polls));
        assert_eq!(topics.len(), 2);

        assert!(parse_topics(Some("scores,weather")).is_err());
    }

    #[test]
    fn test_filter_matches_tournament_and_topic() {
        let filter = EventFilter {
            tournament_id: 1,
            topics: HashSet::from([Topic::Scores]),
        };
        assert!(filter.matches(&ChangeEvent::ScoresChanged { tournament_id: 1 }));
        assert!(!filter.matches(&ChangeEvent::ScoresChanged { tournament_id: 2 }));
        assert!(!filter.matches(&ChangeEvent::PollDeleted {
            tournament_id: 1,
            poll_id: 4,
        }));

        let everything = EventFilter {
            tournament_id: 1,
            topics: HashSet::new(),
        };
        assert!(everything.matches(&ChangeEvent::PollDeleted {
            tournament_id: 1,
            poll_id: 4,
        }));
    }

    #[test]
    fn test_client_messages() {
        let subscribe: ClientMessage =
            serde_json::from_str(r#"{"type": "subscribe", "topics": ["votes"]}"#).unwrap();
        assert!(matches!(subscribe, ClientMessage::Subscribe { topics } if topics == vec![Topic::Votes]));
        assert!(matches!(
            serde_json::from_str::<ClientMessage>(r#"{"type": "ping"}"#).unwrap(),
            ClientMessage::Ping
        ));
    }
}
