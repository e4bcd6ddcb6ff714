//! In-process change notifications.
//!
//! Managers publish a [`ChangeEvent`] after every committed mutation.
//! Subscribers get eventually-consistent notifications: a receiver that falls
//! behind skips the oldest events and should re-read from the store.

use crate::betting::models::{OptionId, OptionTally, PollId, Winner};
use crate::players::PlayerId;
use crate::tournament::models::{EntrantId, TournamentId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Coarse grouping of events, used by subscribers to filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Registrations,
    Scores,
    Polls,
    Votes,
    Balances,
}

impl std::str::FromStr for Topic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registrations" => Ok(Topic::Registrations),
            "scores" => Ok(Topic::Scores),
            "polls" => Ok(Topic::Polls),
            "votes" => Ok(Topic::Votes),
            "balances" => Ok(Topic::Balances),
            other => Err(format!("unknown topic: {other}")),
        }
    }
}

/// A committed change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent {
    EntrantRegistered {
        tournament_id: TournamentId,
        entrant_id: EntrantId,
    },
    EntrantUpdated {
        tournament_id: TournamentId,
        entrant_id: EntrantId,
    },
    EntrantEliminated {
        tournament_id: TournamentId,
        entrant_id: EntrantId,
        placement: u32,
    },
    EntrantReinstated {
        tournament_id: TournamentId,
        entrant_id: EntrantId,
    },
    ScoresChanged {
        tournament_id: TournamentId,
    },
    PollCreated {
        tournament_id: TournamentId,
        poll_id: PollId,
    },
    PollUpdated {
        tournament_id: TournamentId,
        poll_id: PollId,
        is_active: bool,
    },
    PollDeleted {
        tournament_id: TournamentId,
        poll_id: PollId,
    },
    TallyChanged {
        tournament_id: TournamentId,
        poll_id: PollId,
        tallies: Vec<OptionTally>,
    },
    PollResolved {
        tournament_id: TournamentId,
        poll_id: PollId,
        winning_option_id: OptionId,
        winners: Vec<Winner>,
    },
    BalanceChanged {
        tournament_id: TournamentId,
        player_id: PlayerId,
    },
}

impl ChangeEvent {
    pub fn tournament_id(&self) -> TournamentId {
        match self {
            ChangeEvent::EntrantRegistered { tournament_id, .. }
            | ChangeEvent::EntrantUpdated { tournament_id, .. }
            | ChangeEvent::EntrantEliminated { tournament_id, .. }
            | ChangeEvent::EntrantReinstated { tournament_id, .. }
            | ChangeEvent::ScoresChanged { tournament_id }
            | ChangeEvent::PollCreated { tournament_id, .. }
            | ChangeEvent::PollUpdated { tournament_id, .. }
            | ChangeEvent::PollDeleted { tournament_id, .. }
            | ChangeEvent::TallyChanged { tournament_id, .. }
            | ChangeEvent::PollResolved { tournament_id, .. }
            | ChangeEvent::BalanceChanged { tournament_id, .. } => *tournament_id,
        }
    }

    pub fn topic(&self) -> Topic {
        match self {
            ChangeEvent::EntrantRegistered { .. } | ChangeEvent::EntrantUpdated { .. } => {
                Topic::Registrations
            }
            ChangeEvent::EntrantEliminated { .. }
            | ChangeEvent::EntrantReinstated { .. }
            | ChangeEvent::ScoresChanged { .. } => Topic::Scores,
            ChangeEvent::PollCreated { .. }
            | ChangeEvent::PollUpdated { .. }
            | ChangeEvent::PollDeleted { .. }
            | ChangeEvent::PollResolved { .. } => Topic::Polls,
            ChangeEvent::TallyChanged { .. } => Topic::Votes,
            ChangeEvent::BalanceChanged { .. } => Topic::Balances,
        }
    }

    /// Whether standings derived from score records may be stale after this
    /// event.
    pub fn affects_standings(&self) -> bool {
        matches!(
            self,
            ChangeEvent::EntrantEliminated { .. }
                | ChangeEvent::EntrantReinstated { .. }
                | ChangeEvent::ScoresChanged { .. }
        )
    }
}

/// Broadcast fan-out of [`ChangeEvent`]s. Cloning shares the channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ChangeEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event, returning how many subscribers will see it.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                log::trace!("No subscribers for {:?} event", event.topic());
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        let sent = bus.publish(ChangeEvent::ScoresChanged { tournament_id: 4 });
        assert_eq!(sent, 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.tournament_id(), 4);
        assert_eq!(event.topic(), Topic::Scores);
        assert!(event.affects_standings());
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new(8);
        assert_eq!(bus.publish(ChangeEvent::ScoresChanged { tournament_id: 1 }), 0);
    }

    #[test]
    fn test_event_json_is_tagged() {
        let event = ChangeEvent::EntrantEliminated {
            tournament_id: 1,
            entrant_id: 9,
            placement: 3,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "entrant_eliminated");
        assert_eq!(json["placement"], 3);
    }

    #[test]
    fn test_poll_resolved_carries_option_id() {
        let winning: OptionId = 12;
        let event = ChangeEvent::PollResolved {
            tournament_id: 2,
            poll_id: 5,
            winning_option_id: winning,
            winners: Vec::new(),
        };
        assert_eq!(event.topic(), Topic::Polls);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "poll_resolved");
        assert_eq!(json["winning_option_id"], 12);
    }
}
