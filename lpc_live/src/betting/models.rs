//! Betting poll data models.

use crate::players::PlayerId;
use crate::tournament::models::TournamentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Poll ID type
pub type PollId = i64;

/// Option ID type
pub type OptionId = i64;

/// Vote ID type
pub type VoteId = i64;

/// Lifecycle state of a poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollState {
    /// Accepting votes
    Open,
    /// Deactivated but not resolved; can be reopened
    Closed,
    /// Terminal
    Resolved,
}

/// One answer of a poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BettingOption {
    pub id: OptionId,
    pub poll_id: PollId,
    pub text: String,
    pub display_order: i32,
}

/// A betting poll.
///
/// `winning_option_id` and `resolved_at` are set together, and a resolved
/// poll is never active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BettingPoll {
    pub id: PollId,
    pub tournament_id: TournamentId,
    pub title: String,
    pub options: Vec<BettingOption>,
    pub is_active: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub winning_option_id: Option<OptionId>,
    pub created_at: DateTime<Utc>,
}

impl BettingPoll {
    pub fn state(&self) -> PollState {
        if self.resolved_at.is_some() {
            PollState::Resolved
        } else if self.is_active {
            PollState::Open
        } else {
            PollState::Closed
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }

    pub fn option(&self, option_id: OptionId) -> Option<&BettingOption> {
        self.options.iter().find(|o| o.id == option_id)
    }
}

/// Request to create a poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPoll {
    pub tournament_id: TournamentId,
    pub title: String,
    pub options: Vec<String>,
}

/// A placed wager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BettingVote {
    pub id: VoteId,
    pub poll_id: PollId,
    pub player_id: PlayerId,
    pub option_id: OptionId,
    pub bet_amount: i64,
    /// Zero until the poll is resolved
    pub winnings: i64,
    pub created_at: DateTime<Utc>,
}

/// Request to place a wager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVote {
    pub poll_id: PollId,
    pub player_id: PlayerId,
    pub option_id: OptionId,
    pub bet_amount: i64,
}

/// Votes and money on one option, always recomputed from the votes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionTally {
    pub option_id: OptionId,
    pub option_text: String,
    pub vote_count: u32,
    pub total_bet_amount: i64,
}

/// Tally every option of `poll` over `votes`, in display order.
pub fn tally(poll: &BettingPoll, votes: &[BettingVote]) -> Vec<OptionTally> {
    let mut options: Vec<&BettingOption> = poll.options.iter().collect();
    options.sort_by_key(|o| (o.display_order, o.id));

    options
        .into_iter()
        .map(|option| {
            let on_option = votes.iter().filter(|v| v.option_id == option.id);
            let (count, total) = on_option.fold((0u32, 0i64), |(c, t), v| (c + 1, t + v.bet_amount));
            OptionTally {
                option_id: option.id,
                option_text: option.text.clone(),
                vote_count: count,
                total_bet_amount: total,
            }
        })
        .collect()
}

/// A paid-out voter on a resolved poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winner {
    pub player_id: PlayerId,
    pub player_name: String,
    pub bet_amount: i64,
    pub winnings: i64,
}

/// A player's vote joined with its poll, for the voting page history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteHistoryEntry {
    pub poll_id: PollId,
    pub poll_title: String,
    pub option_id: OptionId,
    pub option_text: String,
    pub bet_amount: i64,
    pub winnings: i64,
    /// `None` while the poll is unresolved
    pub won: Option<bool>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll() -> BettingPoll {
        BettingPoll {
            id: 1,
            tournament_id: 1,
            title: "Who busts next?".to_string(),
            options: vec![
                BettingOption { id: 11, poll_id: 1, text: "B".to_string(), display_order: 1 },
                BettingOption { id: 10, poll_id: 1, text: "A".to_string(), display_order: 0 },
            ],
            is_active: true,
            resolved_at: None,
            winning_option_id: None,
            created_at: Utc::now(),
        }
    }

    fn vote(id: VoteId, option_id: OptionId, amount: i64) -> BettingVote {
        BettingVote {
            id,
            poll_id: 1,
            player_id: id,
            option_id,
            bet_amount: amount,
            winnings: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_state_transitions() {
        let mut p = poll();
        assert_eq!(p.state(), PollState::Open);
        p.is_active = false;
        assert_eq!(p.state(), PollState::Closed);
        p.resolved_at = Some(Utc::now());
        p.winning_option_id = Some(10);
        assert_eq!(p.state(), PollState::Resolved);
    }

    #[test]
    fn test_tally_in_display_order_with_empty_options() {
        let tallies = tally(&poll(), &[vote(1, 10, 100), vote(2, 10, 200)]);
        assert_eq!(tallies.len(), 2);
        assert_eq!(tallies[0].option_text, "A");
        assert_eq!(tallies[0].vote_count, 2);
        assert_eq!(tallies[0].total_bet_amount, 300);
        assert_eq!(tallies[1].vote_count, 0);
        assert_eq!(tallies[1].total_bet_amount, 0);
    }
}
