//! Side betting polls settled pari-mutuel in LPC bucks.
//!
//! A poll is OPEN while it accepts votes, CLOSED when an admin pauses it and
//! RESOLVED once a winning option is chosen. Resolution is terminal and pays
//! out exactly once.

pub mod errors;
pub mod market;
pub mod models;
pub mod settlement;

pub use errors::{BettingError, BettingResult};
pub use market::{BettingMarket, Resolution};
pub use models::{
    BettingOption, BettingPoll, BettingVote, NewPoll, NewVote, OptionId, OptionTally, PollId,
    PollState, VoteHistoryEntry, VoteId, Winner,
};
pub use settlement::{Settlement, pari_mutuel};
