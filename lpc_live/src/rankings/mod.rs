//! Player of the Year standings.

pub mod aggregator;
pub mod standings;

pub use aggregator::{RankingEntry, compute_rankings};
pub use standings::LiveStandings;
