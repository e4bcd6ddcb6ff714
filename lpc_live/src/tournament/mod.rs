//! Tournament registrations, eliminations and prize economics.
//!
//! This module provides:
//! - Entrant registration and retroactive edits
//! - The elimination state machine (eliminate / reinstate) with score
//!   records written as a side effect
//! - Prize pool economics: totals, tiered pools and payout ladders
//!
//! ## Example
//!
//! ```no_run
//! use lpc_live::config::LiveConfig;
//! use lpc_live::db::Stores;
//! use lpc_live::events::EventBus;
//! use lpc_live::tournament::{NewEntrant, TournamentManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = TournamentManager::new(&Stores::memory(), EventBus::default(), &LiveConfig::default());
//!
//!     let ada = manager
//!         .register_entrant(NewEntrant::new(1, "Ada").player(7).buy_in(150))
//!         .await?;
//!     let outcome = manager.eliminate(ada.id).await?;
//!     println!("Ada finished in place {}", outcome.placement);
//!
//!     Ok(())
//! }
//! ```

pub mod economics;
pub mod errors;
pub mod manager;
pub mod models;

pub use economics::{PayoutLine, PayoutStatus, PrizePools, TournamentEconomics};
pub use errors::{TournamentError, TournamentResult};
pub use manager::TournamentManager;
pub use models::{
    BuyInTier, EliminationOutcome, Entrant, EntrantId, EntrantStatus, EntrantUpdate, NewEntrant,
    PayoutPlace, ScoreRecord, ScoringOutcome, TournamentId,
};
