//! # LPC Live
//!
//! Live operations for a home poker league: registrations and eliminations,
//! Player of the Year standings, the blind-level clock and a side betting
//! market played with virtual currency.
//!
//! ## Core Modules
//!
//! - [`tournament`]: Entrant registration, the elimination state machine and
//!   prize pool economics
//! - [`scoring`]: The placement points formula
//! - [`rankings`]: Season standings aggregated from score records
//! - [`timer`]: Blind-level timer engine and its actor
//! - [`betting`]: Pari-mutuel betting polls
//! - [`ledger`]: Per-tournament LPC bucks balances
//! - [`db`]: Repository traits with PostgreSQL and in-memory stores
//! - [`events`]: Change notifications for live displays
//!
//! ## Example
//!
//! ```
//! use lpc_live::scoring;
//!
//! // Winner of a ten-player, 1500-chip event
//! let points = scoring::points(1, 10, 1500, 150.0);
//! assert!(points > 0.0);
//! ```

pub mod betting;
pub mod config;
pub mod db;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod players;
pub mod rankings;
pub mod scoring;
pub mod sync;
pub mod timer;
pub mod tournament;

pub use betting::{BettingError, BettingMarket};
pub use config::{AddonPolicy, LiveConfig};
pub use db::{Database, DatabaseConfig, MemoryStore, PgStore, Stores};
pub use errors::ErrorKind;
pub use events::{ChangeEvent, EventBus, Topic};
pub use ledger::{BalanceLedger, LedgerError};
pub use rankings::{LiveStandings, RankingEntry, compute_rankings};
pub use timer::{TimerEngine, TimerError, TimerRegistry};
pub use tournament::{TournamentError, TournamentManager};
