//! Virtual currency ("LPC bucks") balances backing the betting market.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{LedgerError, LedgerResult};
pub use manager::BalanceLedger;
pub use models::{BalanceStats, PlayerBalance};
