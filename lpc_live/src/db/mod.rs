//! Storage: repository traits and their implementations.
//!
//! [`Database`] manages the PostgreSQL connection pool. [`Stores`] bundles
//! one handle per repository trait so managers can be wired from either a
//! [`PgStore`] or a [`MemoryStore`].

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use std::time::Duration;

pub mod config;
pub mod memory;
pub mod postgres;
pub mod repository;
pub mod timeouts;

pub use config::DatabaseConfig;
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use repository::{
    BalanceRepository, EntrantRepository, PayoutRepository, PlayerDirectory, PollRepository,
    ScoreRepository, StoreError, StoreResult, VoteRepository,
};
pub use timeouts::QueryTimeouts;

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
    timeouts: QueryTimeouts,
}

impl Database {
    /// Create a new database connection pool
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use lpc_live::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), sqlx::Error> {
    ///     let config = DatabaseConfig::from_env();
    ///     let db = Database::new(&config).await?;
    ///     db.health_check().await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        Ok(Self {
            pool,
            timeouts: QueryTimeouts::from(config),
        })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// A store over this pool using the configured timeouts
    pub fn store(&self) -> PgStore {
        PgStore::with_timeouts(self.pool.clone(), self.timeouts)
    }

    /// Check if the database connection is healthy
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the database connection pool
    pub async fn close(self) {
        self.pool.close().await;
    }
}

/// One handle per repository trait.
#[derive(Clone)]
pub struct Stores {
    pub entrants: Arc<dyn EntrantRepository>,
    pub scores: Arc<dyn ScoreRepository>,
    pub payouts: Arc<dyn PayoutRepository>,
    pub polls: Arc<dyn PollRepository>,
    pub votes: Arc<dyn VoteRepository>,
    pub balances: Arc<dyn BalanceRepository>,
    pub players: Arc<dyn PlayerDirectory>,
}

impl Stores {
    /// Use a single store for every repository.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: EntrantRepository
            + ScoreRepository
            + PayoutRepository
            + PollRepository
            + VoteRepository
            + BalanceRepository
            + PlayerDirectory
            + 'static,
    {
        Self {
            entrants: store.clone(),
            scores: store.clone(),
            payouts: store.clone(),
            polls: store.clone(),
            votes: store.clone(),
            balances: store.clone(),
            players: store,
        }
    }

    /// Fresh in-memory stores.
    pub fn memory() -> Self {
        Self::from_store(Arc::new(MemoryStore::new()))
    }
}
