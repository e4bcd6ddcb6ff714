//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use lpc_live::{config::LiveConfig, db::DatabaseConfig};
use std::net::SocketAddr;

/// Bind address used when neither `--bind` nor `SERVER_BIND` is given
pub const DEFAULT_BIND: &str = "127.0.0.1:6969";

/// Where the server keeps its records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    Postgres,
    /// Everything is lost on exit; for demos and local testing
    Memory,
}

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    pub storage: StorageMode,
    /// Database configuration, unused in memory mode
    pub database: DatabaseConfig,
    /// Library tunables
    pub live: LiveConfig,
    /// Prometheus scrape address; metrics are off when unset
    pub metrics_bind: Option<SocketAddr>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    /// * `memory` - Use the in-memory store instead of PostgreSQL
    ///
    /// # Errors
    ///
    /// Returns error if an address variable is set but does not parse
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        memory: bool,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_addr("SERVER_BIND")?.unwrap_or(default_bind()),
        };

        let mut database = DatabaseConfig::from_env();
        if let Some(url) = database_url_override {
            database.database_url = url;
        }

        let memory = memory || std::env::var("LPC_STORAGE").is_ok_and(|v| v == "memory");
        let storage = if memory {
            StorageMode::Memory
        } else {
            StorageMode::Postgres
        };

        Ok(ServerConfig {
            bind,
            storage,
            database,
            live: LiveConfig::from_env(),
            metrics_bind: parse_addr("METRICS_BIND")?,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.live.starting_balance < 0 {
            return Err(ConfigError::Invalid {
                var: "LPC_STARTING_BALANCE".to_string(),
                reason: "Must not be negative".to_string(),
            });
        }

        if !self.live.default_average_buy_in.is_finite() || self.live.default_average_buy_in <= 0.0
        {
            return Err(ConfigError::Invalid {
                var: "LPC_DEFAULT_AVERAGE_BUY_IN".to_string(),
                reason: "Must be a positive number".to_string(),
            });
        }

        if self.live.event_capacity == 0 {
            return Err(ConfigError::Invalid {
                var: "LPC_EVENT_CAPACITY".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.storage == StorageMode::Postgres
            && self.database.max_connections < self.database.min_connections
        {
            return Err(ConfigError::Invalid {
                var: "DB_MAX_CONNECTIONS".to_string(),
                reason: format!(
                    "Must be at least the minimum pool size ({})",
                    self.database.min_connections
                ),
            });
        }

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("Must differ from the server address ({})", self.bind),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6969))
}

/// Read an optional socket address from the environment
fn parse_addr(key: &str) -> Result<Option<SocketAddr>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value.parse().map(Some).map_err(|_| ConfigError::Invalid {
            var: key.to_string(),
            reason: format!("'{value}' is not an IP:PORT address"),
        }),
        Err(_) => Ok(None),
    }
}
