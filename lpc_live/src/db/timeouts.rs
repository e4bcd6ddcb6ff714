//! Query timeouts for the PostgreSQL store.
//!
//! A store call that hangs while a manager holds a poll or tournament lock
//! would stall every other request on that entity, so each statement is
//! bounded.

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use super::config::DatabaseConfig;

/// Default timeout for single statements
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for schema setup and full-table reads
pub const LONG_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Error type for timeout operations
#[derive(Debug, thiserror::Error)]
pub enum TimeoutError {
    /// Operation timed out
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Timeouts applied by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryTimeouts {
    pub query: Duration,
    pub long: Duration,
}

impl Default for QueryTimeouts {
    fn default() -> Self {
        Self {
            query: DEFAULT_QUERY_TIMEOUT,
            long: LONG_OPERATION_TIMEOUT,
        }
    }
}

impl From<&DatabaseConfig> for QueryTimeouts {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            query: Duration::from_secs(config.query_timeout_secs.max(1)),
            long: Duration::from_secs(config.long_query_timeout_secs.max(1)),
        }
    }
}

/// Run `future`, failing with [`TimeoutError::Timeout`] after `duration`.
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> Result<T, TimeoutError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match timeout(duration, future).await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(TimeoutError::Database(e)),
        Err(_) => Err(TimeoutError::Timeout(duration)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_slow_future_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, sqlx::Error>(1)
        };
        let err = with_timeout(Duration::from_secs(5), slow).await.unwrap_err();
        assert!(matches!(err, TimeoutError::Timeout(d) if d.as_secs() == 5));
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_database_error_passes_through() {
        let failing = async { Err::<i32, _>(sqlx::Error::RowNotFound) };
        let err = with_timeout(DEFAULT_QUERY_TIMEOUT, failing).await.unwrap_err();
        assert!(matches!(err, TimeoutError::Database(sqlx::Error::RowNotFound)));
    }

    #[test]
    fn test_timeouts_from_config() {
        let mut config = DatabaseConfig::development();
        config.query_timeout_secs = 0;
        config.long_query_timeout_secs = 60;
        let timeouts = QueryTimeouts::from(&config);
        assert_eq!(timeouts.query, Duration::from_secs(1));
        assert_eq!(timeouts.long, Duration::from_secs(60));
    }
}
