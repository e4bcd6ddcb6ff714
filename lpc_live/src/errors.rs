//! Shared error taxonomy.
//!
//! Every module keeps its own `thiserror` enum; `kind()` on each of them maps
//! onto this small set so callers (the HTTP layer in particular) can react
//! without matching on every variant.

use serde::Serialize;

/// Coarse classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Operation is not allowed in the entity's current state
    InvalidState,
    /// Referenced entity does not exist
    NotFound,
    /// Caller supplied malformed or out-of-range input
    InvalidInput,
    /// Operation collides with existing data (duplicate, already resolved)
    Conflict,
    /// Store or other dependency failed
    DependencyFailure,
}

impl ErrorKind {
    /// Stable lowercase name, used in logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Conflict => "conflict",
            ErrorKind::DependencyFailure => "dependency_failure",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
