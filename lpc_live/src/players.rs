//! Player identity directory entries.

use serde::{Deserialize, Serialize};

/// Player ID type
pub type PlayerId = i64;

/// A known player. `betting_code` is the short code players type on the
/// voting page to identify themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub betting_code: Option<String>,
}

/// Canonical form of a betting code: trimmed and lowercased.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase()
}
