//! Library configuration loaded from the environment.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Average buy-in used when no confirmed entrant has a buy-in recorded.
pub const DEFAULT_AVERAGE_BUY_IN: f64 = 150.0;

/// Duration assigned to blind levels with a zero or missing duration.
pub const DEFAULT_LEVEL_SECS: u32 = 900;

/// Balance granted to a player when joining a tournament's betting market.
pub const DEFAULT_STARTING_BALANCE: i64 = 1000;

/// Capacity of the change-event broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Whether add-ons contribute to the prize pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddonPolicy {
    /// `buy_in * (1 + rebuys + addons)`
    #[default]
    Include,
    /// `buy_in * (1 + rebuys)`
    Exclude,
}

impl FromStr for AddonPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "include" => Ok(AddonPolicy::Include),
            "exclude" => Ok(AddonPolicy::Exclude),
            other => Err(format!("unknown addon policy: {other}")),
        }
    }
}

/// Tunables shared by the live-ops managers.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveConfig {
    pub addon_policy: AddonPolicy,
    pub default_average_buy_in: f64,
    pub default_level_secs: u32,
    pub starting_balance: i64,
    pub event_capacity: usize,
    /// Directory for JSON timer checkpoints; `None` keeps them in memory.
    pub checkpoint_dir: Option<PathBuf>,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            addon_policy: AddonPolicy::Include,
            default_average_buy_in: DEFAULT_AVERAGE_BUY_IN,
            default_level_secs: DEFAULT_LEVEL_SECS,
            starting_balance: DEFAULT_STARTING_BALANCE,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            checkpoint_dir: None,
        }
    }
}

impl LiveConfig {
    /// Load configuration from environment variables.
    ///
    /// Expected environment variables (all optional):
    /// - `LPC_ADDON_POLICY`: `include` or `exclude` (default: include)
    /// - `LPC_DEFAULT_AVERAGE_BUY_IN`: fallback average buy-in (default: 150)
    /// - `LPC_DEFAULT_LEVEL_SECS`: fallback level duration (default: 900)
    /// - `LPC_STARTING_BALANCE`: bucks granted per player (default: 1000)
    /// - `LPC_EVENT_CAPACITY`: event channel capacity (default: 256)
    /// - `LPC_CHECKPOINT_DIR`: directory for timer checkpoints (default: unset)
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let checkpoint_dir = std::env::var("LPC_CHECKPOINT_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Self {
            addon_policy: parse_env_or("LPC_ADDON_POLICY", AddonPolicy::Include),
            default_average_buy_in: parse_env_or(
                "LPC_DEFAULT_AVERAGE_BUY_IN",
                DEFAULT_AVERAGE_BUY_IN,
            ),
            default_level_secs: parse_env_or("LPC_DEFAULT_LEVEL_SECS", DEFAULT_LEVEL_SECS),
            starting_balance: parse_env_or("LPC_STARTING_BALANCE", DEFAULT_STARTING_BALANCE),
            event_capacity: parse_env_or("LPC_EVENT_CAPACITY", DEFAULT_EVENT_CAPACITY).max(1),
            checkpoint_dir,
        }
    }
}

/// Parse an environment variable, falling back to `default` when it is
/// missing or malformed.
pub fn parse_env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: [&str; 6] = [
        "LPC_ADDON_POLICY",
        "LPC_DEFAULT_AVERAGE_BUY_IN",
        "LPC_DEFAULT_LEVEL_SECS",
        "LPC_STARTING_BALANCE",
        "LPC_EVENT_CAPACITY",
        "LPC_CHECKPOINT_DIR",
    ];

    fn clear_env() {
        for key in KEYS {
            unsafe { std::env::remove_var(key) };
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        assert_eq!(LiveConfig::from_env(), LiveConfig::default());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        unsafe {
            std::env::set_var("LPC_ADDON_POLICY", "Exclude");
            std::env::set_var("LPC_STARTING_BALANCE", "500");
            std::env::set_var("LPC_CHECKPOINT_DIR", "/tmp/lpc");
        }

        let config = LiveConfig::from_env();
        assert_eq!(config.addon_policy, AddonPolicy::Exclude);
        assert_eq!(config.starting_balance, 500);
        assert_eq!(config.checkpoint_dir, Some(PathBuf::from("/tmp/lpc")));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_malformed_values_fall_back() {
        clear_env();
        unsafe {
            std::env::set_var("LPC_DEFAULT_LEVEL_SECS", "fifteen");
            std::env::set_var("LPC_EVENT_CAPACITY", "0");
        }

        let config = LiveConfig::from_env();
        assert_eq!(config.default_level_secs, DEFAULT_LEVEL_SECS);
        assert_eq!(config.event_capacity, 1);
        clear_env();
    }
}
