//! Tournament registration and scoring data models.

use crate::config::AddonPolicy;
use crate::players::PlayerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tournament ID type
pub type TournamentId = i64;

/// Entrant (registration) ID type
pub type EntrantId = i64;

/// Buy-in tier chosen at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuyInTier {
    /// Contributes only to the standard pool
    #[default]
    Standard,
    /// Contribution is split between the standard and premium pools
    Premium,
}

impl BuyInTier {
    pub fn as_str(self) -> &'static str {
        match self {
            BuyInTier::Standard => "standard",
            BuyInTier::Premium => "premium",
        }
    }
}

impl std::str::FromStr for BuyInTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(BuyInTier::Standard),
            "premium" => Ok(BuyInTier::Premium),
            other => Err(format!("unknown buy-in tier: {other}")),
        }
    }
}

/// Whether an entrant is still in play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntrantStatus {
    Active,
    Eliminated,
}

/// A registration in one tournament.
///
/// `placement` is set exactly when `eliminated_at` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entrant {
    pub id: EntrantId,
    pub tournament_id: TournamentId,
    /// Linked player identity; walk-ins may have none
    pub player_id: Option<PlayerId>,
    pub full_name: String,
    pub buy_in_amount: Option<i64>,
    pub rebuy_count: u32,
    pub addon_count: u32,
    pub tier: BuyInTier,
    pub confirmed: bool,
    pub eliminated_at: Option<DateTime<Utc>>,
    pub placement: Option<u32>,
    pub registered_at: DateTime<Utc>,
}

impl Entrant {
    pub fn status(&self) -> EntrantStatus {
        if self.eliminated_at.is_some() {
            EntrantStatus::Eliminated
        } else {
            EntrantStatus::Active
        }
    }

    pub fn is_active(&self) -> bool {
        self.status() == EntrantStatus::Active
    }

    /// Money this entrant put into the prize pool.
    pub fn contribution(&self, policy: AddonPolicy) -> i64 {
        let buy_in = self.buy_in_amount.unwrap_or(0);
        let units = match policy {
            AddonPolicy::Include => 1 + i64::from(self.rebuy_count) + i64::from(self.addon_count),
            AddonPolicy::Exclude => 1 + i64::from(self.rebuy_count),
        };
        buy_in.saturating_mul(units)
    }
}

/// Registration request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEntrant {
    pub tournament_id: TournamentId,
    #[serde(default)]
    pub player_id: Option<PlayerId>,
    pub full_name: String,
    #[serde(default)]
    pub buy_in_amount: Option<i64>,
    #[serde(default)]
    pub rebuy_count: u32,
    #[serde(default)]
    pub addon_count: u32,
    #[serde(default)]
    pub tier: BuyInTier,
    #[serde(default = "default_confirmed")]
    pub confirmed: bool,
}

fn default_confirmed() -> bool {
    true
}

impl NewEntrant {
    /// Confirmed, standard-tier entrant with no buy-in recorded yet
    pub fn new(tournament_id: TournamentId, full_name: impl Into<String>) -> Self {
        Self {
            tournament_id,
            player_id: None,
            full_name: full_name.into(),
            buy_in_amount: None,
            rebuy_count: 0,
            addon_count: 0,
            tier: BuyInTier::Standard,
            confirmed: true,
        }
    }

    pub fn player(mut self, player_id: PlayerId) -> Self {
        self.player_id = Some(player_id);
        self
    }

    pub fn buy_in(mut self, amount: i64) -> Self {
        self.buy_in_amount = Some(amount);
        self
    }

    pub fn rebuys(mut self, count: u32) -> Self {
        self.rebuy_count = count;
        self
    }

    pub fn addons(mut self, count: u32) -> Self {
        self.addon_count = count;
        self
    }

    pub fn tier(mut self, tier: BuyInTier) -> Self {
        self.tier = tier;
        self
    }

    pub fn confirmed(mut self, confirmed: bool) -> Self {
        self.confirmed = confirmed;
        self
    }
}

/// Partial update of a registration. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntrantUpdate {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub player_id: Option<PlayerId>,
    #[serde(default)]
    pub buy_in_amount: Option<i64>,
    #[serde(default)]
    pub rebuy_count: Option<u32>,
    #[serde(default)]
    pub addon_count: Option<u32>,
    #[serde(default)]
    pub tier: Option<BuyInTier>,
    #[serde(default)]
    pub confirmed: Option<bool>,
}

impl EntrantUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, entrant: &mut Entrant) {
        if let Some(name) = &self.full_name {
            entrant.full_name = name.clone();
        }
        if let Some(player_id) = self.player_id {
            entrant.player_id = Some(player_id);
        }
        if let Some(amount) = self.buy_in_amount {
            entrant.buy_in_amount = Some(amount);
        }
        if let Some(rebuys) = self.rebuy_count {
            entrant.rebuy_count = rebuys;
        }
        if let Some(addons) = self.addon_count {
            entrant.addon_count = addons;
        }
        if let Some(tier) = self.tier {
            entrant.tier = tier;
        }
        if let Some(confirmed) = self.confirmed {
            entrant.confirmed = confirmed;
        }
    }
}

/// Points earned by one player in one tournament.
///
/// Keyed by `(tournament_id, player_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub tournament_id: TournamentId,
    pub player_id: PlayerId,
    pub player_name: String,
    pub placement: u32,
    pub points: f64,
    /// Payout for the placement, in whole currency units
    pub earnings: i64,
    /// Rebuys at elimination time
    pub rebuy_count: u32,
    /// Add-ons at elimination time
    pub addon_count: u32,
    pub recorded_at: DateTime<Utc>,
}

/// One rung of a tournament's payout structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutPlace {
    pub placement: u32,
    /// Share of the standard pool, in percent
    pub percentage: f64,
    /// Share of the premium pool, in percent
    #[serde(default)]
    pub premium_percentage: Option<f64>,
}

impl PayoutPlace {
    pub fn new(placement: u32, percentage: f64) -> Self {
        Self {
            placement,
            percentage,
            premium_percentage: None,
        }
    }

    pub fn with_premium(mut self, percentage: f64) -> Self {
        self.premium_percentage = Some(percentage);
        self
    }
}

/// What happened to the score side effect of an elimination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScoringOutcome {
    Recorded { record: ScoreRecord },
    /// Entrant has no linked player identity
    SkippedNoPlayer,
    /// Score write failed; the elimination still stands
    Failed { reason: String },
}

/// Result of a successful elimination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EliminationOutcome {
    pub entrant: Entrant,
    pub placement: u32,
    pub scoring: ScoringOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entrant(buy_in: Option<i64>, rebuys: u32, addons: u32) -> Entrant {
        Entrant {
            id: 1,
            tournament_id: 1,
            player_id: Some(1),
            full_name: "Ada".to_string(),
            buy_in_amount: buy_in,
            rebuy_count: rebuys,
            addon_count: addons,
            tier: BuyInTier::Standard,
            confirmed: true,
            eliminated_at: None,
            placement: None,
            registered_at: Utc::now(),
        }
    }

    #[test]
    fn test_contribution_respects_addon_policy() {
        let e = entrant(Some(150), 2, 1);
        assert_eq!(e.contribution(AddonPolicy::Include), 600);
        assert_eq!(e.contribution(AddonPolicy::Exclude), 450);
        assert_eq!(entrant(None, 3, 3).contribution(AddonPolicy::Include), 0);
    }

    #[test]
    fn test_update_applies_only_set_fields() {
        let mut e = entrant(Some(150), 0, 0);
        let update = EntrantUpdate {
            rebuy_count: Some(2),
            tier: Some(BuyInTier::Premium),
            ..Default::default()
        };
        update.apply(&mut e);

        assert_eq!(e.rebuy_count, 2);
        assert_eq!(e.tier, BuyInTier::Premium);
        assert_eq!(e.buy_in_amount, Some(150));
        assert_eq!(e.full_name, "Ada");
        assert!(EntrantUpdate::default().is_empty());
    }

    #[test]
    fn test_status_follows_elimination_timestamp() {
        let mut e = entrant(Some(100), 0, 0);
        assert!(e.is_active());
        e.eliminated_at = Some(Utc::now());
        e.placement = Some(3);
        assert_eq!(e.status(), EntrantStatus::Eliminated);
    }
}
