//! Prize pool economics derived from a tournament's registrations.
//!
//! Everything here is recomputed from the current entrant list; nothing is
//! cached between calls.

use super::models::{BuyInTier, Entrant, PayoutPlace, TournamentId};
use crate::config::AddonPolicy;
use crate::scoring;
use serde::{Deserialize, Serialize};

/// Inputs of the points formula for one tournament.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TournamentEconomics {
    pub tournament_id: TournamentId,
    /// Confirmed entrants
    pub total_players: u32,
    pub total_prize_pool: i64,
    pub average_buy_in: f64,
}

impl TournamentEconomics {
    /// Derive economics from the full entrant list.
    ///
    /// The average buy-in is taken over confirmed entrants that have a
    /// buy-in recorded, falling back to `default_average_buy_in`.
    pub fn from_entrants(
        tournament_id: TournamentId,
        entrants: &[Entrant],
        policy: AddonPolicy,
        default_average_buy_in: f64,
    ) -> Self {
        let confirmed: Vec<&Entrant> = entrants.iter().filter(|e| e.confirmed).collect();

        let total_prize_pool = confirmed
            .iter()
            .fold(0i64, |sum, e| sum.saturating_add(e.contribution(policy)));

        let buy_ins: Vec<i64> = confirmed.iter().filter_map(|e| e.buy_in_amount).collect();
        let average_buy_in = if buy_ins.is_empty() {
            default_average_buy_in
        } else {
            buy_ins.iter().map(|&b| b as f64).sum::<f64>() / buy_ins.len() as f64
        };

        Self {
            tournament_id,
            total_players: u32::try_from(confirmed.len()).unwrap_or(u32::MAX),
            total_prize_pool,
            average_buy_in,
        }
    }

    /// Points for finishing at `placement`.
    pub fn points_for(&self, placement: u32) -> f64 {
        scoring::points(
            placement,
            self.total_players,
            self.total_prize_pool,
            self.average_buy_in,
        )
    }
}

/// Standard and premium prize pools.
///
/// Standard-tier contributions go wholly to the standard pool. Premium-tier
/// contributions are split in half, with the odd unit staying in the
/// standard pool, so `standard + premium` always equals the total pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizePools {
    pub standard: i64,
    pub premium: i64,
}

impl PrizePools {
    pub fn from_entrants(entrants: &[Entrant], policy: AddonPolicy) -> Self {
        entrants
            .iter()
            .filter(|e| e.confirmed)
            .fold(Self::default(), |mut pools, e| {
                let contribution = e.contribution(policy);
                match e.tier {
                    BuyInTier::Standard => pools.standard += contribution,
                    BuyInTier::Premium => {
                        let premium = contribution / 2;
                        pools.premium += premium;
                        pools.standard += contribution - premium;
                    }
                }
                pools
            })
    }

    pub fn total(&self) -> i64 {
        self.standard + self.premium
    }
}

/// Payout state of a placement relative to the live tournament.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutStatus {
    /// Someone already finished here
    Paid,
    /// The next elimination lands here
    Next,
    Pending,
}

/// One placement with its money.
///
/// The premium share of a placement is ranked among premium entrants only,
/// so `premium_status` runs against the number of premium entrants still in
/// play rather than the overall field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutLine {
    pub placement: u32,
    pub percentage: f64,
    pub amount: i64,
    pub premium_percentage: Option<f64>,
    pub premium_amount: Option<i64>,
    pub status: PayoutStatus,
    /// Set when the placement carries a premium share
    pub premium_status: Option<PayoutStatus>,
}

/// Amount of `pool` paid for `percentage` percent, rounded to whole units.
pub fn payout_amount(pool: i64, percentage: f64) -> i64 {
    (pool as f64 * percentage / 100.0).round() as i64
}

fn status_against(placement: u32, remaining: u32) -> PayoutStatus {
    if placement > remaining {
        PayoutStatus::Paid
    } else if placement == remaining {
        PayoutStatus::Next
    } else {
        PayoutStatus::Pending
    }
}

/// Entrants still in play, overall and within the premium tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Remaining {
    pub active: u32,
    pub premium_active: u32,
}

impl Remaining {
    pub fn of(entrants: &[Entrant]) -> Self {
        let count = |premium_only: bool| {
            let n = entrants
                .iter()
                .filter(|e| e.is_active() && (!premium_only || e.tier == BuyInTier::Premium))
                .count();
            u32::try_from(n).unwrap_or(u32::MAX)
        };
        Self {
            active: count(false),
            premium_active: count(true),
        }
    }
}

/// Build the payout ladder for a structure, sorted by placement.
///
/// Placements above `remaining.active` have been paid and the placement
/// equal to it is next; premium shares are marked the same way against
/// `remaining.premium_active`.
pub fn payout_ladder(places: &[PayoutPlace], pools: PrizePools, remaining: Remaining) -> Vec<PayoutLine> {
    let mut ladder: Vec<PayoutLine> = places
        .iter()
        .map(|place| PayoutLine {
            placement: place.placement,
            percentage: place.percentage,
            amount: payout_amount(pools.standard, place.percentage),
            premium_percentage: place.premium_percentage,
            premium_amount: place
                .premium_percentage
                .map(|pct| payout_amount(pools.premium, pct)),
            status: status_against(place.placement, remaining.active),
            premium_status: place
                .premium_percentage
                .map(|_| status_against(place.placement, remaining.premium_active)),
        })
        .collect();
    ladder.sort_by_key(|line| line.placement);
    ladder
}

/// Finishing position of `entrant` among premium entrants, `None` for the
/// standard tier or while still in play.
///
/// Counts the premium entrants that were still in play when `entrant` went
/// out: those active now and those eliminated at or after it.
pub fn premium_placement(roster: &[Entrant], entrant: &Entrant) -> Option<u32> {
    if entrant.tier != BuyInTier::Premium {
        return None;
    }
    let placement = entrant.placement?;
    let count = roster
        .iter()
        .filter(|e| e.tier == BuyInTier::Premium && e.id != entrant.id)
        .filter(|e| e.placement.is_none_or(|p| p < placement))
        .count();
    Some(u32::try_from(count).unwrap_or(u32::MAX).saturating_add(1))
}

/// Money won for finishing at `placement` overall and, for premium
/// entrants, at `premium_placement` within the premium tier.
pub fn earnings_for(
    places: &[PayoutPlace],
    pools: PrizePools,
    placement: u32,
    premium_placement: Option<u32>,
) -> i64 {
    let standard = places
        .iter()
        .find(|p| p.placement == placement)
        .map_or(0, |p| payout_amount(pools.standard, p.percentage));

    let premium = premium_placement
        .and_then(|rank| places.iter().find(|p| p.placement == rank))
        .and_then(|p| p.premium_percentage)
        .map_or(0, |pct| payout_amount(pools.premium, pct));

    standard + premium
}

/// Validate a payout structure: unique positive placements, percentages in
/// `[0, 100]` summing to at most 100 per pool.
pub fn validate_structure(places: &[PayoutPlace]) -> Result<(), String> {
    let mut seen = std::collections::HashSet::new();
    let mut standard_total = 0.0;
    let mut premium_total = 0.0;

    for place in places {
        if place.placement == 0 {
            return Err("placements start at 1".to_string());
        }
        if !seen.insert(place.placement) {
            return Err(format!("duplicate placement {}", place.placement));
        }
        let pcts = std::iter::once(place.percentage).chain(place.premium_percentage);
        for pct in pcts {
            if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
                return Err(format!("percentage out of range for placement {}", place.placement));
            }
        }
        standard_total += place.percentage;
        premium_total += place.premium_percentage.unwrap_or(0.0);
    }

    // Allow float slack from UI-entered values like 33.33 * 3.
    if standard_total > 100.01 || premium_total > 100.01 {
        return Err("percentages exceed 100".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entrant(id: i64, buy_in: Option<i64>, rebuys: u32, tier: BuyInTier, confirmed: bool) -> Entrant {
        Entrant {
            id,
            tournament_id: 1,
            player_id: Some(id),
            full_name: format!("Player {id}"),
            buy_in_amount: buy_in,
            rebuy_count: rebuys,
            addon_count: 0,
            tier,
            confirmed,
            eliminated_at: None,
            placement: None,
            registered_at: Utc::now(),
        }
    }

    #[test]
    fn test_economics_counts_confirmed_only() {
        let entrants = vec![
            entrant(1, Some(150), 1, BuyInTier::Standard, true),
            entrant(2, Some(300), 0, BuyInTier::Premium, true),
            entrant(3, None, 0, BuyInTier::Standard, true),
            entrant(4, Some(1000), 0, BuyInTier::Standard, false),
        ];
        let eco = TournamentEconomics::from_entrants(1, &entrants, AddonPolicy::Include, 150.0);

        assert_eq!(eco.total_players, 3);
        assert_eq!(eco.total_prize_pool, 600);
        assert_eq!(eco.average_buy_in, 225.0);
    }

    #[test]
    fn test_average_falls_back_without_buy_ins() {
        let entrants = vec![entrant(1, None, 0, BuyInTier::Standard, true)];
        let eco = TournamentEconomics::from_entrants(1, &entrants, AddonPolicy::Include, 150.0);
        assert_eq!(eco.average_buy_in, 150.0);
        assert_eq!(eco.total_prize_pool, 0);
        assert_eq!(eco.points_for(1), 0.0);
    }

    #[test]
    fn test_premium_contribution_is_split() {
        let entrants = vec![
            entrant(1, Some(150), 0, BuyInTier::Standard, true),
            entrant(2, Some(301), 0, BuyInTier::Premium, true),
        ];
        let pools = PrizePools::from_entrants(&entrants, AddonPolicy::Include);
        assert_eq!(pools.premium, 150);
        assert_eq!(pools.standard, 301);
        assert_eq!(pools.total(), 451);
    }

    #[test]
    fn test_ladder_marks_paid_and_next() {
        let places = vec![
            PayoutPlace::new(3, 20.0),
            PayoutPlace::new(1, 50.0).with_premium(70.0),
            PayoutPlace::new(2, 30.0).with_premium(30.0),
        ];
        let pools = PrizePools { standard: 1000, premium: 500 };
        let remaining = Remaining {
            active: 2,
            premium_active: 1,
        };
        let ladder = payout_ladder(&places, pools, remaining);

        assert_eq!(ladder.iter().map(|l| l.placement).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(ladder[0].amount, 500);
        assert_eq!(ladder[0].premium_amount, Some(350));
        assert_eq!(ladder[0].status, PayoutStatus::Pending);
        assert_eq!(ladder[1].status, PayoutStatus::Next);
        assert_eq!(ladder[2].status, PayoutStatus::Paid);
        assert_eq!(ladder[2].premium_amount, None);

        assert_eq!(ladder[0].premium_status, Some(PayoutStatus::Next));
        assert_eq!(ladder[1].premium_status, Some(PayoutStatus::Paid));
        assert_eq!(ladder[2].premium_status, None);
    }

    #[test]
    fn test_premium_share_follows_premium_placement() {
        let places = vec![PayoutPlace::new(1, 50.0).with_premium(100.0)];
        let pools = PrizePools { standard: 1000, premium: 400 };
        assert_eq!(earnings_for(&places, pools, 1, None), 500);
        assert_eq!(earnings_for(&places, pools, 1, Some(1)), 900);
        // Out of the money overall, but the last premium entrant standing
        assert_eq!(earnings_for(&places, pools, 4, Some(1)), 400);
        assert_eq!(earnings_for(&places, pools, 4, Some(2)), 0);
    }

    #[test]
    fn test_premium_placement_counts_premium_field_only() {
        let mut roster = vec![
            entrant(1, Some(300), 0, BuyInTier::Premium, true),
            entrant(2, Some(300), 0, BuyInTier::Premium, true),
            entrant(3, Some(150), 0, BuyInTier::Standard, true),
            entrant(4, Some(150), 0, BuyInTier::Standard, true),
        ];
        let eliminate = |e: &mut Entrant, placement: u32| {
            e.eliminated_at = Some(Utc::now());
            e.placement = Some(placement);
        };
        eliminate(&mut roster[3], 4);
        eliminate(&mut roster[0], 3);

        assert_eq!(premium_placement(&roster, &roster[0]), Some(2));
        assert_eq!(premium_placement(&roster, &roster[3]), None);
        assert_eq!(premium_placement(&roster, &roster[1]), None);

        eliminate(&mut roster[1], 2);
        assert_eq!(premium_placement(&roster, &roster[1]), Some(1));
        assert_eq!(premium_placement(&roster, &roster[0]), Some(2));

        let remaining = Remaining::of(&roster);
        assert_eq!(remaining, Remaining { active: 1, premium_active: 0 });
    }

    #[test]
    fn test_validate_structure() {
        assert!(validate_structure(&[PayoutPlace::new(1, 60.0), PayoutPlace::new(2, 40.0)]).is_ok());
        assert!(validate_structure(&[PayoutPlace::new(0, 10.0)]).is_err());
        assert!(validate_structure(&[PayoutPlace::new(1, 10.0), PayoutPlace::new(1, 10.0)]).is_err());
        assert!(validate_structure(&[PayoutPlace::new(1, 80.0), PayoutPlace::new(2, 40.0)]).is_err());
        assert!(validate_structure(&[PayoutPlace::new(1, -5.0)]).is_err());
    }
}
