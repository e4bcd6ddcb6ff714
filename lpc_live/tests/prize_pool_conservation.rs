//! Prize pool conservation tests.
//!
//! No currency may appear or vanish: tiered pools must add up to the total
//! contributions, and a poll's payout must add up to its stakes.

use chrono::Utc;
use lpc_live::betting::{BettingVote, pari_mutuel};
use lpc_live::config::AddonPolicy;
use lpc_live::tournament::economics::{PrizePools, TournamentEconomics};
use lpc_live::tournament::{BuyInTier, Entrant};
use proptest::prelude::*;

fn entrant(id: i64, buy_in: i64, rebuys: u32, addons: u32, premium: bool) -> Entrant {
    Entrant {
        id,
        tournament_id: 1,
        player_id: Some(id),
        full_name: format!("Entrant {id}"),
        buy_in_amount: Some(buy_in),
        rebuy_count: rebuys,
        addon_count: addons,
        tier: if premium {
            BuyInTier::Premium
        } else {
            BuyInTier::Standard
        },
        confirmed: true,
        eliminated_at: None,
        placement: None,
        registered_at: Utc::now(),
    }
}

fn entrant_strategy() -> impl Strategy<Value = (i64, u32, u32, bool)> {
    (1i64..500, 0u32..4, 0u32..3, any::<bool>())
}

proptest! {
    #[test]
    fn tiered_pools_add_up_to_total(
        specs in prop::collection::vec(entrant_strategy(), 1..40),
        include_addons in any::<bool>(),
    ) {
        let policy = if include_addons { AddonPolicy::Include } else { AddonPolicy::Exclude };
        let entrants: Vec<_> = specs
            .iter()
            .enumerate()
            .map(|(i, &(buy_in, rebuys, addons, premium))| {
                entrant(i as i64 + 1, buy_in, rebuys, addons, premium)
            })
            .collect();

        let pools = PrizePools::from_entrants(&entrants, policy);
        let economics = TournamentEconomics::from_entrants(1, &entrants, policy, 150.0);
        let contributions: i64 = entrants.iter().map(|e| e.contribution(policy)).sum();

        prop_assert_eq!(pools.total(), contributions);
        prop_assert_eq!(economics.total_prize_pool, contributions);
        prop_assert!(pools.premium <= pools.standard);
    }

    #[test]
    fn pari_mutuel_pays_out_whole_pool(
        bets in prop::collection::vec((1i64..3, 1i64..10_000), 1..30),
    ) {
        let votes: Vec<_> = bets
            .iter()
            .enumerate()
            .map(|(i, &(option_id, bet_amount))| BettingVote {
                id: i as i64 + 1,
                poll_id: 1,
                player_id: i as i64 + 1,
                option_id,
                bet_amount,
                winnings: 0,
                created_at: Utc::now(),
            })
            .collect();

        let total: i64 = votes.iter().map(|v| v.bet_amount).sum();
        let winning_pool: i64 = votes.iter().filter(|v| v.option_id == 1).map(|v| v.bet_amount).sum();
        let settlements = pari_mutuel(&votes, 1);
        let paid: i64 = settlements.iter().map(|s| s.winnings).sum();
        let net: i64 = settlements.iter().map(|s| s.balance_delta()).sum();

        if winning_pool > 0 {
            prop_assert_eq!(paid, total);
            prop_assert_eq!(net, 0);
        } else {
            prop_assert_eq!(paid, 0);
        }
    }
}

#[test]
fn test_premium_odd_unit_stays_in_standard_pool() {
    let entrants = vec![entrant(1, 101, 0, 0, true), entrant(2, 100, 0, 0, false)];
    let pools = PrizePools::from_entrants(&entrants, AddonPolicy::Include);

    assert_eq!(pools.premium, 50);
    assert_eq!(pools.standard, 151);
}

#[test]
fn test_unconfirmed_entrants_do_not_contribute() {
    let mut walk_in = entrant(2, 100, 0, 0, false);
    walk_in.confirmed = false;
    let entrants = vec![entrant(1, 100, 1, 1, false), walk_in];

    assert_eq!(PrizePools::from_entrants(&entrants, AddonPolicy::Include).total(), 300);
    assert_eq!(PrizePools::from_entrants(&entrants, AddonPolicy::Exclude).total(), 200);
}
