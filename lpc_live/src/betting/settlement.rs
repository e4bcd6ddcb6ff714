//! Pari-mutuel settlement in whole currency units.
//!
//! Winners get their stake back plus a share of the losing pool
//! proportional to their stake. Shares are floored and the leftover units go
//! one each to the winners with the largest fractional remainder (ties to
//! the lower vote ID), so the payouts add up to the whole pool exactly.

use super::models::{BettingVote, OptionId, VoteId};

/// Settlement of one vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub vote_id: VoteId,
    pub bet_amount: i64,
    /// Zero for losing votes
    pub winnings: i64,
}

impl Settlement {
    /// Change applied to the voter's balance.
    pub fn balance_delta(&self) -> i64 {
        self.winnings - self.bet_amount
    }
}

/// Settle every vote on a poll, in input order.
///
/// If nobody backed the winning option (or only zero stakes did), nobody is
/// paid and every stake is kept by the house.
pub fn pari_mutuel(votes: &[BettingVote], winning_option: OptionId) -> Vec<Settlement> {
    let winning_pool: i128 = votes
        .iter()
        .filter(|v| v.option_id == winning_option)
        .map(|v| i128::from(v.bet_amount))
        .sum();
    let total_pool: i128 = votes.iter().map(|v| i128::from(v.bet_amount)).sum();
    let losing_pool = total_pool - winning_pool;

    let mut settlements: Vec<Settlement> = votes
        .iter()
        .map(|v| Settlement {
            vote_id: v.id,
            bet_amount: v.bet_amount,
            winnings: 0,
        })
        .collect();

    if winning_pool == 0 {
        return settlements;
    }

    // (index, remainder) for each winning vote
    let mut remainders = Vec::new();
    let mut distributed: i128 = 0;
    for (i, vote) in votes.iter().enumerate() {
        if vote.option_id != winning_option {
            continue;
        }
        let share = i128::from(vote.bet_amount) * losing_pool;
        let floor = share / winning_pool;
        distributed += floor;
        settlements[i].winnings = vote.bet_amount + floor as i64;
        remainders.push((i, share % winning_pool));
    }

    remainders.sort_by(|a, b| b.1.cmp(&a.1).then(votes[a.0].id.cmp(&votes[b.0].id)));
    let residual = (losing_pool - distributed) as usize;
    for &(i, _) in remainders.iter().take(residual) {
        settlements[i].winnings += 1;
    }

    settlements
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    const A: OptionId = 1;
    const B: OptionId = 2;

    fn vote(id: VoteId, option_id: OptionId, bet_amount: i64) -> BettingVote {
        BettingVote {
            id,
            poll_id: 1,
            player_id: id,
            option_id,
            bet_amount,
            winnings: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_two_winners_one_loser() {
        let votes = [vote(1, A, 100), vote(2, A, 200), vote(3, B, 50)];
        let settled = pari_mutuel(&votes, A);

        assert_eq!(settled[0].winnings, 117);
        assert_eq!(settled[1].winnings, 233);
        assert_eq!(settled[2].winnings, 0);
        assert_eq!(settled[2].balance_delta(), -50);
        assert_eq!(settled.iter().map(|s| s.winnings).sum::<i64>(), 350);
    }

    #[test]
    fn test_empty_winning_pool_pays_nobody() {
        let votes = [vote(1, B, 100), vote(2, B, 40)];
        let settled = pari_mutuel(&votes, A);
        assert!(settled.iter().all(|s| s.winnings == 0));
    }

    #[test]
    fn test_residual_ties_go_to_lower_vote_id() {
        // Three equal winners share 1 losing unit.
        let votes = [vote(7, A, 10), vote(3, A, 10), vote(5, A, 10), vote(9, B, 1)];
        let settled = pari_mutuel(&votes, A);
        let by_id = |id| settled.iter().find(|s| s.vote_id == id).unwrap().winnings;

        assert_eq!(by_id(3), 11);
        assert_eq!(by_id(5), 10);
        assert_eq!(by_id(7), 10);
    }

    #[test]
    fn test_no_losers_returns_stakes() {
        let votes = [vote(1, A, 30), vote(2, A, 70)];
        let settled = pari_mutuel(&votes, A);
        assert_eq!(settled[0].winnings, 30);
        assert_eq!(settled[1].winnings, 70);
    }

    proptest! {
        #[test]
        fn prop_pool_is_conserved(bets in proptest::collection::vec((0i64..3, 0i64..10_000), 1..40)) {
            let votes: Vec<BettingVote> = bets
                .iter()
                .enumerate()
                .map(|(i, &(option, amount))| vote(i as i64 + 1, option, amount))
                .collect();
            let settled = pari_mutuel(&votes, 0);

            let total: i64 = votes.iter().map(|v| v.bet_amount).sum();
            let winning: i64 = votes.iter().filter(|v| v.option_id == 0).map(|v| v.bet_amount).sum();
            let paid: i64 = settled.iter().map(|s| s.winnings).sum();

            if winning > 0 {
                prop_assert_eq!(paid, total);
            } else {
                prop_assert_eq!(paid, 0);
            }
            for (s, v) in settled.iter().zip(&votes) {
                if v.option_id == 0 {
                    prop_assert!(s.winnings >= v.bet_amount);
                } else {
                    prop_assert_eq!(s.winnings, 0);
                }
            }
        }
    }
}
