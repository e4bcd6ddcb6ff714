//! Player of the Year points formula.
//!
//! ```text
//! points = 10 * sqrt(N / p) * (1 + ln(pool / N + 0.25))^2 / (1 + ln(avg_buy_in + 0.25))
//! ```
//!
//! where `N` is the number of confirmed entrants and `p` the placement.
//! The function is total: any input that makes the formula undefined yields
//! `0.0`, and the result is always rounded to two decimals.

use serde::{Deserialize, Serialize};

/// Points awarded for finishing at `placement` in a tournament with the
/// given economics.
///
/// Returns 0 when `placement` is 0 or beyond `total_players`, when there are
/// no players or no prize pool, and whenever the formula is not a finite,
/// non-negative number.
pub fn points(placement: u32, total_players: u32, total_prize_pool: i64, average_buy_in: f64) -> f64 {
    if total_players == 0 || placement == 0 || placement > total_players || total_prize_pool <= 0 {
        return 0.0;
    }

    let players = f64::from(total_players);
    let sqrt_part = (players / f64::from(placement)).sqrt();
    let log_prize = (total_prize_pool as f64 / players + 0.25).ln();
    let log_buy_in = (average_buy_in + 0.25).ln();
    let raw = 10.0 * sqrt_part * (1.0 + log_prize).powi(2) / (1.0 + log_buy_in);

    if !raw.is_finite() || raw < 0.0 {
        return 0.0;
    }
    round2(raw)
}

/// Round to two decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Best and worst outcomes still available to a player who is alive in a
/// running tournament.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointsProjection {
    /// Points for winning the tournament
    pub if_winner: f64,
    /// Points for being the next player out
    pub if_next_eliminated: f64,
    /// Entrants still in play
    pub active_count: u32,
}

impl PointsProjection {
    pub fn compute(active_count: u32, total_players: u32, total_prize_pool: i64, average_buy_in: f64) -> Self {
        Self {
            if_winner: points(1, total_players, total_prize_pool, average_buy_in),
            if_next_eliminated: points(active_count, total_players, total_prize_pool, average_buy_in),
            active_count,
        }
    }
}
