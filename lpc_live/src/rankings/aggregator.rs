//! Leaderboard computation over score records.

use crate::players::PlayerId;
use crate::scoring::round2;
use crate::tournament::models::{ScoreRecord, TournamentId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    /// 1-based position
    pub rank: u32,
    pub player_id: PlayerId,
    pub player_name: String,
    pub total_points: f64,
    pub tournaments_played: u32,
    pub total_earnings: i64,
}

struct Accumulator {
    name: String,
    name_from: TournamentId,
    points: f64,
    played: u32,
    earnings: i64,
}

/// Aggregate score records into a leaderboard.
///
/// Rows are sorted by total points descending with ties broken by ascending
/// player ID. Non-finite points count as zero. A player's displayed name is
/// taken from their record in the most recent (highest ID) tournament.
pub fn compute_rankings(records: &[ScoreRecord]) -> Vec<RankingEntry> {
    let mut by_player: HashMap<PlayerId, Accumulator> = HashMap::new();

    for record in records {
        let points = if record.points.is_finite() {
            record.points
        } else {
            0.0
        };
        let acc = by_player
            .entry(record.player_id)
            .or_insert_with(|| Accumulator {
                name: record.player_name.clone(),
                name_from: record.tournament_id,
                points: 0.0,
                played: 0,
                earnings: 0,
            });

        acc.points += points;
        acc.played += 1;
        acc.earnings += record.earnings;
        if record.tournament_id > acc.name_from {
            acc.name = record.player_name.clone();
            acc.name_from = record.tournament_id;
        }
    }

    let mut rows: Vec<RankingEntry> = by_player
        .into_iter()
        .map(|(player_id, acc)| RankingEntry {
            rank: 0,
            player_id,
            player_name: acc.name,
            total_points: round2(acc.points),
            tournaments_played: acc.played,
            total_earnings: acc.earnings,
        })
        .collect();

    rows.sort_by(|a, b| {
        b.total_points
            .total_cmp(&a.total_points)
            .then(a.player_id.cmp(&b.player_id))
    });
    for (i, row) in rows.iter_mut().enumerate() {
        row.rank = i as u32 + 1;
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(tournament_id: i64, player_id: i64, name: &str, points: f64, earnings: i64) -> ScoreRecord {
        ScoreRecord {
            tournament_id,
            player_id,
            player_name: name.to_string(),
            placement: 1,
            points,
            earnings,
            rebuy_count: 0,
            addon_count: 0,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_groups_and_sorts() {
        let rows = compute_rankings(&[
            record(1, 2, "Bo", 10.5, 0),
            record(1, 1, "Ada", 20.25, 300),
            record(2, 2, "Bo", 30.0, 100),
        ]);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].player_id, 2);
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[0].total_points, 40.5);
        assert_eq!(rows[0].tournaments_played, 2);
        assert_eq!(rows[0].total_earnings, 100);
        assert_eq!(rows[1].rank, 2);
    }

    #[test]
    fn test_ties_break_on_player_id() {
        let rows = compute_rankings(&[record(1, 9, "Zed", 5.0, 0), record(1, 3, "Cy", 5.0, 0)]);
        assert_eq!(rows[0].player_id, 3);
        assert_eq!(rows[1].player_id, 9);
    }

    #[test]
    fn test_non_finite_points_count_as_zero() {
        let rows = compute_rankings(&[
            record(1, 1, "Ada", f64::NAN, 0),
            record(2, 1, "Ada", 7.0, 0),
            record(1, 2, "Bo", f64::INFINITY, 0),
        ]);
        assert_eq!(rows[0].total_points, 7.0);
        assert_eq!(rows[1].total_points, 0.0);
        assert_eq!(rows[1].tournaments_played, 1);
    }

    #[test]
    fn test_name_from_latest_tournament() {
        let rows = compute_rankings(&[
            record(5, 1, "Ada L.", 1.0, 0),
            record(2, 1, "Ada", 1.0, 0),
        ]);
        assert_eq!(rows[0].player_name, "Ada L.");
    }

    #[test]
    fn test_empty_input() {
        assert!(compute_rankings(&[]).is_empty());
    }
}
