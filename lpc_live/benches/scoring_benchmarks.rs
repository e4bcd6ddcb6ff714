use chrono::Utc;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use lpc_live::{
    betting::{BettingVote, pari_mutuel},
    rankings::compute_rankings,
    scoring,
    timer::{TimerEngine, standard_structure},
    tournament::ScoreRecord,
};
use std::hint::black_box;

/// A season of `tournaments` events with `field` finishers each
fn season(tournaments: i64, field: i64) -> Vec<ScoreRecord> {
    let mut records = Vec::new();
    for tournament_id in 1..=tournaments {
        for player_id in 1..=field {
            let placement = ((player_id + tournament_id) % field + 1) as u32;
            records.push(ScoreRecord {
                tournament_id,
                player_id,
                player_name: format!("player{player_id}"),
                placement,
                points: scoring::points(placement, field as u32, field * 150, 150.0),
                earnings: 0,
                rebuy_count: 0,
                addon_count: 0,
                recorded_at: Utc::now(),
            });
        }
    }
    records
}

/// Benchmark the points formula over a full field
fn bench_points_full_field(c: &mut Criterion) {
    c.bench_function("points_full_field_40", |b| {
        b.iter(|| {
            (1..=40u32)
                .map(|p| scoring::points(black_box(p), 40, 6_000, 150.0))
                .sum::<f64>()
        });
    });
}

/// Benchmark leaderboard aggregation for growing seasons
fn bench_compute_rankings(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_rankings");

    for tournaments in [10, 50, 200] {
        let records = season(tournaments, 30);
        group.bench_with_input(
            BenchmarkId::from_parameter(tournaments),
            &records,
            |b, records| {
                b.iter(|| compute_rankings(black_box(records)));
            },
        );
    }

    group.finish();
}

/// Benchmark settling a poll with many voters
fn bench_pari_mutuel(c: &mut Criterion) {
    let votes: Vec<BettingVote> = (1..=500)
        .map(|i| BettingVote {
            id: i,
            poll_id: 1,
            player_id: i,
            option_id: i % 3,
            bet_amount: 10 + i * 7 % 90,
            winnings: 0,
            created_at: Utc::now(),
        })
        .collect();

    c.bench_function("pari_mutuel_500_votes", |b| {
        b.iter(|| pari_mutuel(black_box(&votes), 1));
    });
}

/// Benchmark an hour of timer ticks
fn bench_timer_hour(c: &mut Criterion) {
    let blinds = standard_structure(900);

    c.bench_function("timer_3600_ticks", |b| {
        b.iter(|| {
            let mut engine = TimerEngine::new(&blinds);
            engine.start();
            for _ in 0..3600 {
                black_box(engine.tick());
            }
            engine.state()
        });
    });
}

criterion_group!(
    scoring_benches,
    bench_points_full_field,
    bench_compute_rankings,
);

criterion_group!(live_operations, bench_pari_mutuel, bench_timer_hour);

criterion_main!(scoring_benches, live_operations);
