//! Live leaderboard kept in step with score changes.

use super::aggregator::{RankingEntry, compute_rankings};
use crate::db::{ScoreRepository, StoreResult};
use crate::events::EventBus;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

struct Snapshot {
    rankings: Arc<Vec<RankingEntry>>,
    computed_at: Option<DateTime<Utc>>,
}

/// The last computed leaderboard.
///
/// Every refresh is a full recompute from the score store. Refreshes run
/// one at a time so a slow, older read never replaces a newer one.
pub struct LiveStandings {
    scores: Arc<dyn ScoreRepository>,
    snapshot: RwLock<Snapshot>,
    refreshing: Mutex<()>,
}

impl LiveStandings {
    pub fn new(scores: Arc<dyn ScoreRepository>) -> Self {
        Self {
            scores,
            snapshot: RwLock::new(Snapshot {
                rankings: Arc::new(Vec::new()),
                computed_at: None,
            }),
            refreshing: Mutex::new(()),
        }
    }

    /// Recompute from the store and replace the cached leaderboard.
    pub async fn refresh(&self) -> StoreResult<Arc<Vec<RankingEntry>>> {
        let _refreshing = self.refreshing.lock().await;
        let records = self.scores.list_scores().await?;
        let rankings = Arc::new(compute_rankings(&records));

        let mut snapshot = self.snapshot.write().await;
        snapshot.rankings = rankings.clone();
        snapshot.computed_at = Some(Utc::now());
        Ok(rankings)
    }

    pub async fn rankings(&self) -> Arc<Vec<RankingEntry>> {
        self.snapshot.read().await.rankings.clone()
    }

    pub async fn top(&self, n: usize) -> Vec<RankingEntry> {
        self.rankings().await.iter().take(n).cloned().collect()
    }

    pub async fn computed_at(&self) -> Option<DateTime<Utc>> {
        self.snapshot.read().await.computed_at
    }

    /// Refresh on every event that can change score records. A lagged
    /// receiver refreshes once and carries on; the task ends when the bus
    /// is dropped.
    pub fn spawn_refresh(self: &Arc<Self>, events: &EventBus) -> JoinHandle<()> {
        let standings = Arc::clone(self);
        let mut rx = events.subscribe();

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) if event.affects_standings() => {}
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        log::warn!("Standings refresh lagged, skipped {} events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }

                if let Err(e) = standings.refresh().await {
                    log::error!("Failed to refresh standings: {}", e);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::players::PlayerId;
    use crate::tournament::{ScoreRecord, TournamentId};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::{Duration, sleep};

    /// First read is slow and sees no records; later reads see one.
    struct SlowFirstRead {
        reads: AtomicUsize,
    }

    #[async_trait]
    impl ScoreRepository for SlowFirstRead {
        async fn upsert_score(&self, _record: &ScoreRecord) -> StoreResult<()> {
            Ok(())
        }

        async fn delete_score(&self, _tournament_id: TournamentId, _player_id: PlayerId) -> StoreResult<bool> {
            Ok(false)
        }

        async fn list_scores(&self) -> StoreResult<Vec<ScoreRecord>> {
            if self.reads.fetch_add(1, Ordering::SeqCst) == 0 {
                sleep(Duration::from_millis(100)).await;
                return Ok(Vec::new());
            }
            Ok(vec![ScoreRecord {
                tournament_id: 1,
                player_id: 7,
                player_name: "Ada".to_string(),
                placement: 1,
                points: 12.5,
                earnings: 0,
                rebuy_count: 0,
                addon_count: 0,
                recorded_at: Utc::now(),
            }])
        }

        async fn tournament_scores(&self, _tournament_id: TournamentId) -> StoreResult<Vec<ScoreRecord>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_refreshes_keep_newest_read() {
        let standings = LiveStandings::new(Arc::new(SlowFirstRead {
            reads: AtomicUsize::new(0),
        }));
        assert!(standings.computed_at().await.is_none());

        let (older, newer) = tokio::join!(standings.refresh(), standings.refresh());
        assert!(older.unwrap().is_empty());
        assert_eq!(newer.unwrap().len(), 1);

        assert_eq!(standings.rankings().await.len(), 1);
        assert_eq!(standings.top(5).await[0].player_id, 7);
        assert!(standings.computed_at().await.is_some());
    }
}
