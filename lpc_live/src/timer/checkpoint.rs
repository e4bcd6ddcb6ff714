//! Persisted timer checkpoints.
//!
//! Only whole minutes survive a reload: `time_remaining` is rounded up to
//! the next minute mark when a checkpoint is taken. Restoring puts the clock
//! back at that mark; callers that want to account for the time the process
//! was down can use [`Checkpoint::elapsed_since`].

use super::errors::TimerResult;
use super::models::{TimerId, TimerState};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Timer state as persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub current_level: usize,
    /// Seconds, always a multiple of 60
    pub time_remaining: u32,
    pub is_running: bool,
    pub is_paused: bool,
    pub saved_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn capture(state: &TimerState, saved_at: DateTime<Utc>) -> Self {
        Self {
            current_level: state.current_level,
            time_remaining: state.time_remaining.div_ceil(60).saturating_mul(60),
            is_running: state.is_running,
            is_paused: state.is_paused,
            saved_at,
        }
    }

    /// Wall-clock time since the checkpoint was taken, zero if `now` is
    /// earlier.
    pub fn elapsed_since(&self, now: DateTime<Utc>) -> std::time::Duration {
        (now - self.saved_at).to_std().unwrap_or_default()
    }
}

/// Where checkpoints live
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn save(&self, timer_id: TimerId, checkpoint: &Checkpoint) -> TimerResult<()>;

    async fn load(&self, timer_id: TimerId) -> TimerResult<Option<Checkpoint>>;
}

/// Checkpoints held in process memory
#[derive(Default)]
pub struct MemoryCheckpointStore {
    checkpoints: RwLock<HashMap<TimerId, Checkpoint>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn save(&self, timer_id: TimerId, checkpoint: &Checkpoint) -> TimerResult<()> {
        self.checkpoints.write().await.insert(timer_id, *checkpoint);
        Ok(())
    }

    async fn load(&self, timer_id: TimerId) -> TimerResult<Option<Checkpoint>> {
        Ok(self.checkpoints.read().await.get(&timer_id).copied())
    }
}

/// One JSON file per timer under a directory.
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, timer_id: TimerId) -> PathBuf {
        self.dir.join(format!("timer-{timer_id}.json"))
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn save(&self, timer_id: TimerId, checkpoint: &Checkpoint) -> TimerResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(timer_id);
        let tmp = path.with_extension("json.tmp");

        let json = serde_json::to_vec_pretty(checkpoint)?;
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn load(&self, timer_id: TimerId) -> TimerResult<Option<Checkpoint>> {
        match tokio::fs::read(self.path_for(timer_id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(time_remaining: u32) -> TimerState {
        TimerState {
            current_level: 2,
            time_remaining,
            is_running: true,
            is_paused: false,
        }
    }

    #[test]
    fn test_capture_rounds_up_to_minute() {
        let now = Utc::now();
        assert_eq!(Checkpoint::capture(&state(600), now).time_remaining, 600);
        assert_eq!(Checkpoint::capture(&state(541), now).time_remaining, 600);
        assert_eq!(Checkpoint::capture(&state(1), now).time_remaining, 60);
        assert_eq!(Checkpoint::capture(&state(0), now).time_remaining, 0);
    }

    #[test]
    fn test_elapsed_since() {
        let saved = Utc::now();
        let checkpoint = Checkpoint::capture(&state(60), saved);
        let later = saved + chrono::Duration::seconds(42);
        assert_eq!(checkpoint.elapsed_since(later).as_secs(), 42);
        assert_eq!(checkpoint.elapsed_since(saved - chrono::Duration::seconds(5)).as_secs(), 0);
    }

    #[tokio::test]
    async fn test_file_store_round_trip_and_missing() {
        let dir = std::env::temp_dir().join(format!("lpc-checkpoints-{}", std::process::id()));
        let store = FileCheckpointStore::new(&dir);

        assert_eq!(store.load(5).await.unwrap(), None);

        let checkpoint = Checkpoint::capture(&state(125), Utc::now());
        store.save(5, &checkpoint).await.unwrap();
        assert_eq!(store.load(5).await.unwrap(), Some(checkpoint));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
