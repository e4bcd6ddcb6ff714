//! Registry of running timer actors, one per tournament.

use super::{
    actor::{TimerActor, TimerHandle},
    checkpoint::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore},
    engine::TimerEngine,
    errors::TimerResult,
    models::{BlindLevel, TimerId},
};
use crate::config::LiveConfig;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

/// Spawns timer actors on demand and hands out their handles.
#[derive(Clone)]
pub struct TimerRegistry {
    timers: Arc<RwLock<HashMap<TimerId, TimerHandle>>>,
    checkpoints: Arc<dyn CheckpointStore>,
    default_level_secs: u32,
}

impl TimerRegistry {
    pub fn new(checkpoints: Arc<dyn CheckpointStore>, default_level_secs: u32) -> Self {
        Self {
            timers: Arc::new(RwLock::new(HashMap::new())),
            checkpoints,
            default_level_secs,
        }
    }

    /// Checkpoints go to `checkpoint_dir` when configured, otherwise they
    /// are kept in memory.
    pub fn from_config(config: &LiveConfig) -> Self {
        let checkpoints: Arc<dyn CheckpointStore> = match &config.checkpoint_dir {
            Some(dir) => Arc::new(FileCheckpointStore::new(dir)),
            None => Arc::new(MemoryCheckpointStore::new()),
        };
        Self::new(checkpoints, config.default_level_secs)
    }

    /// Handle of a live timer
    pub async fn get(&self, timer_id: TimerId) -> Option<TimerHandle> {
        self.timers
            .read()
            .await
            .get(&timer_id)
            .filter(|handle| !handle.is_closed())
            .cloned()
    }

    /// Return the live timer, or spawn one over `blinds`. A fresh actor
    /// resumes from its last checkpoint if there is one.
    pub async fn get_or_spawn(
        &self,
        timer_id: TimerId,
        blinds: &[BlindLevel],
    ) -> TimerResult<TimerHandle> {
        let mut timers = self.timers.write().await;
        if let Some(handle) = timers.get(&timer_id)
            && !handle.is_closed()
        {
            return Ok(handle.clone());
        }

        let mut engine = TimerEngine::with_default_level_secs(blinds, self.default_level_secs);
        if let Some(checkpoint) = self.checkpoints.load(timer_id).await? {
            log::info!(
                "Timer {} resuming at level index {} with {}s left (saved {}s ago)",
                timer_id,
                checkpoint.current_level,
                checkpoint.time_remaining,
                checkpoint.elapsed_since(chrono::Utc::now()).as_secs()
            );
            engine.restore(&checkpoint);
        }

        let (actor, handle) = TimerActor::new(timer_id, engine, self.checkpoints.clone());
        tokio::spawn(actor.run());
        timers.insert(timer_id, handle.clone());

        Ok(handle)
    }

    /// Stop a timer. Its final checkpoint is written on the way out.
    pub async fn remove(&self, timer_id: TimerId) -> bool {
        let handle = self.timers.write().await.remove(&timer_id);
        match handle {
            Some(handle) => {
                if let Err(e) = handle.shutdown().await {
                    log::debug!("Timer {} already stopped: {}", timer_id, e);
                }
                true
            }
            None => false,
        }
    }

    /// Stop every timer and wait for their final checkpoints.
    pub async fn shutdown_all(&self) {
        let handles: Vec<_> = self.timers.write().await.drain().map(|(_, h)| h).collect();
        for handle in &handles {
            if let Err(e) = handle.shutdown().await {
                log::debug!("Timer {} already stopped: {}", handle.timer_id(), e);
            }
        }
        for handle in &handles {
            handle.closed().await;
        }
    }

    pub async fn timer_ids(&self) -> Vec<TimerId> {
        let mut ids: Vec<_> = self.timers.read().await.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::actor::TimerCommand;
    use crate::timer::models::TimerPhase;
    use tokio::time::Duration;

    fn blinds() -> Vec<BlindLevel> {
        vec![
            BlindLevel::new(1, 25, 50, 900),
            BlindLevel::new(2, 50, 100, 900),
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_or_spawn_reuses_live_timer() {
        let registry = TimerRegistry::new(Arc::new(MemoryCheckpointStore::new()), 900);
        assert!(registry.get(1).await.is_none());

        let first = registry.get_or_spawn(1, &blinds()).await.unwrap();
        first.command(TimerCommand::NextLevel).await.unwrap();

        let second = registry.get_or_spawn(1, &[]).await.unwrap();
        assert_eq!(second.snapshot().await.unwrap().state.current_level, 1);
        assert_eq!(registry.timer_ids().await, vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_respawn_resumes_from_checkpoint() {
        let registry = TimerRegistry::new(Arc::new(MemoryCheckpointStore::new()), 900);

        let handle = registry.get_or_spawn(7, &blinds()).await.unwrap();
        handle.command(TimerCommand::Start).await.unwrap();
        handle.command(TimerCommand::NextLevel).await.unwrap();
        tokio::time::sleep(Duration::from_millis(90_500)).await;

        assert!(registry.remove(7).await);
        assert!(!registry.remove(7).await);
        tokio::time::sleep(Duration::from_millis(10)).await;

        let resumed = registry.get_or_spawn(7, &blinds()).await.unwrap();
        let snapshot = resumed.snapshot().await.unwrap();
        assert_eq!(snapshot.state.current_level, 1);
        // 810s left, carried forward at the minute mark
        assert_eq!(snapshot.state.time_remaining, 840);
        assert_eq!(snapshot.phase, TimerPhase::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_all_writes_final_checkpoints() {
        let checkpoints = Arc::new(MemoryCheckpointStore::new());
        let registry = TimerRegistry::new(checkpoints.clone(), 900);

        let handle = registry.get_or_spawn(3, &blinds()).await.unwrap();
        handle.command(TimerCommand::Seek(125)).await.unwrap();
        registry.get_or_spawn(4, &blinds()).await.unwrap();

        registry.shutdown_all().await;

        assert!(handle.is_closed());
        assert!(registry.timer_ids().await.is_empty());
        let saved = checkpoints.load(3).await.unwrap().unwrap();
        assert_eq!(saved.time_remaining, 180);
        assert!(checkpoints.load(4).await.unwrap().is_some());
    }
}
