//! Timer actor: one tokio task per tournament clock.

use super::{
    checkpoint::{Checkpoint, CheckpointStore},
    engine::{TickOutcome, TimerEngine},
    errors::{TimerError, TimerResult},
    models::{BlindLevel, TimerId, TimerSnapshot},
};
use chrono::Utc;
use std::sync::Arc;
use tokio::{
    sync::{mpsc, oneshot, watch},
    time::{Duration, Instant, Interval, MissedTickBehavior, interval_at},
};

const TICK_PERIOD: Duration = Duration::from_secs(1);
const INBOX_CAPACITY: usize = 32;

/// Director commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerCommand {
    Start,
    Pause,
    Resume,
    Reset,
    NextLevel,
    PrevLevel,
    SetLevel(usize),
    Seek(u32),
    LoadLevels(Vec<BlindLevel>),
}

/// Messages that can be sent to a timer actor
#[derive(Debug)]
pub enum TimerMessage {
    Command {
        command: TimerCommand,
        response: oneshot::Sender<TimerSnapshot>,
    },
    GetSnapshot {
        response: oneshot::Sender<TimerSnapshot>,
    },
    Shutdown,
}

/// Timer actor handle for sending messages
#[derive(Clone)]
pub struct TimerHandle {
    sender: mpsc::Sender<TimerMessage>,
    snapshots: watch::Receiver<TimerSnapshot>,
    timer_id: TimerId,
}

impl TimerHandle {
    pub fn timer_id(&self) -> TimerId {
        self.timer_id
    }

    /// Apply a command and return the resulting snapshot
    pub async fn command(&self, command: TimerCommand) -> TimerResult<TimerSnapshot> {
        let (response, rx) = oneshot::channel();
        self.send(TimerMessage::Command { command, response }).await?;
        rx.await.map_err(|_| TimerError::Closed(self.timer_id))
    }

    /// Ask the actor for its state
    pub async fn snapshot(&self) -> TimerResult<TimerSnapshot> {
        let (response, rx) = oneshot::channel();
        self.send(TimerMessage::GetSnapshot { response }).await?;
        rx.await.map_err(|_| TimerError::Closed(self.timer_id))
    }

    /// Last published snapshot, without a round trip
    pub fn latest(&self) -> TimerSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receive a snapshot on every change
    pub fn subscribe(&self) -> watch::Receiver<TimerSnapshot> {
        self.snapshots.clone()
    }

    pub async fn shutdown(&self) -> TimerResult<()> {
        self.send(TimerMessage::Shutdown).await
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Resolves once the actor has exited and written its final checkpoint.
    pub async fn closed(&self) {
        self.sender.closed().await
    }

    async fn send(&self, message: TimerMessage) -> TimerResult<()> {
        self.sender
            .send(message)
            .await
            .map_err(|_| TimerError::Closed(self.timer_id))
    }
}

/// Drives a [`TimerEngine`] once per second.
pub struct TimerActor {
    id: TimerId,
    engine: TimerEngine,
    inbox: mpsc::Receiver<TimerMessage>,
    snapshots: watch::Sender<TimerSnapshot>,
    checkpoints: Arc<dyn CheckpointStore>,
    /// Last checkpoint written, to skip identical saves while parked
    last_saved: Option<Checkpoint>,
    ticker: Interval,
}

impl TimerActor {
    pub fn new(
        id: TimerId,
        engine: TimerEngine,
        checkpoints: Arc<dyn CheckpointStore>,
    ) -> (Self, TimerHandle) {
        let (sender, inbox) = mpsc::channel(INBOX_CAPACITY);
        let (snapshots, snapshot_rx) = watch::channel(engine.snapshot(id));

        let mut ticker = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let actor = Self {
            id,
            engine,
            inbox,
            snapshots,
            checkpoints,
            last_saved: None,
            ticker,
        };

        let handle = TimerHandle {
            sender,
            snapshots: snapshot_rx,
            timer_id: id,
        };

        (actor, handle)
    }

    /// Run the timer event loop until shutdown or until every handle is
    /// dropped.
    pub async fn run(mut self) {
        log::info!("Timer {} starting", self.id);

        loop {
            tokio::select! {
                message = self.inbox.recv() => {
                    match message {
                        Some(TimerMessage::Shutdown) | None => break,
                        Some(message) => self.handle_message(message).await,
                    }
                }

                _ = self.ticker.tick() => {
                    self.tick().await;
                }
            }
        }

        self.persist(true).await;
        log::info!("Timer {} stopped", self.id);
    }

    async fn handle_message(&mut self, message: TimerMessage) {
        match message {
            TimerMessage::Command { command, response } => {
                self.apply(command);
                self.publish();
                self.persist(true).await;
                let _ = response.send(self.engine.snapshot(self.id));
            }

            TimerMessage::GetSnapshot { response } => {
                let _ = response.send(self.engine.snapshot(self.id));
            }

            TimerMessage::Shutdown => {}
        }
    }

    fn apply(&mut self, command: TimerCommand) {
        log::debug!("Timer {}: {:?}", self.id, command);

        match command {
            TimerCommand::Start => {
                self.engine.start();
                self.ticker.reset();
            }
            TimerCommand::Pause => self.engine.pause(),
            TimerCommand::Resume => {
                self.engine.resume();
                self.ticker.reset();
            }
            TimerCommand::Reset => self.engine.reset(),
            TimerCommand::NextLevel => {
                self.engine.next_level();
            }
            TimerCommand::PrevLevel => {
                self.engine.prev_level();
            }
            TimerCommand::SetLevel(index) => {
                if !self.engine.set_current_level(index) {
                    log::warn!("Timer {}: level {} out of range", self.id, index);
                }
            }
            TimerCommand::Seek(secs) => self.engine.seek(secs),
            TimerCommand::LoadLevels(blinds) => self.engine.load_levels(&blinds),
        }
    }

    async fn tick(&mut self) {
        match self.engine.tick() {
            TickOutcome::Idle => {}
            TickOutcome::Ticked => {
                self.publish();
                if self.engine.state().time_remaining % 60 == 0 {
                    self.persist(false).await;
                }
            }
            TickOutcome::LevelAdvanced(index) => {
                log::info!("Timer {} advanced to level index {}", self.id, index);
                self.publish();
                self.persist(false).await;
            }
            TickOutcome::Parked => {
                self.publish();
                self.persist(false).await;
            }
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.engine.snapshot(self.id));
    }

    async fn persist(&mut self, force: bool) {
        let checkpoint = self.engine.checkpoint(Utc::now());
        if !force
            && let Some(last) = &self.last_saved
            && same_position(last, &checkpoint)
        {
            return;
        }

        match self.checkpoints.save(self.id, &checkpoint).await {
            Ok(()) => self.last_saved = Some(checkpoint),
            Err(e) => log::error!("Timer {}: failed to save checkpoint: {}", self.id, e),
        }
    }
}

fn same_position(a: &Checkpoint, b: &Checkpoint) -> bool {
    a.current_level == b.current_level
        && a.time_remaining == b.time_remaining
        && a.is_running == b.is_running
        && a.is_paused == b.is_paused
}
