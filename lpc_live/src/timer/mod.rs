//! Tournament clock: blind levels, breaks and a once-per-second actor.

pub mod actor;
pub mod checkpoint;
pub mod engine;
pub mod errors;
pub mod models;
pub mod registry;

pub use actor::{TimerActor, TimerCommand, TimerHandle, TimerMessage};
pub use checkpoint::{Checkpoint, CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
pub use engine::{TickOutcome, TimerEngine};
pub use errors::{TimerError, TimerResult};
pub use models::{
    BlindLevel, BreakCountdown, TimerId, TimerLevel, TimerPhase, TimerSnapshot, TimerState,
    expand_levels, standard_structure,
};
pub use registry::TimerRegistry;
