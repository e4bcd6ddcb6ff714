//! Blind-level clock.
//!
//! The engine is a plain state machine with no notion of wall-clock time;
//! [`super::actor::TimerActor`] calls [`TimerEngine::tick`] once per second.

use super::checkpoint::Checkpoint;
use super::models::{
    BlindLevel, BreakCountdown, TimerId, TimerLevel, TimerSnapshot, TimerState, expand_levels,
};
use crate::config::DEFAULT_LEVEL_SECS;
use chrono::{DateTime, Utc};

/// Result of a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Timer stopped or paused
    Idle,
    Ticked,
    /// Moved on to the level at this index
    LevelAdvanced(usize),
    /// Final level ran out; the clock stays at zero
    Parked,
}

#[derive(Debug, Clone)]
pub struct TimerEngine {
    levels: Vec<TimerLevel>,
    state: TimerState,
    default_level_secs: u32,
}

impl TimerEngine {
    /// Create a stopped timer at level 0.
    pub fn new(blinds: &[BlindLevel]) -> Self {
        Self::with_default_level_secs(blinds, DEFAULT_LEVEL_SECS)
    }

    /// Create a timer whose zero-duration levels last `default_level_secs`.
    pub fn with_default_level_secs(blinds: &[BlindLevel], default_level_secs: u32) -> Self {
        let default_level_secs = if default_level_secs == 0 {
            DEFAULT_LEVEL_SECS
        } else {
            default_level_secs
        };

        let mut engine = Self {
            levels: Vec::new(),
            state: TimerState::default(),
            default_level_secs,
        };
        engine.load_levels(blinds);
        engine
    }

    /// Effective duration of the level at `index`, 0 if there is none.
    pub fn duration_of(&self, index: usize) -> u32 {
        match self.levels.get(index) {
            Some(level) if level.duration_secs > 0 => level.duration_secs,
            Some(_) => self.default_level_secs,
            None => 0,
        }
    }

    pub fn start(&mut self) {
        if self.levels.is_empty() {
            return;
        }
        self.state.time_remaining = self.duration_of(self.state.current_level);
        self.state.is_running = true;
        self.state.is_paused = false;
    }

    pub fn pause(&mut self) {
        if self.state.is_running {
            self.state.is_paused = true;
        }
    }

    pub fn resume(&mut self) {
        if self.state.is_running {
            self.state.is_paused = false;
        }
    }

    /// Advance the clock by one second.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.state.is_running || self.state.is_paused {
            return TickOutcome::Idle;
        }

        self.state.time_remaining = self.state.time_remaining.saturating_sub(1);
        if self.state.time_remaining > 0 {
            return TickOutcome::Ticked;
        }

        let next = self.state.current_level + 1;
        if next < self.levels.len() {
            self.jump_to(next);
            TickOutcome::LevelAdvanced(next)
        } else {
            TickOutcome::Parked
        }
    }

    /// Move to the next level. Does nothing on the final level.
    pub fn next_level(&mut self) -> bool {
        let next = self.state.current_level + 1;
        if next >= self.levels.len() {
            return false;
        }
        self.jump_to(next);
        true
    }

    /// Move to the previous level. Does nothing on level 0.
    pub fn prev_level(&mut self) -> bool {
        let Some(prev) = self.state.current_level.checked_sub(1) else {
            return false;
        };
        self.jump_to(prev);
        true
    }

    /// Jump to the level at `index`; out-of-range indices are ignored.
    pub fn set_current_level(&mut self, index: usize) -> bool {
        if index >= self.levels.len() {
            return false;
        }
        self.jump_to(index);
        true
    }

    /// Back to level 0, stopped.
    pub fn reset(&mut self) {
        self.state = TimerState {
            current_level: 0,
            time_remaining: self.duration_of(0),
            is_running: false,
            is_paused: false,
        };
    }

    /// Set the time left in the current level, clamped to its duration.
    pub fn seek(&mut self, secs: u32) {
        self.state.time_remaining = secs.min(self.duration_of(self.state.current_level));
    }

    /// Replace the blind structure. The timer goes back to level 0 with
    /// level 0's duration; running and paused flags are kept.
    pub fn load_levels(&mut self, blinds: &[BlindLevel]) {
        self.levels = expand_levels(blinds);
        self.state.current_level = 0;
        self.state.time_remaining = self.duration_of(0);
    }

    /// Seconds until the next break level starts, counted from the current
    /// clock. `None` if no break lies ahead.
    pub fn time_until_break(&self) -> Option<BreakCountdown> {
        let current = self.state.current_level;
        self.levels.get(current)?;
        // A break in progress does not count; look past it.
        self.break_after(current + 1, self.state.time_remaining as u64)
    }

    fn break_after(&self, from: usize, mut starts_in_secs: u64) -> Option<BreakCountdown> {
        for index in from..self.levels.len() {
            if self.levels[index].is_break {
                return Some(BreakCountdown {
                    break_index: index,
                    starts_in_secs,
                    break_secs: self.duration_of(index),
                });
            }
            starts_in_secs += self.duration_of(index) as u64;
        }
        None
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn levels(&self) -> &[TimerLevel] {
        &self.levels
    }

    /// The level being played
    pub fn current(&self) -> Option<&TimerLevel> {
        self.levels.get(self.state.current_level)
    }

    pub fn snapshot(&self, timer_id: TimerId) -> TimerSnapshot {
        TimerSnapshot {
            timer_id,
            state: self.state,
            phase: self.state.phase(),
            level: self.current().cloned(),
            next_level: self.levels.get(self.state.current_level + 1).cloned(),
            level_count: self.levels.len(),
            next_break: self.time_until_break(),
        }
    }

    pub fn checkpoint(&self, now: DateTime<Utc>) -> Checkpoint {
        Checkpoint::capture(&self.state, now)
    }

    /// Put the clock back where a checkpoint left it. The level index and
    /// the remaining time are clamped to the loaded structure.
    pub fn restore(&mut self, checkpoint: &Checkpoint) {
        if self.levels.is_empty() {
            return;
        }
        let level = checkpoint.current_level.min(self.levels.len() - 1);
        self.state = TimerState {
            current_level: level,
            time_remaining: checkpoint.time_remaining.min(self.duration_of(level)),
            is_running: checkpoint.is_running,
            is_paused: checkpoint.is_running && checkpoint.is_paused,
        };
    }

    fn jump_to(&mut self, index: usize) {
        self.state.current_level = index;
        self.state.time_remaining = self.duration_of(index);
        self.state.is_paused = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::models::TimerPhase;

    fn two_levels() -> Vec<BlindLevel> {
        vec![
            BlindLevel::new(1, 25, 50, 900),
            BlindLevel::new(2, 50, 100, 900),
        ]
    }

    #[test]
    fn test_start_requires_levels() {
        let mut engine = TimerEngine::new(&[]);
        engine.start();
        assert_eq!(engine.state().phase(), TimerPhase::Stopped);
        assert_eq!(engine.tick(), TickOutcome::Idle);
    }

    #[test]
    fn test_full_walk_advances_then_parks() {
        let mut engine = TimerEngine::new(&two_levels());
        engine.start();

        for _ in 0..899 {
            assert_eq!(engine.tick(), TickOutcome::Ticked);
        }
        assert_eq!(engine.tick(), TickOutcome::LevelAdvanced(1));
        assert_eq!(engine.state().current_level, 1);
        assert_eq!(engine.state().time_remaining, 900);

        for _ in 0..899 {
            engine.tick();
        }
        assert_eq!(engine.tick(), TickOutcome::Parked);
        assert_eq!(engine.state().time_remaining, 0);
        assert_eq!(engine.state().current_level, 1);
        assert!(engine.state().is_running);

        // Stays parked
        assert_eq!(engine.tick(), TickOutcome::Parked);
        assert_eq!(engine.state().time_remaining, 0);
    }

    #[test]
    fn test_pause_blocks_ticks() {
        let mut engine = TimerEngine::new(&two_levels());
        engine.start();
        engine.tick();
        engine.pause();
        assert_eq!(engine.tick(), TickOutcome::Idle);
        assert_eq!(engine.state().time_remaining, 899);

        engine.resume();
        engine.tick();
        assert_eq!(engine.state().time_remaining, 898);
    }

    #[test]
    fn test_pause_is_ignored_when_stopped() {
        let mut engine = TimerEngine::new(&two_levels());
        engine.pause();
        assert!(!engine.state().is_paused);
    }

    #[test]
    fn test_level_navigation_clears_pause_and_clamps() {
        let mut engine = TimerEngine::new(&two_levels());
        engine.start();
        engine.pause();

        assert!(engine.next_level());
        assert!(!engine.state().is_paused);
        assert_eq!(engine.state().time_remaining, 900);
        assert!(!engine.next_level());
        assert_eq!(engine.state().current_level, 1);

        assert!(engine.prev_level());
        assert!(!engine.prev_level());
        assert_eq!(engine.state().current_level, 0);

        assert!(!engine.set_current_level(2));
        assert!(engine.set_current_level(1));
        assert_eq!(engine.state().current_level, 1);
    }

    #[test]
    fn test_reset() {
        let mut engine = TimerEngine::new(&two_levels());
        engine.start();
        engine.next_level();
        engine.tick();
        engine.reset();

        let state = engine.state();
        assert_eq!(state.current_level, 0);
        assert_eq!(state.time_remaining, 900);
        assert!(!state.is_running);
        assert!(!state.is_paused);
    }

    #[test]
    fn test_zero_duration_uses_default() {
        let blinds = vec![BlindLevel::new(1, 25, 50, 0)];
        assert_eq!(TimerEngine::new(&blinds).duration_of(0), 900);
        assert_eq!(
            TimerEngine::with_default_level_secs(&blinds, 1200).duration_of(0),
            1200
        );
    }

    #[test]
    fn test_seek_is_clamped() {
        let mut engine = TimerEngine::new(&two_levels());
        engine.seek(10_000);
        assert_eq!(engine.state().time_remaining, 900);
        engine.seek(42);
        assert_eq!(engine.state().time_remaining, 42);
    }

    #[test]
    fn test_load_levels_restarts_at_first_level() {
        let mut engine = TimerEngine::new(&two_levels());
        engine.start();
        engine.next_level();

        engine.load_levels(&[BlindLevel::new(1, 100, 200, 600)]);
        assert_eq!(engine.state().current_level, 0);
        assert_eq!(engine.state().time_remaining, 600);
        assert_eq!(engine.levels().len(), 1);
    }

    #[test]
    fn test_time_until_break() {
        let blinds = vec![
            BlindLevel::new(1, 25, 50, 600),
            BlindLevel::new(2, 50, 100, 600).with_break(300),
            BlindLevel::new(3, 75, 150, 600),
        ];
        let mut engine = TimerEngine::new(&blinds);
        engine.start();
        engine.seek(100);

        let countdown = engine.time_until_break().unwrap();
        assert_eq!(countdown.break_index, 2);
        assert_eq!(countdown.starts_in_secs, 700);
        assert_eq!(countdown.break_secs, 300);

        engine.set_current_level(2);
        assert_eq!(engine.time_until_break(), None);
    }

    #[test]
    fn test_restore_clamps_to_structure() {
        let mut engine = TimerEngine::new(&two_levels());
        let checkpoint = Checkpoint {
            current_level: 7,
            time_remaining: 5000,
            is_running: true,
            is_paused: true,
            saved_at: Utc::now(),
        };
        engine.restore(&checkpoint);

        let state = engine.state();
        assert_eq!(state.current_level, 1);
        assert_eq!(state.time_remaining, 900);
        assert!(state.is_running && state.is_paused);
    }

    #[test]
    fn test_checkpoint_rounds_to_minute() {
        let mut engine = TimerEngine::new(&two_levels());
        engine.start();
        for _ in 0..30 {
            engine.tick();
        }
        assert_eq!(engine.checkpoint(Utc::now()).time_remaining, 900);
    }

    #[test]
    fn test_snapshot() {
        let mut engine = TimerEngine::new(&standard_blinds());
        engine.start();
        let snapshot = engine.snapshot(3);
        assert_eq!(snapshot.timer_id, 3);
        assert_eq!(snapshot.phase, TimerPhase::Running);
        assert_eq!(snapshot.level.unwrap().big_blind, 50);
        assert_eq!(snapshot.next_level.unwrap().big_blind, 100);
        assert_eq!(snapshot.level_count, 14);
        assert_eq!(snapshot.next_break.unwrap().break_index, 4);
    }

    fn standard_blinds() -> Vec<BlindLevel> {
        crate::timer::models::standard_structure(900)
    }
}
