//! Blind structure and timer state models.

use serde::{Deserialize, Serialize};

/// Timer ID type. There is one timer per tournament.
pub type TimerId = i64;

/// A blind level as configured by the tournament director.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindLevel {
    /// Level number as shown to players (1-indexed)
    pub level: u32,
    pub small_blind: i64,
    pub big_blind: i64,
    #[serde(default)]
    pub ante: i64,
    /// Duration of this level in seconds; 0 means "use the default"
    pub duration_secs: u32,
    /// Length of a break played right after this level
    #[serde(default)]
    pub break_duration_secs: Option<u32>,
}

impl BlindLevel {
    /// Create a new blind level
    pub fn new(level: u32, small_blind: i64, big_blind: i64, duration_secs: u32) -> Self {
        Self {
            level,
            small_blind,
            big_blind,
            ante: 0,
            duration_secs,
            break_duration_secs: None,
        }
    }

    /// Create a blind level with ante
    pub fn with_ante(mut self, ante: i64) -> Self {
        self.ante = ante;
        self
    }

    /// Follow this level with a break
    pub fn with_break(mut self, duration_secs: u32) -> Self {
        self.break_duration_secs = Some(duration_secs);
        self
    }
}

/// A level as the timer runs it. Breaks are levels of their own with zero
/// blinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerLevel {
    /// Blind level number; 0 for breaks
    pub level: u32,
    pub small_blind: i64,
    pub big_blind: i64,
    pub ante: i64,
    pub duration_secs: u32,
    pub is_break: bool,
}

impl From<&BlindLevel> for TimerLevel {
    fn from(blind: &BlindLevel) -> Self {
        Self {
            level: blind.level,
            small_blind: blind.small_blind,
            big_blind: blind.big_blind,
            ante: blind.ante,
            duration_secs: blind.duration_secs,
            is_break: false,
        }
    }
}

/// Expand a blind structure into timer levels, inserting a break level
/// after every level that carries a positive break duration.
pub fn expand_levels(blinds: &[BlindLevel]) -> Vec<TimerLevel> {
    let mut levels = Vec::with_capacity(blinds.len());
    for blind in blinds {
        levels.push(TimerLevel::from(blind));
        if let Some(secs) = blind.break_duration_secs.filter(|&s| s > 0) {
            levels.push(TimerLevel {
                level: 0,
                small_blind: 0,
                big_blind: 0,
                ante: 0,
                duration_secs: secs,
                is_break: true,
            });
        }
    }
    levels
}

/// Default structure: twelve levels with breaks after levels 4 and 8.
pub fn standard_structure(level_secs: u32) -> Vec<BlindLevel> {
    let blinds: [(i64, i64, i64); 12] = [
        (25, 50, 0),
        (50, 100, 0),
        (75, 150, 0),
        (100, 200, 25),
        (150, 300, 25),
        (200, 400, 50),
        (300, 600, 75),
        (400, 800, 100),
        (500, 1000, 100),
        (700, 1400, 200),
        (1000, 2000, 300),
        (1500, 3000, 400),
    ];

    blinds
        .iter()
        .enumerate()
        .map(|(i, &(sb, bb, ante))| {
            let level = BlindLevel::new(i as u32 + 1, sb, bb, level_secs).with_ante(ante);
            if level.level % 4 == 0 && level.level < 12 {
                level.with_break(600)
            } else {
                level
            }
        })
        .collect()
}

/// Coarse timer state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    Stopped,
    Running,
    Paused,
}

/// Live timer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimerState {
    /// Index into the expanded levels
    pub current_level: usize,
    pub time_remaining: u32,
    pub is_running: bool,
    pub is_paused: bool,
}

impl TimerState {
    pub fn phase(&self) -> TimerPhase {
        match (self.is_running, self.is_paused) {
            (false, _) => TimerPhase::Stopped,
            (true, false) => TimerPhase::Running,
            (true, true) => TimerPhase::Paused,
        }
    }
}

/// Countdown to the next break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakCountdown {
    /// Index of the break level
    pub break_index: usize,
    /// Seconds until the break starts
    pub starts_in_secs: u64,
    pub break_secs: u32,
}

/// What displays render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub timer_id: TimerId,
    pub state: TimerState,
    pub phase: TimerPhase,
    pub level: Option<TimerLevel>,
    pub next_level: Option<TimerLevel>,
    pub level_count: usize,
    pub next_break: Option<BreakCountdown>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breaks_are_inserted_after_their_level() {
        let blinds = vec![
            BlindLevel::new(1, 25, 50, 900).with_break(300),
            BlindLevel::new(2, 50, 100, 900).with_break(0),
            BlindLevel::new(3, 75, 150, 900),
        ];
        let levels = expand_levels(&blinds);

        assert_eq!(levels.len(), 4);
        assert!(!levels[0].is_break);
        assert!(levels[1].is_break);
        assert_eq!(levels[1].duration_secs, 300);
        assert_eq!(levels[1].big_blind, 0);
        assert_eq!(levels[2].level, 2);
        assert_eq!(levels[3].level, 3);
    }

    #[test]
    fn test_standard_structure() {
        let blinds = standard_structure(1200);
        assert_eq!(blinds.len(), 12);
        assert!(blinds.iter().all(|b| b.duration_secs == 1200));
        assert_eq!(expand_levels(&blinds).len(), 14);
        assert_eq!(blinds[3].break_duration_secs, Some(600));
        assert_eq!(blinds[11].break_duration_secs, None);
    }

    #[test]
    fn test_phase() {
        let mut state = TimerState::default();
        assert_eq!(state.phase(), TimerPhase::Stopped);
        state.is_running = true;
        assert_eq!(state.phase(), TimerPhase::Running);
        state.is_paused = true;
        assert_eq!(state.phase(), TimerPhase::Paused);
    }
}
