// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Serialize;
use std::fmt;

/// What the scheduler does when the hardware reports that a run finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// Nothing requested.
    #[default]
    Idle,
    /// One run requested; return to idle when it finishes.
    SingleShot,
    /// Repeat the same run until stopped.
    Continuous,
    /// Step through the sweep index tuples until stopped or the iteration limit.
    Sweeping,
    /// Stopped by command or by a hardware fault. Late completions are ignored.
    Stopped,
}

impl SchedulerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulerState::Idle => "idle",
            SchedulerState::SingleShot => "single_shot",
            SchedulerState::Continuous => "continuous",
            SchedulerState::Sweeping => "sweeping",
            SchedulerState::Stopped => "stopped",
        }
    }

    /// Whether a run finishing leads to another run.
    pub fn is_repeating(&self) -> bool {
        matches!(self, SchedulerState::Continuous | SchedulerState::Sweeping)
    }

    /// Idle or stopped.
    pub fn is_at_rest(&self) -> bool {
        matches!(self, SchedulerState::Idle | SchedulerState::Stopped)
    }
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the scheduler, published after every command and completion.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SchedulerStatus {
    pub state: SchedulerState,
    /// Id the next dispatched run will carry.
    pub next_run_id: u64,
    /// Position in the sweep of the current or last run.
    pub run_index: usize,
    /// Index tuples per sweep pass, 0 outside a sweep.
    pub sweep_length: usize,
    /// Completed sweep passes.
    pub iteration: u64,
    pub shuffle: bool,
    /// Whether any output system has not yet reported completion.
    pub running: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_classification() {
        assert!(SchedulerState::Sweeping.is_repeating());
        assert!(!SchedulerState::SingleShot.is_repeating());
        assert!(SchedulerState::Stopped.is_at_rest());
        assert!(!SchedulerState::Continuous.is_at_rest());
        assert_eq!(SchedulerState::SingleShot.to_string(), "single_shot");
    }
}
