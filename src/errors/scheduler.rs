// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use super::{CompileError, ConfigurationError, HardwareError};

/// Commands the iteration scheduler refuses, and faults that end a run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulerError {
    /// A previous run still has output systems that have not reported completion.
    #[error("a run is already in progress")]
    RunInProgress,

    #[error("cannot start a run with unresolved variables: {}", .variables.join(", "))]
    UnresolvedVariables { variables: Vec<String> },

    #[error("cannot iterate: no swept variables")]
    NoSweepVariables,

    #[error("cannot iterate: invalid swept variables: {}", .variables.join(", "))]
    InvalidSweepVariables { variables: Vec<String> },

    #[error("cannot iterate: sweep has more than {limit} points")]
    SweepTooLarge { limit: usize },

    /// The compiled timeline has errors and partial timelines are not allowed.
    #[error("timeline has {} compile error(s); first: {}", .errors.len(), .errors.first().map(|e| e.to_string()).unwrap_or_default())]
    Compile { errors: Vec<CompileError> },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Hardware(#[from] HardwareError),

    /// The scheduler task is no longer running.
    #[error("scheduler has shut down")]
    ShutDown,
}
