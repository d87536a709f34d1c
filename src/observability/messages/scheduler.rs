// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the iteration scheduler and its collaborators.
//!
//! This module contains message types for logging events related to:
//! * Run lifecycle (start, refusal, stop)
//! * Sweep progress
//! * Storage and notification failures, which never stop a run

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::path::Path;
use tracing::Span;

/// The scheduler task is accepting commands.
///
/// # Log Level
/// `info!` - Once per process
pub struct SchedulerStarted<'a> {
    pub next_run_id: u64,
    pub systems: &'a [&'a str],
}

impl Display for SchedulerStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Scheduler started: next run {}, output systems [{}]",
            self.next_run_id,
            self.systems.join(", ")
        )
    }
}

impl StructuredLog for SchedulerStarted<'_> {
    fn log(&self) {
        tracing::info!(
            next_run_id = self.next_run_id,
            systems = ?self.systems,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("scheduler", span_name = name, next_run_id = self.next_run_id)
    }
}

/// A compiled run was dispatched to the hardware.
///
/// # Log Level
/// `info!` - Once per run
///
/// # Example
/// ```
/// use the_sequencer::observability::messages::scheduler::RunStarted;
///
/// let msg = RunStarted {
///     run_id: 12,
///     mode: "sweeping",
///     run_index: 3,
///     iteration: 1,
/// };
///
/// assert_eq!(msg.to_string(), "Run 12 started (sweeping, index 3, pass 1)");
/// ```
pub struct RunStarted<'a> {
    pub run_id: u64,
    pub mode: &'a str,
    pub run_index: usize,
    pub iteration: u64,
}

impl Display for RunStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Run {} started ({}, index {}, pass {})",
            self.run_id, self.mode, self.run_index, self.iteration
        )
    }
}

impl StructuredLog for RunStarted<'_> {
    fn log(&self) {
        tracing::info!(
            run_id = self.run_id,
            mode = self.mode,
            run_index = self.run_index,
            iteration = self.iteration,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "run",
            span_name = name,
            run_id = self.run_id,
            mode = self.mode,
        )
    }
}

/// A command was refused.
///
/// # Log Level
/// `warn!` - The scheduler state is unchanged
pub struct RunRefused<'a> {
    pub command: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for RunRefused<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Refused '{}': {}", self.command, self.error)
    }
}

impl StructuredLog for RunRefused<'_> {
    fn log(&self) {
        tracing::warn!(command = self.command, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("run_refused", span_name = name, command = self.command)
    }
}

/// Every index tuple of a sweep has been run once.
///
/// # Log Level
/// `info!` - Once per pass
pub struct SweepPassCompleted {
    pub iteration: u64,
    pub runs: usize,
}

impl Display for SweepPassCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Sweep pass {} completed ({} runs)", self.iteration, self.runs)
    }
}

impl StructuredLog for SweepPassCompleted {
    fn log(&self) {
        tracing::info!(iteration = self.iteration, runs = self.runs, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("sweep_pass", span_name = name, iteration = self.iteration)
    }
}

/// The scheduler returned to idle.
///
/// # Log Level
/// `info!` - End of a single shot, stop command, fault or iteration limit
pub struct SchedulerStopped<'a> {
    pub reason: &'a str,
    pub runs: u64,
}

impl Display for SchedulerStopped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Scheduler stopped after {} runs: {}", self.runs, self.reason)
    }
}

impl StructuredLog for SchedulerStopped<'_> {
    fn log(&self) {
        tracing::info!(reason = self.reason, runs = self.runs, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("scheduler_stopped", span_name = name, reason = self.reason)
    }
}

/// Run parameters could not be persisted.
///
/// # Log Level
/// `warn!` - The run continues
pub struct RunParametersNotStored<'a> {
    pub run_id: u64,
    pub error: &'a dyn std::error::Error,
}

impl Display for RunParametersNotStored<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Could not store parameters of run {}: {}", self.run_id, self.error)
    }
}

impl StructuredLog for RunParametersNotStored<'_> {
    fn log(&self) {
        tracing::warn!(run_id = self.run_id, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("store_failed", span_name = name, run_id = self.run_id)
    }
}

/// The run history could not be read; numbering restarts at 1.
///
/// # Log Level
/// `warn!`
pub struct RunHistoryUnreadable<'a> {
    pub path: &'a Path,
    pub error: &'a dyn std::error::Error,
}

impl Display for RunHistoryUnreadable<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Could not read run history {}: {}",
            self.path.display(),
            self.error
        )
    }
}

impl StructuredLog for RunHistoryUnreadable<'_> {
    fn log(&self) {
        tracing::warn!(path = %self.path.display(), error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("history_unreadable", span_name = name, path = %self.path.display())
    }
}

/// A run history line could not be parsed and was skipped.
///
/// # Log Level
/// `warn!`
pub struct RunRecordSkipped<'a> {
    pub path: &'a Path,
    pub line: usize,
    pub error: &'a dyn std::error::Error,
}

impl Display for RunRecordSkipped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Skipping unreadable run record {}:{}: {}",
            self.path.display(),
            self.line,
            self.error
        )
    }
}

impl StructuredLog for RunRecordSkipped<'_> {
    fn log(&self) {
        tracing::warn!(path = %self.path.display(), line = self.line, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("record_skipped", span_name = name, path = %self.path.display(), line = self.line)
    }
}

/// A notification could not be delivered.
///
/// # Log Level
/// `warn!`
pub struct NotificationFailed<'a> {
    pub target: &'a str,
    pub error: &'a dyn Display,
}

impl Display for NotificationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Notification to {} failed: {}", self.target, self.error)
    }
}

impl StructuredLog for NotificationFailed<'_> {
    fn log(&self) {
        tracing::warn!(target_addr = self.target, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("notification_failed", span_name = name, target_addr = self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_refused_display() {
        let error = crate::errors::SchedulerError::RunInProgress;
        let msg = RunRefused {
            command: "play_once",
            error: &error,
        };
        assert_eq!(msg.to_string(), "Refused 'play_once': a run is already in progress");
    }

    #[test]
    fn test_scheduler_started_display() {
        let systems = ["dummy"];
        let msg = SchedulerStarted {
            next_run_id: 43,
            systems: &systems,
        };
        assert_eq!(
            msg.to_string(),
            "Scheduler started: next run 43, output systems [dummy]"
        );
    }
}
