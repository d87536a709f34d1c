// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for output systems and the completion barrier.
//!
//! This module contains message types for logging events related to:
//! * Timeline partitioning and dispatch
//! * Per-system completion and the aggregate barrier
//! * Backend faults

use crate::observability::messages::StructuredLog;
use crate::sequence::ChannelId;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A timeline channel that no output system owns was dropped.
///
/// # Log Level
/// `warn!` - The channel will not be driven
pub struct UnownedChannelDropped<'a> {
    pub channel: &'a ChannelId,
    pub run_id: u64,
}

impl Display for UnownedChannelDropped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Run {}: no output system owns channel {}, dropping it",
            self.run_id, self.channel
        )
    }
}

impl StructuredLog for UnownedChannelDropped<'_> {
    fn log(&self) {
        tracing::warn!(channel = %self.channel, run_id = self.run_id, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "unowned_channel",
            span_name = name,
            channel = %self.channel,
            run_id = self.run_id,
        )
    }
}

/// An output system accepted its share of a timeline.
///
/// # Log Level
/// `info!` - Once per system per run
///
/// # Example
/// ```
/// use the_sequencer::observability::messages::hardware::SequenceDispatched;
///
/// let msg = SequenceDispatched {
///     system: "dummy",
///     run_id: 7,
///     channels: 3,
///     points: 1500,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct SequenceDispatched<'a> {
    pub system: &'a str,
    pub run_id: u64,
    pub channels: usize,
    pub points: usize,
}

impl Display for SequenceDispatched<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Run {} dispatched to '{}': {} channels, {} points",
            self.run_id, self.system, self.channels, self.points
        )
    }
}

impl StructuredLog for SequenceDispatched<'_> {
    fn log(&self) {
        tracing::info!(
            system = self.system,
            run_id = self.run_id,
            channels = self.channels,
            points = self.points,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "dispatch",
            span_name = name,
            system = self.system,
            run_id = self.run_id,
        )
    }
}

/// One output system reported completion.
///
/// # Log Level
/// `debug!` - Frequent during sweeps
pub struct SystemFinished<'a> {
    pub system: &'a str,
    pub run_id: u64,
    pub pending: &'a [&'a str],
}

impl Display for SystemFinished<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.pending.is_empty() {
            write!(f, "'{}' finished run {}; all systems done", self.system, self.run_id)
        } else {
            write!(
                f,
                "'{}' finished run {}; waiting for {}",
                self.system,
                self.run_id,
                self.pending.join(", ")
            )
        }
    }
}

impl StructuredLog for SystemFinished<'_> {
    fn log(&self) {
        tracing::debug!(
            system = self.system,
            run_id = self.run_id,
            pending = ?self.pending,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "system_finished",
            span_name = name,
            system = self.system,
            run_id = self.run_id,
        )
    }
}

/// A completion that does not belong to the current run, or arrived twice.
///
/// # Log Level
/// `debug!` - Expected after stop and with repeating backends
pub struct StaleCompletionIgnored<'a> {
    pub system: &'a str,
    pub run_id: u64,
    pub current_run_id: Option<u64>,
}

impl Display for StaleCompletionIgnored<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Ignoring completion of run {} from '{}' (current run: {:?})",
            self.run_id, self.system, self.current_run_id
        )
    }
}

impl StructuredLog for StaleCompletionIgnored<'_> {
    fn log(&self) {
        tracing::debug!(
            system = self.system,
            run_id = self.run_id,
            current_run_id = ?self.current_run_id,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "stale_completion",
            span_name = name,
            system = self.system,
            run_id = self.run_id,
        )
    }
}

/// A backend reported a fault.
///
/// # Log Level
/// `error!` - Ends the current run
pub struct HardwareFault<'a> {
    pub system: &'a str,
    pub message: &'a str,
}

impl Display for HardwareFault<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Output system '{}' fault: {}", self.system, self.message)
    }
}

impl StructuredLog for HardwareFault<'_> {
    fn log(&self) {
        tracing::error!(system = self.system, message = self.message, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("hardware_fault", span_name = name, system = self.system)
    }
}

/// The dummy backend loaded a program.
///
/// # Log Level
/// `debug!` - Diagnostic only
pub struct ProgramLoaded<'a> {
    pub system: &'a str,
    pub run_id: u64,
    pub channels: usize,
    pub points: usize,
    pub length: f64,
}

impl Display for ProgramLoaded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "'{}' loaded run {}: {} channels, {} points over {} ms",
            self.system, self.run_id, self.channels, self.points, self.length
        )
    }
}

impl StructuredLog for ProgramLoaded<'_> {
    fn log(&self) {
        tracing::debug!(
            system = self.system,
            run_id = self.run_id,
            channels = self.channels,
            points = self.points,
            length_ms = self.length,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "program",
            span_name = name,
            system = self.system,
            run_id = self.run_id,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_finished_lists_pending() {
        let pending = ["ao", "dio"];
        let msg = SystemFinished {
            system: "rf",
            run_id: 3,
            pending: &pending,
        };
        assert_eq!(msg.to_string(), "'rf' finished run 3; waiting for ao, dio");

        let done = SystemFinished {
            system: "rf",
            run_id: 3,
            pending: &[],
        };
        assert!(done.to_string().ends_with("all systems done"));
    }
}
