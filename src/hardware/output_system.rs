// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::compiler::Timeline;
use crate::errors::HardwareError;
use crate::sequence::Card;

/// Asynchronous report from an output system.
#[derive(Debug, Clone, PartialEq)]
pub enum HardwareEvent {
    /// `system` finished playing the program of `run_id`.
    SequenceFinished { system: String, run_id: u64 },
    /// `system` failed outside of a command call.
    Fault { system: String, message: String },
}

impl HardwareEvent {
    pub fn system(&self) -> &str {
        match self {
            HardwareEvent::SequenceFinished { system, .. } | HardwareEvent::Fault { system, .. } => {
                system
            }
        }
    }
}

/// A hardware backend owning a fixed set of cards.
///
/// Commands return once the backend has accepted them. Completion is reported
/// later, and exactly once per `play_once`, through every registered listener.
#[async_trait]
pub trait OutputSystem: Send {
    fn name(&self) -> &str;

    /// The cards, and with them the channels, this system drives.
    fn cards(&self) -> &[Card];

    /// Load the program for `run_id`. `timeline` only holds channels of this system.
    async fn process_sequence(&mut self, timeline: &Timeline, run_id: u64) -> Result<(), HardwareError>;

    /// Prepare for a series of runs.
    async fn cycle_init(&mut self) -> Result<(), HardwareError>;

    async fn play_once(&mut self, run_id: u64) -> Result<(), HardwareError>;

    /// Play the loaded program repeatedly, reporting completion after each pass.
    async fn play(&mut self) -> Result<(), HardwareError>;

    async fn stop(&mut self) -> Result<(), HardwareError>;

    fn add_sequence_end_listener(&mut self, listener: mpsc::UnboundedSender<HardwareEvent>);
}
