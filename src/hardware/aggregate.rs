// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use indexmap::IndexMap;
use std::collections::HashMap;
use tokio::sync::mpsc;

use super::barrier::CompletionBarrier;
use super::output_system::{HardwareEvent, OutputSystem};
use crate::compiler::Timeline;
use crate::errors::{ConfigurationError, HardwareError};
use crate::observability::messages::hardware::{
    HardwareFault, SequenceDispatched, StaleCompletionIgnored, SystemFinished,
    UnownedChannelDropped,
};
use crate::observability::messages::StructuredLog;
use crate::sequence::{ChannelId, ChannelRegistry};

/// Every configured output system behind one interface.
///
/// Fans a compiled timeline out to the systems owning its channels and fans their
/// completion reports back in through a [`CompletionBarrier`]. Completion events are
/// delivered on the receiver from [`Hardware::take_events`]; whoever drains it passes
/// each event back to [`Hardware::on_event`].
pub struct Hardware {
    systems: IndexMap<String, Box<dyn OutputSystem>>,
    owners: HashMap<String, String>,
    registry: ChannelRegistry,
    barrier: CompletionBarrier,
    run_id: Option<u64>,
    looping: bool,
    sender: mpsc::UnboundedSender<HardwareEvent>,
    events: Option<mpsc::UnboundedReceiver<HardwareEvent>>,
}

impl std::fmt::Debug for Hardware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hardware")
            .field("systems", &self.systems.keys().collect::<Vec<_>>())
            .field("barrier", &self.barrier)
            .field("run_id", &self.run_id)
            .finish()
    }
}

impl Default for Hardware {
    fn default() -> Self {
        Self::new()
    }
}

impl Hardware {
    pub fn new() -> Self {
        let (sender, events) = mpsc::unbounded_channel();
        Self {
            systems: IndexMap::new(),
            owners: HashMap::new(),
            registry: ChannelRegistry::new(),
            barrier: CompletionBarrier::default(),
            run_id: None,
            looping: false,
            sender,
            events: Some(events),
        }
    }

    /// Register a backend and take ownership of its cards.
    ///
    /// # Errors
    ///
    /// * `DuplicateOutputSystem` - the name is taken
    /// * `DuplicateCard` - a card is already owned by another system
    pub fn add_system(&mut self, mut system: Box<dyn OutputSystem>) -> Result<(), ConfigurationError> {
        let name = system.name().to_string();
        if self.systems.contains_key(&name) {
            return Err(ConfigurationError::DuplicateOutputSystem { name });
        }
        let mut registry = self.registry.clone();
        for card in system.cards() {
            registry.add_card(card.clone())?;
        }

        for card in system.cards() {
            self.owners.insert(card.name.clone(), name.clone());
        }
        self.registry = registry;
        system.add_sequence_end_listener(self.sender.clone());
        self.barrier.register(&name);
        self.systems.insert(name, system);
        Ok(())
    }

    /// The receiver of raw backend events. Available once.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<HardwareEvent>> {
        self.events.take()
    }

    /// Every card of every system.
    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    pub fn systems(&self) -> impl Iterator<Item = &str> {
        self.systems.keys().map(String::as_str)
    }

    pub fn owner_of(&self, channel: &ChannelId) -> Option<&str> {
        self.owners.get(&channel.card).map(String::as_str)
    }

    /// Whether any system has yet to report completion of the current run.
    pub fn is_running(&self) -> bool {
        !self.barrier.is_idle()
    }

    pub fn current_run(&self) -> Option<u64> {
        self.run_id
    }

    /// Send each system the channels it owns. Channels nobody owns are dropped.
    pub async fn process_sequence(&mut self, timeline: &Timeline, run_id: u64) -> Result<(), HardwareError> {
        for channel in timeline.channels.keys() {
            if !self.owners.contains_key(&channel.card) {
                UnownedChannelDropped { channel, run_id }.log();
            }
        }

        for (name, system) in self.systems.iter_mut() {
            let subset = timeline.subset(|id| self.owners.get(&id.card) == Some(name));
            system.process_sequence(&subset, run_id).await?;
            SequenceDispatched {
                system: name,
                run_id,
                channels: subset.channels.len(),
                points: subset.point_count(),
            }
            .log();
        }
        self.run_id = Some(run_id);
        Ok(())
    }

    pub async fn cycle_init(&mut self) -> Result<(), HardwareError> {
        for system in self.systems.values_mut() {
            system.cycle_init().await?;
        }
        Ok(())
    }

    pub async fn play_once(&mut self, run_id: u64) -> Result<(), HardwareError> {
        self.run_id = Some(run_id);
        self.looping = false;
        self.barrier.arm();
        for system in self.systems.values_mut() {
            system.play_once(run_id).await?;
        }
        Ok(())
    }

    /// Loop the loaded program on every system; the barrier re-arms after each pass.
    pub async fn play(&mut self) -> Result<(), HardwareError> {
        self.looping = true;
        self.barrier.arm();
        for system in self.systems.values_mut() {
            system.play().await?;
        }
        Ok(())
    }

    /// Stop every system. Completions still in flight are ignored afterwards.
    pub async fn stop(&mut self) -> Result<(), HardwareError> {
        self.looping = false;
        self.barrier.reset();
        let mut first_error = None;
        for system in self.systems.values_mut() {
            if let Err(e) = system.stop().await {
                first_error.get_or_insert(e);
            }
        }
        self.run_id = None;
        first_error.map_or(Ok(()), Err)
    }

    /// Feed one backend event through the barrier.
    ///
    /// Returns `Ok(true)` when this event completed the current run on every system.
    pub fn on_event(&mut self, event: HardwareEvent) -> Result<bool, HardwareError> {
        match event {
            HardwareEvent::Fault { system, message } => {
                HardwareFault {
                    system: &system,
                    message: &message,
                }
                .log();
                self.barrier.reset();
                self.looping = false;
                Err(HardwareError::Fault { system, message })
            }
            HardwareEvent::SequenceFinished { system, run_id } => {
                if self.run_id != Some(run_id) || !self.barrier.is_running(&system) {
                    StaleCompletionIgnored {
                        system: &system,
                        run_id,
                        current_run_id: self.run_id,
                    }
                    .log();
                    return Ok(false);
                }

                let finished = self.barrier.finish(&system);
                SystemFinished {
                    system: &system,
                    run_id,
                    pending: &self.barrier.pending(),
                }
                .log();
                if finished && self.looping {
                    self.barrier.arm();
                }
                Ok(finished)
            }
        }
    }
}
