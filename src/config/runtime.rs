// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::time::Duration;

use crate::config::{
    BackendType, Config, NotificationConfig, OutputSystemConfig, SchedulerOptions, StorageConfig,
};
use crate::document::SequenceDocument;
use crate::errors::{ConfigurationError, DocumentError};
use crate::hardware::{DummyOutputSystem, Hardware, OutputSystem};
use crate::notify::{LogNotifier, Notifier, TcpNotifier};
use crate::sequence::{Card, Sequence};
use crate::storage::{JsonLinesStorage, MemoryStorage, RunStorage};

/// Everything the iteration scheduler needs besides the sequence itself.
pub struct Runtime {
    pub hardware: Hardware,
    pub storage: Box<dyn RunStorage>,
    pub notifier: Box<dyn Notifier>,
    pub options: SchedulerOptions,
}

/// Sequencer runtime builder - creates the hardware aggregate and its collaborators from configuration.
///
/// # Examples
///
/// ```
/// use the_sequencer::config::{parse_config, RuntimeBuilder};
/// use the_sequencer::document::Format;
///
/// let yaml = r#"
/// sequence: sequence.yaml
/// output_systems:
///   - name: dummy
///     type: dummy
///     cards:
///       - { name: dio0, kind: digital, channels: [shutter, trigger] }
/// "#;
/// let config = parse_config(yaml, Format::Yaml).unwrap();
///
/// let runtime = RuntimeBuilder::from_config(&config).unwrap();
/// assert_eq!(runtime.hardware.systems().collect::<Vec<_>>(), vec!["dummy"]);
/// assert_eq!(runtime.hardware.registry().cards().count(), 1);
/// ```
pub struct RuntimeBuilder;

impl RuntimeBuilder {
    /// Build the runtime for a validated configuration.
    ///
    /// Creates:
    /// - `Hardware`: one backend per configured output system, in file order
    /// - `RunStorage`: in memory or an appended JSON lines file
    /// - `Notifier`: the log, or TCP frames to a listening client
    pub fn from_config(cfg: &Config) -> Result<Runtime, ConfigurationError> {
        let mut hardware = Hardware::new();
        for system in &cfg.output_systems {
            hardware.add_system(Self::output_system(system))?;
        }

        let storage: Box<dyn RunStorage> = match &cfg.storage {
            StorageConfig::Memory => Box::new(MemoryStorage::new()),
            StorageConfig::JsonLines { path } => Box::new(JsonLinesStorage::new(path.clone())),
        };

        let notifier: Box<dyn Notifier> = match &cfg.notifications {
            NotificationConfig::Log => Box::new(LogNotifier),
            NotificationConfig::Tcp { host, port } => Box::new(TcpNotifier::new(host.clone(), *port)),
        };

        Ok(Runtime {
            hardware,
            storage,
            notifier,
            options: cfg.scheduler.clone(),
        })
    }

    fn output_system(cfg: &OutputSystemConfig) -> Box<dyn OutputSystem> {
        let cards = cfg.cards.iter().map(Card::from).collect();
        match cfg.backend {
            BackendType::Dummy => Box::new(
                DummyOutputSystem::new(cfg.name.clone(), cards)
                    .with_delay(Duration::from_millis(cfg.completion_delay_ms())),
            ),
        }
    }
}

/// Load the sequence document a configuration names, checking tracks against the configured channels.
pub fn load_sequence(cfg: &Config, hardware: &Hardware) -> Result<Sequence, DocumentError> {
    SequenceDocument::load(&cfg.sequence)?.to_sequence(Some(hardware.registry().clone()))
}
