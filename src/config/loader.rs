// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::config::consts::{DEFAULT_COMPLETION_DELAY_MS, DEFAULT_NOTIFICATION_PORT};
use crate::document::Format;
use crate::errors::DocumentError;
use crate::sequence::{Card, CardKind};

/// Main configuration structure for the sequencer.
///
/// Loaded from a YAML or TOML file. Relative paths in it are resolved against the
/// directory of the configuration file.
///
/// # Fields
/// * `sequence` - Path of the sequence document to load
/// * `scheduler` - Run and sweep behaviour (optional)
/// * `storage` - Where run parameters are recorded (optional, defaults to memory)
/// * `notifications` - Where status messages go (optional, defaults to the log)
/// * `output_systems` - The hardware backends and the cards each one owns
///
/// # Example
/// ```yaml
/// sequence: sequence.yaml
/// scheduler:
///   shuffle: true
///   shuffle_seed: 7
///   max_iterations: 3
/// storage:
///   type: json_lines
///   path: runs.jsonl
/// notifications:
///   type: tcp
///   host: localhost
/// output_systems:
///   - name: dummy
///     type: dummy
///     completion_delay_ms: 500
///     cards:
///       - name: dio0
///         kind: digital
///         channels: [mot_shutter, camera_trigger]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub sequence: PathBuf,
    #[serde(default)]
    pub scheduler: SchedulerOptions,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    pub output_systems: Vec<OutputSystemConfig>,
}

/// Iteration scheduler options.
///
/// # Fields
/// * `shuffle` - Randomize the order of sweep points (toggled later with shuffle on/off)
/// * `shuffle_seed` - Seed for reproducible shuffles
/// * `max_iterations` - Stop sweeping after this many complete passes
/// * `allow_partial_timelines` - Dispatch timelines even when some tracks failed to compile
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SchedulerOptions {
    pub shuffle: bool,
    pub shuffle_seed: Option<u64>,
    pub max_iterations: Option<u64>,
    pub allow_partial_timelines: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageConfig {
    #[default]
    Memory,
    JsonLines { path: PathBuf },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationConfig {
    #[default]
    Log,
    Tcp {
        host: String,
        #[serde(default = "default_notification_port")]
        port: u16,
    },
}

fn default_notification_port() -> u16 {
    DEFAULT_NOTIFICATION_PORT
}

/// One hardware backend.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputSystemConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub backend: BackendType,
    /// Dummy backend only: milliseconds before completion is reported.
    pub completion_delay_ms: Option<u64>,
    pub cards: Vec<CardConfig>,
}

impl OutputSystemConfig {
    pub fn completion_delay_ms(&self) -> u64 {
        self.completion_delay_ms
            .unwrap_or(DEFAULT_COMPLETION_DELAY_MS)
    }
}

/// Backend implementation type for output systems.
///
/// Vendor backends plug in behind the same contract; the dummy backend is built in.
#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum BackendType {
    Dummy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardConfig {
    pub name: String,
    pub kind: CardKind,
    pub address: Option<String>,
    /// Samples per millisecond.
    pub sample_rate: Option<f64>,
    pub channels: Vec<String>,
}

impl From<&CardConfig> for Card {
    fn from(config: &CardConfig) -> Self {
        let mut card = Card::new(&config.name, config.kind, config.channels.iter().cloned());
        card.address = config.address.clone();
        card.sample_rate = config.sample_rate;
        card
    }
}

/// Load a config from a YAML or TOML file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, DocumentError> {
    let path = path.as_ref();
    let mut cfg: Config = crate::document::format::read(path)?;

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    cfg.sequence = resolve(base, &cfg.sequence);
    if let StorageConfig::JsonLines { path } = &mut cfg.storage {
        *path = resolve(base, path);
    }
    Ok(cfg)
}

/// Parse a config from text in the given format. Paths are left as written.
pub fn parse_config(content: &str, format: Format) -> Result<Config, DocumentError> {
    format.parse(content)
}

/// Load and validate a config file.
///
/// All validation failures are reported together.
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<Config, DocumentError> {
    let cfg = load_config(path)?;
    crate::config::validate_config(&cfg).map_err(|errors| DocumentError::Validation { errors })?;
    Ok(cfg)
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const YAML: &str = r#"
sequence: sequence.yaml
scheduler:
  shuffle: true
  max_iterations: 2
storage:
  type: json_lines
  path: runs.jsonl
notifications:
  type: tcp
  host: lab-pc
output_systems:
  - name: dummy
    type: dummy
    cards:
      - name: dio0
        kind: digital
        channels: [shutter, trigger]
      - name: ao0
        kind: analog
        sample_rate: 10
        channels: [coil]
"#;

    #[test]
    fn parse_basic_config() {
        let cfg = parse_config(YAML, Format::Yaml).unwrap();
        assert!(cfg.scheduler.shuffle);
        assert_eq!(cfg.scheduler.max_iterations, Some(2));
        assert!(!cfg.scheduler.allow_partial_timelines);
        assert_eq!(
            cfg.notifications,
            NotificationConfig::Tcp {
                host: "lab-pc".into(),
                port: 9193
            }
        );
        assert_eq!(cfg.output_systems[0].backend, BackendType::Dummy);
        assert_eq!(cfg.output_systems[0].completion_delay_ms(), 1500);

        let card = Card::from(&cfg.output_systems[0].cards[1]);
        assert_eq!(card.kind, CardKind::Analog);
        assert_eq!(card.sample_rate, Some(10.0));
        assert_eq!(card.channels[0].name, "coil");
    }

    #[test]
    fn test_defaults() {
        let cfg = parse_config(
            "sequence: s.yaml\noutput_systems: []\n",
            Format::Yaml,
        )
        .unwrap();
        assert_eq!(cfg.scheduler, SchedulerOptions::default());
        assert_eq!(cfg.storage, StorageConfig::Memory);
        assert_eq!(cfg.notifications, NotificationConfig::Log);
    }

    #[test]
    fn test_toml_config() {
        let toml = r#"
sequence = "sequence.yaml"

[scheduler]
shuffle_seed = 11

[[output_systems]]
name = "dummy"
type = "dummy"
completion_delay_ms = 20

[[output_systems.cards]]
name = "dio0"
kind = "digital"
channels = ["shutter"]
"#;
        let cfg = parse_config(toml, Format::Toml).unwrap();
        assert_eq!(cfg.scheduler.shuffle_seed, Some(11));
        assert_eq!(cfg.output_systems[0].completion_delay_ms(), 20);
    }

    #[test]
    fn test_relative_paths_resolve_against_config_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, YAML).unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.sequence, dir.path().join("sequence.yaml"));
        assert_eq!(
            cfg.storage,
            StorageConfig::JsonLines {
                path: dir.path().join("runs.jsonl")
            }
        );
    }

    #[test]
    fn test_load_and_validate_reports_all_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        let yaml = r#"
sequence: s.yaml
output_systems:
  - name: a
    type: dummy
    cards:
      - { name: dio0, kind: digital, channels: [] }
  - name: a
    type: dummy
    cards:
      - { name: ao0, kind: analog, sample_rate: 0, channels: [x] }
"#;
        std::fs::write(&path, yaml).unwrap();

        match load_and_validate_config(&path) {
            Err(DocumentError::Validation { errors }) => assert_eq!(errors.len(), 3),
            other => panic!("expected validation errors, got {:?}", other),
        }
    }
}
