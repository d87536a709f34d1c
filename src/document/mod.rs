// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The persisted shape of a sequence.
//!
//! A document has three sections:
//!
//! ```yaml
//! variables:
//!   timing:
//!     - name: t_load
//!       formula: "100"
//!     - name: detuning
//!       swept: true
//!       start: -2
//!       stop: 2
//!       increment: 0.5
//! routines:
//!   load:
//!     - channel: { card: dio0, index: 0 }
//!       events:
//!         - { type: digital, duration: t_load, state: true }
//! playlist:
//!   - name: main
//!     active: true
//!     nodes:
//!       - type: routine
//!         name: load
//!         repeat: 2
//!       - type: gap
//!         duration: "5"
//! ```
//!
//! Loading a document and saving it again loses nothing.

pub mod format;

pub use format::Format;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::DocumentError;
use crate::expression::Formula;
use crate::sequence::{ChannelRegistry, NodeKind, Playlist, PlaylistNode, Routine, Sequence, Track};
use crate::variables::{SweepRange, VariableSpec};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SequenceDocument {
    /// Group name → variables in order.
    #[serde(default)]
    pub variables: IndexMap<String, Vec<VariableRecord>>,
    /// Routine name → tracks.
    #[serde(default)]
    pub routines: IndexMap<String, Vec<Track>>,
    #[serde(default)]
    pub playlist: Vec<PlaylistRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableRecord {
    pub name: String,
    #[serde(default)]
    pub formula: Formula,
    #[serde(default)]
    pub swept: bool,
    #[serde(default)]
    pub start: f64,
    #[serde(default)]
    pub stop: f64,
    #[serde(default = "default_increment")]
    pub increment: f64,
    #[serde(default)]
    pub nesting_level: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
}

fn default_increment() -> f64 {
    1.0
}

impl From<VariableRecord> for VariableSpec {
    fn from(record: VariableRecord) -> Self {
        VariableSpec {
            name: record.name,
            formula: record.formula.as_str().to_string(),
            swept: record.swept,
            sweep: SweepRange::new(record.start, record.stop, record.increment),
            nesting_level: record.nesting_level,
            comment: record.comment,
        }
    }
}

impl From<VariableSpec> for VariableRecord {
    fn from(spec: VariableSpec) -> Self {
        VariableRecord {
            name: spec.name,
            formula: Formula::new(spec.formula),
            swept: spec.swept,
            start: spec.sweep.start,
            stop: spec.sweep.stop,
            increment: spec.sweep.increment,
            nesting_level: spec.nesting_level,
            comment: spec.comment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub active: bool,
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeRecord {
    Routine {
        name: String,
        #[serde(default = "default_repeat")]
        repeat: u32,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<NodeRecord>,
    },
    Gap {
        duration: Formula,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<NodeRecord>,
    },
}

fn default_repeat() -> u32 {
    1
}

impl From<NodeRecord> for PlaylistNode {
    fn from(record: NodeRecord) -> Self {
        let (kind, children) = match record {
            NodeRecord::Routine {
                name,
                repeat,
                children,
            } => (NodeKind::Routine { name, repeat }, children),
            NodeRecord::Gap { duration, children } => (NodeKind::Gap { duration }, children),
        };
        PlaylistNode {
            kind,
            children: children.into_iter().map(PlaylistNode::from).collect(),
        }
    }
}

impl From<&PlaylistNode> for NodeRecord {
    fn from(node: &PlaylistNode) -> Self {
        let children = node.children.iter().map(NodeRecord::from).collect();
        match &node.kind {
            NodeKind::Routine { name, repeat } => NodeRecord::Routine {
                name: name.clone(),
                repeat: *repeat,
                children,
            },
            NodeKind::Gap { duration } => NodeRecord::Gap {
                duration: duration.clone(),
                children,
            },
        }
    }
}

impl SequenceDocument {
    /// Load a document from a `.yaml`, `.yml`, `.json` or `.toml` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        format::read(path.as_ref())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        format::write(path.as_ref(), self)
    }

    /// Build an editable sequence, validating every entry as the editor would.
    ///
    /// With a registry, tracks are checked against the configured channels.
    pub fn to_sequence(&self, registry: Option<ChannelRegistry>) -> Result<Sequence, DocumentError> {
        let mut sequence = match registry {
            Some(registry) => Sequence::with_registry(registry),
            None => Sequence::new(),
        };

        for (group, records) in &self.variables {
            sequence.variables.add_group(group)?;
            for record in records {
                sequence
                    .variables
                    .add_variable(group, VariableSpec::from(record.clone()))?;
            }
        }

        for (name, tracks) in &self.routines {
            sequence.routines.insert_routine(Routine {
                name: name.clone(),
                tracks: tracks.clone(),
            })?;
        }

        for record in &self.playlist {
            sequence.playlists.insert_playlist(Playlist {
                name: record.name.clone(),
                nodes: record.nodes.iter().cloned().map(PlaylistNode::from).collect(),
            })?;
        }
        if let Some(active) = self.playlist.iter().find(|p| p.active) {
            sequence.playlists.set_active(&active.name)?;
        }

        Ok(sequence)
    }

    pub fn from_sequence(sequence: &Sequence) -> Self {
        let variables = sequence
            .variables
            .groups()
            .map(|(group, variables)| {
                let records = variables
                    .iter()
                    .map(|v| VariableRecord::from(v.to_spec()))
                    .collect();
                (group.to_string(), records)
            })
            .collect();

        let routines = sequence
            .routines
            .iter()
            .map(|routine| (routine.name.clone(), routine.tracks.clone()))
            .collect();

        let active = sequence.playlists.active_name();
        let playlist = sequence
            .playlists
            .iter()
            .map(|p| PlaylistRecord {
                name: p.name.clone(),
                active: active == Some(p.name.as_str()),
                nodes: p.nodes.iter().map(NodeRecord::from).collect(),
            })
            .collect();

        SequenceDocument {
            variables,
            routines,
            playlist,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ConfigurationError;
    use crate::sequence::{Card, CardKind, ChannelId, Event};
    use tempfile::TempDir;

    const DOCUMENT: &str = r#"
variables:
  timing:
    - name: t_load
      formula: 100
      comment: MOT loading
    - name: t_total
      formula: t_load * 2 + t_probe
  probe:
    - name: t_probe
      swept: true
      start: 1
      stop: 3
      increment: 1
      nesting_level: 1
    - name: detuning
      formula: "-5"
      swept: false
      start: -2
      stop: 2
      increment: 0.5
routines:
  load:
    - channel: { card: dio0, index: 0 }
      offset: "1"
      events:
        - { type: digital, duration: t_load, state: true }
        - { type: digital, duration: 1, state: false }
    - channel: { card: ao0, index: 0 }
      events:
        - type: analog
          duration: 10
          waveform: { function: linear, start: 0, end: detuning }
        - type: analog
          duration: t_probe
          waveform:
            function: sine
            amplitude: 1
            frequency: 0.1
  image:
    - channel: { card: dio0, index: 1 }
      events:
        - { type: digital, duration: t_probe, state: true }
playlist:
  - name: main
    nodes:
      - type: routine
        name: load
        repeat: 2
        children:
          - { type: gap, duration: "5" }
      - { type: routine, name: image }
  - name: calibration
    active: true
    nodes:
      - { type: routine, name: image, repeat: 3 }
"#;

    fn document() -> SequenceDocument {
        serde_yaml::from_str(DOCUMENT).unwrap()
    }

    #[test]
    fn test_defaults_and_numeric_formulas() {
        let doc = document();
        let t_load = &doc.variables["timing"][0];
        assert_eq!(t_load.formula.as_str(), "100");
        assert!(!t_load.swept);
        assert_eq!(t_load.increment, 1.0);
        assert_eq!(
            doc.playlist[0].nodes[1],
            NodeRecord::Routine {
                name: "image".into(),
                repeat: 1,
                children: vec![]
            }
        );
    }

    #[test]
    fn test_to_sequence() {
        let sequence = document().to_sequence(None).unwrap();
        assert_eq!(sequence.variables.value("t_total"), Some(201.0));
        assert_eq!(sequence.variables.value("detuning"), Some(-5.0));
        assert_eq!(sequence.routines.len(), 2);
        assert_eq!(sequence.playlists.active_name(), Some("calibration"));
        assert_eq!(sequence.variables.variable("t_load").unwrap().comment(), "MOT loading");
    }

    #[test]
    fn test_round_trip_is_lossless() {
        let original = document();
        let saved = SequenceDocument::from_sequence(&original.to_sequence(None).unwrap());
        assert_eq!(saved, original);
    }

    #[test]
    fn test_round_trip_through_files() {
        let dir = TempDir::new().unwrap();
        let original = document();
        for file in ["seq.yaml", "seq.json", "seq.toml"] {
            let path = dir.path().join(file);
            original.save(&path).unwrap();
            assert_eq!(SequenceDocument::load(&path).unwrap(), original, "{}", file);
        }
    }

    #[test]
    fn test_registry_checks_channels() {
        let mut registry = ChannelRegistry::new();
        registry
            .add_card(Card::new("dio0", CardKind::Digital, ["a"]))
            .unwrap();

        let err = document().to_sequence(Some(registry)).unwrap_err();
        assert!(matches!(
            err,
            DocumentError::Invalid(ConfigurationError::UnknownChannel { .. })
        ));
    }

    #[test]
    fn test_invalid_entries_are_rejected() {
        let mut doc = document();
        doc.variables["probe"][0].increment = 0.0;
        assert!(matches!(
            doc.to_sequence(None),
            Err(DocumentError::Invalid(ConfigurationError::InvalidSweepRange { .. }))
        ));

        let mut doc = document();
        doc.routines["image"].push(Track::new(ChannelId::new("dio0", 1)).with_event(Event::digital(1, true)));
        assert!(matches!(
            doc.to_sequence(None),
            Err(DocumentError::Invalid(ConfigurationError::DuplicateTrack { .. }))
        ));
    }
}
