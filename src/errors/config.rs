// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

/// Edits and configuration entries rejected before they can reach evaluation or compilation.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// A variable group with this name already exists
    DuplicateGroup { group: String },
    /// No variable group with this name
    UnknownGroup { group: String },
    /// A variable with this name already exists in some group
    DuplicateVariable { name: String },
    /// No variable with this name
    UnknownVariable { name: String },
    /// Variable names must be identifiers and must not shadow library functions
    InvalidVariableName { name: String, reason: String },
    /// Sweep bounds that cannot produce a finite, correctly directed progression
    InvalidSweepRange {
        variable: String,
        start: f64,
        stop: f64,
        increment: f64,
        reason: &'static str,
    },
    /// A scan index was set on a variable that is not swept
    NotSwept { name: String },
    /// A routine with this name already exists
    DuplicateRoutine { name: String },
    /// No routine with this name
    UnknownRoutine { name: String },
    /// The channel is not provided by any configured card
    UnknownChannel { channel: String },
    /// The routine already has a track for this channel
    DuplicateTrack { routine: String, channel: String },
    /// The routine has no track for this channel
    UnknownTrack { routine: String, channel: String },
    /// An event index past the end of the track
    EventOutOfRange {
        routine: String,
        channel: String,
        index: usize,
    },
    /// Digital events on an analog card, or analog events on a digital card
    EventKindMismatch {
        channel: String,
        expected: &'static str,
    },
    /// A playlist with this name already exists
    DuplicatePlaylist { name: String },
    /// No playlist with this name
    UnknownPlaylist { name: String },
    /// A node path that does not address a node in the playlist
    InvalidNodePath { playlist: String, path: String },
    /// A move that would place a node inside itself or one of its descendants
    InvalidMove { playlist: String, path: String },
    /// Repeat counts start at one
    InvalidRepeat { repeat: u32 },
    /// The node is not of the kind the edit applies to
    NodeKindMismatch { path: String, expected: &'static str },
    /// The configuration names no output systems
    NoOutputSystems,
    /// Two output systems share a name
    DuplicateOutputSystem { name: String },
    /// Two cards share a name, so channel ownership would not be disjoint
    DuplicateCard { name: String },
    /// A card with an empty channel list
    EmptyCard { name: String },
    /// Sample rates must be positive and finite
    InvalidSampleRate { card: String, sample_rate: f64 },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::DuplicateGroup { group } => {
                write!(f, "Duplicate variable group: '{}'", group)
            }
            ConfigurationError::UnknownGroup { group } => {
                write!(f, "Unknown variable group: '{}'", group)
            }
            ConfigurationError::DuplicateVariable { name } => {
                write!(f, "Duplicate variable name: '{}'", name)
            }
            ConfigurationError::UnknownVariable { name } => {
                write!(f, "Unknown variable: '{}'", name)
            }
            ConfigurationError::InvalidVariableName { name, reason } => {
                write!(f, "Invalid variable name '{}': {}", name, reason)
            }
            ConfigurationError::InvalidSweepRange {
                variable,
                start,
                stop,
                increment,
                reason,
            } => {
                write!(
                    f,
                    "Invalid sweep range for '{}' (start={}, stop={}, increment={}): {}",
                    variable, start, stop, increment, reason
                )
            }
            ConfigurationError::NotSwept { name } => {
                write!(f, "Variable '{}' is not swept", name)
            }
            ConfigurationError::DuplicateRoutine { name } => {
                write!(f, "Duplicate routine name: '{}'", name)
            }
            ConfigurationError::UnknownRoutine { name } => {
                write!(f, "Unknown routine: '{}'", name)
            }
            ConfigurationError::UnknownChannel { channel } => {
                write!(f, "Channel {} is not provided by any card", channel)
            }
            ConfigurationError::DuplicateTrack { routine, channel } => {
                write!(
                    f,
                    "Routine '{}' already has a track for channel {}",
                    routine, channel
                )
            }
            ConfigurationError::UnknownTrack { routine, channel } => {
                write!(f, "Routine '{}' has no track for channel {}", routine, channel)
            }
            ConfigurationError::EventOutOfRange {
                routine,
                channel,
                index,
            } => {
                write!(
                    f,
                    "Routine '{}' channel {} has no event at index {}",
                    routine, channel, index
                )
            }
            ConfigurationError::EventKindMismatch { channel, expected } => {
                write!(f, "Channel {} only accepts {} events", channel, expected)
            }
            ConfigurationError::DuplicatePlaylist { name } => {
                write!(f, "Duplicate playlist name: '{}'", name)
            }
            ConfigurationError::UnknownPlaylist { name } => {
                write!(f, "Unknown playlist: '{}'", name)
            }
            ConfigurationError::InvalidNodePath { playlist, path } => {
                write!(f, "Playlist '{}' has no node at {}", playlist, path)
            }
            ConfigurationError::InvalidMove { playlist, path } => {
                write!(
                    f,
                    "Playlist '{}': cannot move a node into itself or its descendant {}",
                    playlist, path
                )
            }
            ConfigurationError::InvalidRepeat { repeat } => {
                write!(f, "Repeat count must be at least 1, got {}", repeat)
            }
            ConfigurationError::NodeKindMismatch { path, expected } => {
                write!(f, "Node {} is not a {} node", path, expected)
            }
            ConfigurationError::NoOutputSystems => {
                write!(f, "At least one output system must be configured")
            }
            ConfigurationError::DuplicateOutputSystem { name } => {
                write!(f, "Duplicate output system name: '{}'", name)
            }
            ConfigurationError::DuplicateCard { name } => {
                write!(f, "Duplicate card name: '{}'", name)
            }
            ConfigurationError::EmptyCard { name } => {
                write!(f, "Card '{}' has no channels", name)
            }
            ConfigurationError::InvalidSampleRate { card, sample_rate } => {
                write!(
                    f,
                    "Card '{}' has invalid sample rate {}",
                    card, sample_rate
                )
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}
