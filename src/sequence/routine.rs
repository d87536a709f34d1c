// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Routines: named blocks of per-channel event tracks with symbolic timing.
//!
//! All durations are milliseconds. Sine `frequency` is in cycles per millisecond and
//! `phase` in radians.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::channel::{CardKind, ChannelId, ChannelRegistry};
use super::change::{ChangeFeed, SequenceChange};
use crate::errors::{CompileError, ConfigurationError};
use crate::expression::{Bindings, Formula};

/// Analog function shape with its parameter formulas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "function", rename_all = "snake_case")]
pub enum Waveform {
    Constant {
        value: Formula,
    },
    Linear {
        start: Formula,
        end: Formula,
    },
    /// `end + (start - end) * exp(-gamma * t)`, `t` in ms from the event start.
    Exponential {
        start: Formula,
        end: Formula,
        gamma: Formula,
    },
    /// `amplitude * sin(2π * frequency * t + phase) + offset`.
    Sine {
        amplitude: Formula,
        frequency: Formula,
        #[serde(default)]
        phase: Formula,
        #[serde(default)]
        offset: Formula,
    },
}

impl Waveform {
    pub fn name(&self) -> &'static str {
        match self {
            Waveform::Constant { .. } => "constant",
            Waveform::Linear { .. } => "linear",
            Waveform::Exponential { .. } => "exponential",
            Waveform::Sine { .. } => "sine",
        }
    }
}

/// One timed step of a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Digital { duration: Formula, state: bool },
    Analog { duration: Formula, waveform: Waveform },
}

impl Event {
    pub fn digital(duration: impl Into<Formula>, state: bool) -> Self {
        Event::Digital {
            duration: duration.into(),
            state,
        }
    }

    pub fn constant(duration: impl Into<Formula>, value: impl Into<Formula>) -> Self {
        Event::Analog {
            duration: duration.into(),
            waveform: Waveform::Constant {
                value: value.into(),
            },
        }
    }

    pub fn linear(
        duration: impl Into<Formula>,
        start: impl Into<Formula>,
        end: impl Into<Formula>,
    ) -> Self {
        Event::Analog {
            duration: duration.into(),
            waveform: Waveform::Linear {
                start: start.into(),
                end: end.into(),
            },
        }
    }

    pub fn exponential(
        duration: impl Into<Formula>,
        start: impl Into<Formula>,
        end: impl Into<Formula>,
        gamma: impl Into<Formula>,
    ) -> Self {
        Event::Analog {
            duration: duration.into(),
            waveform: Waveform::Exponential {
                start: start.into(),
                end: end.into(),
                gamma: gamma.into(),
            },
        }
    }

    pub fn sine(
        duration: impl Into<Formula>,
        amplitude: impl Into<Formula>,
        frequency: impl Into<Formula>,
        phase: impl Into<Formula>,
        offset: impl Into<Formula>,
    ) -> Self {
        Event::Analog {
            duration: duration.into(),
            waveform: Waveform::Sine {
                amplitude: amplitude.into(),
                frequency: frequency.into(),
                phase: phase.into(),
                offset: offset.into(),
            },
        }
    }

    pub fn duration(&self) -> &Formula {
        match self {
            Event::Digital { duration, .. } | Event::Analog { duration, .. } => duration,
        }
    }

    /// The card kind able to play this event.
    pub fn kind(&self) -> CardKind {
        match self {
            Event::Digital { .. } => CardKind::Digital,
            Event::Analog { .. } => CardKind::Analog,
        }
    }
}

/// The events one routine plays on one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub channel: ChannelId,
    #[serde(default)]
    pub offset: Formula,
    #[serde(default)]
    pub events: Vec<Event>,
}

impl Track {
    pub fn new(channel: ChannelId) -> Self {
        Self {
            channel,
            offset: Formula::default(),
            events: Vec::new(),
        }
    }

    pub fn with_offset(mut self, offset: impl Into<Formula>) -> Self {
        self.offset = offset.into();
        self
    }

    pub fn with_event(mut self, event: Event) -> Self {
        self.events.push(event);
        self
    }
}

/// A named, reusable set of tracks, at most one per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Routine {
    pub name: String,
    pub tracks: Vec<Track>,
}

impl Routine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tracks: Vec::new(),
        }
    }

    pub fn with_track(mut self, track: Track) -> Self {
        self.tracks.push(track);
        self
    }

    pub fn track(&self, channel: &ChannelId) -> Option<&Track> {
        self.tracks.iter().find(|t| &t.channel == channel)
    }

    fn track_mut(&mut self, channel: &ChannelId) -> Result<&mut Track, ConfigurationError> {
        let routine = self.name.clone();
        self.tracks
            .iter_mut()
            .find(|t| &t.channel == channel)
            .ok_or_else(|| ConfigurationError::UnknownTrack {
                routine,
                channel: channel.to_string(),
            })
    }
}

/// All routines of a sequence, optionally checked against the configured channels.
#[derive(Debug, Default)]
pub struct RoutineLibrary {
    routines: IndexMap<String, Routine>,
    registry: Option<ChannelRegistry>,
    feed: ChangeFeed,
}

impl RoutineLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(feed: ChangeFeed) -> Self {
        Self {
            feed,
            ..Self::default()
        }
    }

    /// Check channels and event kinds against `registry` from now on.
    pub fn set_registry(&mut self, registry: ChannelRegistry) {
        self.registry = Some(registry);
    }

    pub fn registry(&self) -> Option<&ChannelRegistry> {
        self.registry.as_ref()
    }

    /// Create a routine with an empty, zero-offset track on each of `channels`.
    pub fn add_routine<I>(&mut self, name: &str, channels: I) -> Result<(), ConfigurationError>
    where
        I: IntoIterator<Item = ChannelId>,
    {
        let mut routine = Routine::new(name);
        for channel in channels {
            if routine.track(&channel).is_some() {
                return Err(ConfigurationError::DuplicateTrack {
                    routine: name.to_string(),
                    channel: channel.to_string(),
                });
            }
            routine.tracks.push(Track::new(channel));
        }
        self.insert_routine(routine)
    }

    /// Add a fully built routine, validating every track and event.
    pub fn insert_routine(&mut self, routine: Routine) -> Result<(), ConfigurationError> {
        if self.routines.contains_key(&routine.name) {
            return Err(ConfigurationError::DuplicateRoutine { name: routine.name });
        }
        for (i, track) in routine.tracks.iter().enumerate() {
            if routine.tracks[..i].iter().any(|t| t.channel == track.channel) {
                return Err(ConfigurationError::DuplicateTrack {
                    routine: routine.name.clone(),
                    channel: track.channel.to_string(),
                });
            }
            self.check_channel(&track.channel)?;
            for event in &track.events {
                self.check_event(&track.channel, event)?;
            }
        }

        let name = routine.name.clone();
        self.routines.insert(name.clone(), routine);
        self.feed.publish(SequenceChange::RoutineChanged { name });
        Ok(())
    }

    pub fn remove_routine(&mut self, name: &str) -> Result<Routine, ConfigurationError> {
        let routine =
            self.routines
                .shift_remove(name)
                .ok_or_else(|| ConfigurationError::UnknownRoutine {
                    name: name.to_string(),
                })?;
        self.feed.publish(SequenceChange::RoutineRemoved {
            name: name.to_string(),
        });
        Ok(routine)
    }

    pub fn add_track(
        &mut self,
        routine: &str,
        channel: ChannelId,
        offset: impl Into<Formula>,
    ) -> Result<(), ConfigurationError> {
        self.check_channel(&channel)?;
        self.edit(routine, |r| {
            if r.track(&channel).is_some() {
                return Err(ConfigurationError::DuplicateTrack {
                    routine: r.name.clone(),
                    channel: channel.to_string(),
                });
            }
            r.tracks.push(Track::new(channel).with_offset(offset));
            Ok(())
        })
    }

    pub fn remove_track(
        &mut self,
        routine: &str,
        channel: &ChannelId,
    ) -> Result<Track, ConfigurationError> {
        let mut removed = None;
        self.edit(routine, |r| {
            let index = r
                .tracks
                .iter()
                .position(|t| &t.channel == channel)
                .ok_or_else(|| ConfigurationError::UnknownTrack {
                    routine: r.name.clone(),
                    channel: channel.to_string(),
                })?;
            removed = Some(r.tracks.remove(index));
            Ok(())
        })?;
        removed.ok_or_else(|| ConfigurationError::UnknownTrack {
            routine: routine.to_string(),
            channel: channel.to_string(),
        })
    }

    pub fn set_track_offset(
        &mut self,
        routine: &str,
        channel: &ChannelId,
        offset: impl Into<Formula>,
    ) -> Result<(), ConfigurationError> {
        self.edit(routine, |r| {
            r.track_mut(channel)?.offset = offset.into();
            Ok(())
        })
    }

    /// Append `event` to the routine's track on `channel`.
    pub fn add_event(
        &mut self,
        routine: &str,
        channel: &ChannelId,
        event: Event,
    ) -> Result<(), ConfigurationError> {
        self.check_event(channel, &event)?;
        self.edit(routine, |r| {
            r.track_mut(channel)?.events.push(event);
            Ok(())
        })
    }

    pub fn set_event(
        &mut self,
        routine: &str,
        channel: &ChannelId,
        index: usize,
        event: Event,
    ) -> Result<(), ConfigurationError> {
        self.check_event(channel, &event)?;
        self.edit(routine, |r| {
            let name = r.name.clone();
            let track = r.track_mut(channel)?;
            let slot = track
                .events
                .get_mut(index)
                .ok_or_else(|| ConfigurationError::EventOutOfRange {
                    routine: name,
                    channel: channel.to_string(),
                    index,
                })?;
            *slot = event;
            Ok(())
        })
    }

    pub fn remove_event(
        &mut self,
        routine: &str,
        channel: &ChannelId,
        index: usize,
    ) -> Result<Event, ConfigurationError> {
        let mut removed = None;
        self.edit(routine, |r| {
            let name = r.name.clone();
            let track = r.track_mut(channel)?;
            if index >= track.events.len() {
                return Err(ConfigurationError::EventOutOfRange {
                    routine: name,
                    channel: channel.to_string(),
                    index,
                });
            }
            removed = Some(track.events.remove(index));
            Ok(())
        })?;
        removed.ok_or_else(|| ConfigurationError::EventOutOfRange {
            routine: routine.to_string(),
            channel: channel.to_string(),
            index,
        })
    }

    /// Duration of the longest track of `name` (offset included) under `values`.
    pub fn routine_duration<B: Bindings + ?Sized>(
        &self,
        name: &str,
        values: &B,
    ) -> Result<f64, CompileError> {
        let routine = self
            .get(name)
            .ok_or_else(|| CompileError::UnknownRoutine(name.to_string()))?;
        crate::compiler::RoutineCompiler::new(values).duration(routine)
    }

    pub fn get(&self, name: &str) -> Option<&Routine> {
        self.routines.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.routines.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Routine> {
        self.routines.values()
    }

    pub fn len(&self) -> usize {
        self.routines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routines.is_empty()
    }

    pub fn clear(&mut self) {
        self.routines.clear();
    }

    fn edit<F>(&mut self, routine: &str, edit: F) -> Result<(), ConfigurationError>
    where
        F: FnOnce(&mut Routine) -> Result<(), ConfigurationError>,
    {
        let r = self
            .routines
            .get_mut(routine)
            .ok_or_else(|| ConfigurationError::UnknownRoutine {
                name: routine.to_string(),
            })?;
        edit(r)?;
        self.feed.publish(SequenceChange::RoutineChanged {
            name: routine.to_string(),
        });
        Ok(())
    }

    fn check_channel(&self, channel: &ChannelId) -> Result<(), ConfigurationError> {
        match &self.registry {
            Some(registry) if registry.channel(channel).is_none() => {
                Err(ConfigurationError::UnknownChannel {
                    channel: channel.to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    fn check_event(&self, channel: &ChannelId, event: &Event) -> Result<(), ConfigurationError> {
        let Some(registry) = &self.registry else {
            return Ok(());
        };
        let kind = registry
            .kind_of(channel)
            .ok_or_else(|| ConfigurationError::UnknownChannel {
                channel: channel.to_string(),
            })?;
        if kind != event.kind() {
            return Err(ConfigurationError::EventKindMismatch {
                channel: channel.to_string(),
                expected: kind.as_str(),
            });
        }
        Ok(())
    }
}
