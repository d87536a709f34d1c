// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Compilation of symbolic routines and playlists into concrete timelines.
//!
//! [`RoutineCompiler`] resolves one routine against the current variable values;
//! [`PlaylistAssembler`] places compiled routines on an absolute time axis. Both are
//! pure functions of their inputs and are rerun for every hardware cycle.

mod assembler;
mod routine;
pub mod waveform;

pub use assembler::{NodeError, NodeInterval, PlaylistAssembler, Timeline, TimelinePoint};
pub use routine::{CompiledRoutine, RoutineCompiler};

use crate::errors::CompileError;
use crate::sequence::Sequence;

/// A value driven for `duration` ms, relative to the previous event's end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompiledEvent {
    pub duration: f64,
    pub value: f64,
}

/// The concrete events of one track.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTrack {
    pub offset: f64,
    pub events: Vec<CompiledEvent>,
}

impl CompiledTrack {
    pub fn duration(&self) -> f64 {
        self.offset + self.events.iter().map(|e| e.duration).sum::<f64>()
    }
}

/// Assemble the active playlist of `sequence` against its current variable values.
pub fn active_points(sequence: &Sequence) -> Result<Timeline, CompileError> {
    let playlist = sequence
        .playlists
        .active()
        .ok_or(CompileError::NoActivePlaylist)?;
    Ok(PlaylistAssembler::new(&sequence.routines, sequence.variables.values()).assemble(playlist))
}
