// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for routine compilation and playlist assembly.

use crate::errors::CompileError;
use crate::observability::messages::StructuredLog;
use crate::sequence::{ChannelId, NodePath};
use std::fmt::{Display, Formatter};
use tracing::Span;

/// One track of a routine failed to compile; the other tracks are unaffected.
///
/// # Log Level
/// `warn!` - The track is left out of the timeline
pub struct TrackCompileFailed<'a> {
    pub routine: &'a str,
    pub channel: &'a ChannelId,
    pub error: &'a CompileError,
}

impl Display for TrackCompileFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Track {} of routine '{}' failed to compile: {}",
            self.channel, self.routine, self.error
        )
    }
}

impl StructuredLog for TrackCompileFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            routine = self.routine,
            channel = %self.channel,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "track_compile_failed",
            span_name = name,
            routine = self.routine,
            channel = %self.channel,
        )
    }
}

/// A playlist node could not be placed: unknown routine, bad gap or broken track.
///
/// # Log Level
/// `warn!` - The node contributes nothing, or only its healthy tracks
pub struct NodeCompileFailed<'a> {
    pub playlist: &'a str,
    pub path: &'a NodePath,
    pub error: &'a CompileError,
}

impl Display for NodeCompileFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Node {} of playlist '{}' failed: {}",
            self.path, self.playlist, self.error
        )
    }
}

impl StructuredLog for NodeCompileFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            playlist = self.playlist,
            path = %self.path,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "node_compile_failed",
            span_name = name,
            playlist = self.playlist,
            path = %self.path,
        )
    }
}

/// A playlist was folded into a timeline.
///
/// # Log Level
/// `info!` - Once per hardware cycle
///
/// # Example
/// ```
/// use the_sequencer::observability::messages::compiler::TimelineAssembled;
///
/// let msg = TimelineAssembled {
///     playlist: "main",
///     channels: 4,
///     points: 1024,
///     length: 250.0,
///     errors: 0,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct TimelineAssembled<'a> {
    pub playlist: &'a str,
    pub channels: usize,
    pub points: usize,
    pub length: f64,
    pub errors: usize,
}

impl Display for TimelineAssembled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Assembled playlist '{}': {} channels, {} points, {} ms",
            self.playlist, self.channels, self.points, self.length
        )?;
        if self.errors > 0 {
            write!(f, " ({} errors)", self.errors)?;
        }
        Ok(())
    }
}

impl StructuredLog for TimelineAssembled<'_> {
    fn log(&self) {
        tracing::info!(
            playlist = self.playlist,
            channels = self.channels,
            points = self.points,
            length_ms = self.length,
            errors = self.errors,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "timeline",
            span_name = name,
            playlist = self.playlist,
            channels = self.channels,
            length_ms = self.length,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeline_assembled_mentions_errors_only_when_present() {
        let clean = TimelineAssembled {
            playlist: "main",
            channels: 2,
            points: 10,
            length: 8.0,
            errors: 0,
        };
        assert_eq!(
            clean.to_string(),
            "Assembled playlist 'main': 2 channels, 10 points, 8 ms"
        );

        let broken = TimelineAssembled { errors: 3, ..clean };
        assert!(broken.to_string().ends_with("(3 errors)"));
    }

    #[test]
    fn test_track_compile_failed_display() {
        let channel = ChannelId::new("dio0", 2);
        let error = CompileError::UnknownRoutine("x".into());
        let msg = TrackCompileFailed {
            routine: "load",
            channel: &channel,
            error: &error,
        };
        assert!(msg.to_string().starts_with("Track dio0[2] of routine 'load'"));
    }
}
