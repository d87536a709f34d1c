// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use crate::expression::ExpressionError;

/// A track or playlist node that failed to compile. Other tracks and nodes still compile.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    /// A duration, offset or waveform parameter expression failed.
    #[error("{context}: {source}")]
    Expression {
        context: String,
        #[source]
        source: ExpressionError,
    },

    #[error("{context}: negative duration {duration}")]
    NegativeDuration { context: String, duration: f64 },

    /// A waveform sample evaluated to NaN or infinity.
    #[error("{context}: waveform produced a non-finite sample")]
    NonFiniteSample { context: String },

    #[error("playlist references unknown routine '{0}'")]
    UnknownRoutine(String),

    #[error("no active playlist")]
    NoActivePlaylist,
}
