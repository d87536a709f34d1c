// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Fault surfaced by an output system. Terminal for the current run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HardwareError {
    #[error("output system '{system}' fault: {message}")]
    Fault { system: String, message: String },

    #[error("output system '{system}' rejected the timeline: {message}")]
    InvalidTimeline { system: String, message: String },

    #[error("unknown output system '{0}'")]
    UnknownSystem(String),

    #[error("output system '{0}' has no program loaded")]
    NoProgram(String),
}

impl HardwareError {
    pub fn system(&self) -> &str {
        match self {
            HardwareError::Fault { system, .. } | HardwareError::InvalidTimeline { system, .. } => {
                system
            }
            HardwareError::UnknownSystem(system) | HardwareError::NoProgram(system) => system,
        }
    }
}
