// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::PathBuf;
use thiserror::Error;

use super::ConfigurationError;

/// Failures loading or saving sequence documents and configuration files.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("failed to access '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported file format for '{}' (expected .yaml, .yml, .json or .toml)", .path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML error: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    /// The file parsed but describes something the sequencer rejects.
    #[error("invalid content: {0}")]
    Invalid(#[from] ConfigurationError),

    /// Several validation failures, reported together.
    #[error("configuration validation failed:\n{}", .errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("\n"))]
    Validation { errors: Vec<ConfigurationError> },
}
