// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::errors::DocumentError;

/// File formats understood for documents and configuration, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
    Toml,
}

impl Format {
    pub fn from_path(path: &Path) -> Result<Self, DocumentError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("yaml") | Some("yml") => Ok(Format::Yaml),
            Some("json") => Ok(Format::Json),
            Some("toml") => Ok(Format::Toml),
            _ => Err(DocumentError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    pub fn parse<T: DeserializeOwned>(&self, content: &str) -> Result<T, DocumentError> {
        Ok(match self {
            Format::Yaml => serde_yaml::from_str(content)?,
            Format::Json => serde_json::from_str(content)?,
            Format::Toml => toml::from_str(content)?,
        })
    }

    pub fn render<T: Serialize>(&self, value: &T) -> Result<String, DocumentError> {
        Ok(match self {
            Format::Yaml => serde_yaml::to_string(value)?,
            Format::Json => serde_json::to_string_pretty(value)?,
            Format::Toml => toml::to_string_pretty(value)?,
        })
    }
}

/// Read and parse `path` in the format its extension names.
pub fn read<T: DeserializeOwned>(path: &Path) -> Result<T, DocumentError> {
    let format = Format::from_path(path)?;
    let content = fs::read_to_string(path).map_err(|source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    format.parse(&content)
}

/// Render `value` in the format the extension of `path` names and write it there.
pub fn write<T: Serialize>(path: &Path, value: &T) -> Result<(), DocumentError> {
    let content = Format::from_path(path)?.render(value)?;
    fs::write(path, content).map_err(|source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(Format::from_path(Path::new("a.yaml")).unwrap(), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("a.YML")).unwrap(), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("a.json")).unwrap(), Format::Json);
        assert_eq!(Format::from_path(Path::new("a.toml")).unwrap(), Format::Toml);
        assert!(matches!(
            Format::from_path(&PathBuf::from("a.txt")),
            Err(DocumentError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result: Result<serde_yaml::Value, _> = read(Path::new("/nonexistent/seq.yaml"));
        assert!(matches!(result, Err(DocumentError::Io { .. })));
    }
}
