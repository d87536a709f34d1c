// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use indexmap::IndexMap;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use super::{RunRecord, RunStorage};
use crate::observability::messages::scheduler::{
    RunHistoryUnreadable, RunParametersNotStored, RunRecordSkipped,
};
use crate::observability::messages::StructuredLog;

/// Appends one JSON record per run to a file.
#[derive(Debug, Clone)]
pub struct JsonLinesStorage {
    path: PathBuf,
}

impl JsonLinesStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every readable record, oldest first. A missing file holds no records.
    ///
    /// Lines that do not parse, such as a torn final append, are logged and skipped.
    pub async fn records(&self) -> io::Result<Vec<RunRecord>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut records = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<RunRecord>(line) {
                Ok(record) => records.push(record),
                Err(error) => RunRecordSkipped {
                    path: &self.path,
                    line: index + 1,
                    error: &error,
                }
                .log(),
            }
        }
        Ok(records)
    }

    async fn append(&self, record: &RunRecord) -> io::Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        if !self.ends_with_newline().await? {
            line.insert(0, '\n');
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }

    /// Whether the next append starts on a fresh line. Missing and empty files do.
    async fn ends_with_newline(&self) -> io::Result<bool> {
        let mut file = match tokio::fs::File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(e),
        };
        if file.metadata().await?.len() == 0 {
            return Ok(true);
        }
        file.seek(SeekFrom::End(-1)).await?;
        let mut last = [0u8; 1];
        file.read_exact(&mut last).await?;
        Ok(last[0] == b'\n')
    }
}

#[async_trait]
impl RunStorage for JsonLinesStorage {
    async fn store_run_parameters(
        &self,
        run_id: u64,
        variables: &IndexMap<String, f64>,
        sweep: &IndexMap<String, usize>,
    ) {
        let record = RunRecord::now(run_id, variables, sweep);
        if let Err(error) = self.append(&record).await {
            RunParametersNotStored {
                run_id,
                error: &error,
            }
            .log();
        }
    }

    async fn latest_run_id(&self) -> u64 {
        match self.records().await {
            Ok(records) => records.iter().map(|r| r.run_id).max().unwrap_or(0),
            Err(error) => {
                RunHistoryUnreadable {
                    path: &self.path,
                    error: &error,
                }
                .log();
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_records_round_trip_through_file() {
        let dir = TempDir::new().unwrap();
        let storage = JsonLinesStorage::new(dir.path().join("runs.jsonl"));
        assert_eq!(storage.latest_run_id().await, 0);

        let values = IndexMap::from([("t_load".to_string(), 100.0), ("detuning".to_string(), -2.5)]);
        let sweep = IndexMap::from([("detuning".to_string(), 3)]);
        storage.store_run_parameters(41, &values, &sweep).await;
        storage.store_run_parameters(42, &values, &IndexMap::new()).await;

        assert_eq!(storage.latest_run_id().await, 42);
        let records = storage.records().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].variables, values);
        assert_eq!(records[0].sweep, sweep);
        assert!(records[0].timestamp > 0);
    }

    #[tokio::test]
    async fn test_unwritable_path_is_best_effort() {
        let dir = TempDir::new().unwrap();
        let storage = JsonLinesStorage::new(dir.path().join("missing").join("runs.jsonl"));
        storage
            .store_run_parameters(1, &IndexMap::new(), &IndexMap::new())
            .await;
        assert_eq!(storage.latest_run_id().await, 0);
    }

    #[tokio::test]
    async fn test_torn_append_keeps_run_ids_going() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("runs.jsonl");
        let storage = JsonLinesStorage::new(&path);
        for run_id in 1..=41 {
            storage
                .store_run_parameters(run_id, &IndexMap::new(), &IndexMap::new())
                .await;
        }

        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        std::io::Write::write_all(&mut file, br#"{"run_id":42,"times"#).unwrap();

        assert_eq!(storage.latest_run_id().await, 41);
        assert_eq!(storage.records().await.unwrap().len(), 41);

        storage
            .store_run_parameters(42, &IndexMap::new(), &IndexMap::new())
            .await;
        assert_eq!(storage.latest_run_id().await, 42);
        assert_eq!(storage.records().await.unwrap().len(), 42);
    }

    #[tokio::test]
    async fn test_garbage_only_file_reads_as_zero() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("runs.jsonl");
        std::fs::write(&path, "not json\n").unwrap();
        assert_eq!(JsonLinesStorage::new(path).latest_run_id().await, 0);
    }
}
