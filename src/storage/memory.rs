// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{RunRecord, RunStorage};

/// Keeps run records in memory. Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    records: Arc<Mutex<Vec<RunRecord>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<RunRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl RunStorage for MemoryStorage {
    async fn store_run_parameters(
        &self,
        run_id: u64,
        variables: &IndexMap<String, f64>,
        sweep: &IndexMap<String, usize>,
    ) {
        self.records
            .lock()
            .await
            .push(RunRecord::now(run_id, variables, sweep));
    }

    async fn latest_run_id(&self) -> u64 {
        self.records
            .lock()
            .await
            .last()
            .map(|record| record.run_id)
            .unwrap_or(0)
    }
}
