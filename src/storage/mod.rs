// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Run-parameter persistence.
//!
//! Every run records its id, the variable values and the sweep indices it used.
//! Storage is best-effort: failures are logged and never stop a run.

mod json_lines;
mod memory;

pub use json_lines::JsonLinesStorage;
pub use memory::MemoryStorage;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// The parameters of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: u64,
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
    pub variables: IndexMap<String, f64>,
    #[serde(default)]
    pub sweep: IndexMap<String, usize>,
}

impl RunRecord {
    /// A record stamped with the current time.
    pub fn now(
        run_id: u64,
        variables: &IndexMap<String, f64>,
        sweep: &IndexMap<String, usize>,
    ) -> Self {
        Self {
            run_id,
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
            variables: variables.clone(),
            sweep: sweep.clone(),
        }
    }
}

#[async_trait]
pub trait RunStorage: Send + Sync {
    /// Persist one run's parameters. Failures are logged, not returned.
    async fn store_run_parameters(
        &self,
        run_id: u64,
        variables: &IndexMap<String, f64>,
        sweep: &IndexMap<String, usize>,
    );

    /// Id of the most recent stored run, 0 when nothing is stored.
    async fn latest_run_id(&self) -> u64;
}
