// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use indexmap::IndexMap;

/// Fan-in of completion signals from every output system.
///
/// Each system has a running flag. The barrier fires when a completion clears the
/// last flag still set; completions for systems that are not running change nothing.
///
/// # Examples
///
/// ```
/// use the_sequencer::hardware::CompletionBarrier;
///
/// let mut barrier = CompletionBarrier::new(["dio", "ao"]);
/// barrier.arm();
///
/// assert!(!barrier.finish("ao"));
/// assert!(!barrier.finish("ao"));
/// assert!(barrier.finish("dio"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CompletionBarrier {
    running: IndexMap<String, bool>,
}

impl CompletionBarrier {
    pub fn new<I, S>(systems: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            running: systems.into_iter().map(|s| (s.into(), false)).collect(),
        }
    }

    pub fn register(&mut self, system: &str) {
        self.running.entry(system.to_string()).or_insert(false);
    }

    /// Mark every system as running.
    pub fn arm(&mut self) {
        self.running.values_mut().for_each(|flag| *flag = true);
    }

    /// Clear every flag without firing.
    pub fn reset(&mut self) {
        self.running.values_mut().for_each(|flag| *flag = false);
    }

    /// Record completion from `system`; returns true when this completion finishes the run.
    pub fn finish(&mut self, system: &str) -> bool {
        match self.running.get_mut(system) {
            Some(flag) if *flag => {
                *flag = false;
                self.is_idle()
            }
            _ => false,
        }
    }

    pub fn is_running(&self, system: &str) -> bool {
        self.running.get(system).copied().unwrap_or(false)
    }

    pub fn is_idle(&self) -> bool {
        self.running.values().all(|flag| !flag)
    }

    /// Systems that have not reported yet.
    pub fn pending(&self) -> Vec<&str> {
        self.running
            .iter()
            .filter(|(_, running)| **running)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}
