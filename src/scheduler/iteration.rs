// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tokio::sync::mpsc;

use super::state::{SchedulerState, SchedulerStatus};
use super::sweep::{cartesian_product, sweep_axes, IndexTuple};
use crate::compiler::active_points;
use crate::config::{Runtime, SchedulerOptions};
use crate::errors::SchedulerError;
use crate::hardware::{Hardware, HardwareEvent};
use crate::notify::Notifier;
use crate::observability::messages::scheduler::{
    RunRefused, RunStarted, SchedulerStopped, SweepPassCompleted,
};
use crate::observability::messages::StructuredLog;
use crate::sequence::Sequence;
use crate::storage::RunStorage;

/// Drives runs of the active playlist: single shots, continuous repetition and sweeps.
///
/// Every method takes `&mut self`; callers serialise commands and hardware events onto
/// one task (see [`spawn`](super::spawn)). A new run is never dispatched while an output
/// system has yet to report completion of the previous one.
pub struct IterationScheduler {
    sequence: Sequence,
    hardware: Hardware,
    storage: Box<dyn RunStorage>,
    notifier: Box<dyn Notifier>,
    options: SchedulerOptions,
    state: SchedulerState,
    next_run_id: u64,
    runs: u64,
    sweep: Vec<IndexTuple>,
    run_index: usize,
    iteration: u64,
    shuffle: bool,
    shuffling: bool,
    rng: StdRng,
}

impl IterationScheduler {
    /// Run ids continue from the latest id in storage.
    pub async fn new(sequence: Sequence, runtime: Runtime) -> Self {
        let Runtime {
            hardware,
            storage,
            notifier,
            options,
        } = runtime;
        let next_run_id = storage.latest_run_id().await + 1;
        let rng = match options.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            sequence,
            hardware,
            storage,
            notifier,
            shuffle: options.shuffle,
            options,
            state: SchedulerState::Idle,
            next_run_id,
            runs: 0,
            sweep: Vec::new(),
            run_index: 0,
            iteration: 0,
            shuffling: false,
            rng,
        }
    }

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    /// Edits apply from the next dispatched run.
    pub fn sequence_mut(&mut self) -> &mut Sequence {
        &mut self.sequence
    }

    pub fn hardware(&self) -> &Hardware {
        &self.hardware
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Index tuples of the current sweep, in run order.
    pub fn sweep(&self) -> &[IndexTuple] {
        &self.sweep
    }

    /// The receiver for backend completion and fault events. Available once.
    pub fn take_hardware_events(&mut self) -> Option<mpsc::UnboundedReceiver<HardwareEvent>> {
        self.hardware.take_events()
    }

    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            state: self.state,
            next_run_id: self.next_run_id,
            run_index: self.run_index,
            sweep_length: self.sweep.len(),
            iteration: self.iteration,
            shuffle: self.shuffle,
            running: self.hardware.is_running(),
        }
    }

    /// Compile and dispatch the active playlist once.
    pub async fn play_once(&mut self) -> Result<(), SchedulerError> {
        let result = self.begin(SchedulerState::SingleShot).await;
        self.refused("play_once", result)
    }

    /// Dispatch the active playlist again each time the hardware finishes, until stopped.
    pub async fn play_continuous(&mut self) -> Result<(), SchedulerError> {
        let result = self.begin(SchedulerState::Continuous).await;
        self.refused("play_continuous", result)
    }

    /// Run every combination of swept-variable values, pass after pass.
    pub async fn iterate(&mut self) -> Result<(), SchedulerError> {
        let result = self.begin_sweep().await;
        self.refused("iterate", result)
    }

    /// Stop repeating and stop the hardware. Completions arriving afterwards are ignored.
    pub async fn stop(&mut self) -> Result<(), SchedulerError> {
        self.settle(SchedulerState::Stopped, "stop requested");
        self.hardware.stop().await?;
        Ok(())
    }

    /// Takes effect from the next `iterate`.
    pub fn set_shuffle(&mut self, enabled: bool) {
        self.shuffle = enabled;
    }

    /// Feed one backend event through the hardware barrier and act on a completed run.
    pub async fn on_hardware_event(&mut self, event: HardwareEvent) {
        match self.hardware.on_event(event) {
            Ok(true) => self.advance().await,
            Ok(false) => {}
            Err(error) => {
                self.notifier.publish(&format!("hardware fault: {}", error));
                self.halt("hardware fault").await;
            }
        }
    }

    /// Stop the hardware if it is still running and return to rest.
    pub async fn shutdown(&mut self) {
        if !self.state.is_at_rest() || self.hardware.is_running() {
            self.halt("shutdown").await;
        }
    }

    async fn begin(&mut self, state: SchedulerState) -> Result<(), SchedulerError> {
        if self.hardware.is_running() {
            return Err(SchedulerError::RunInProgress);
        }
        self.ensure_resolved()?;
        self.hardware.cycle_init().await?;

        self.state = state;
        self.runs = 0;
        if let Err(error) = self.run_cycle().await {
            self.state = SchedulerState::Idle;
            // The first run failed; nothing else is running.
            let _ = self.hardware.stop().await;
            return Err(error);
        }
        Ok(())
    }

    async fn begin_sweep(&mut self) -> Result<(), SchedulerError> {
        if self.hardware.is_running() {
            return Err(SchedulerError::RunInProgress);
        }
        self.ensure_resolved()?;
        let axes = sweep_axes(&self.sequence.variables)?;
        let mut sweep = cartesian_product(&axes)?;

        self.shuffling = self.shuffle;
        if self.shuffling {
            sweep.shuffle(&mut self.rng);
        }
        if let Some(first) = sweep.first() {
            self.sequence.variables.set_scan_indices(first)?;
        }
        self.sweep = sweep;
        self.run_index = 0;
        self.iteration = 0;

        self.begin(SchedulerState::Sweeping).await
    }

    /// Compile, dispatch, record and announce one run.
    async fn run_cycle(&mut self) -> Result<(), SchedulerError> {
        self.ensure_resolved()?;
        let timeline = active_points(&self.sequence).map_err(|error| SchedulerError::Compile {
            errors: vec![error],
        })?;
        if !timeline.is_complete() && !self.options.allow_partial_timelines {
            return Err(SchedulerError::Compile {
                errors: timeline.errors.iter().map(|e| e.error.clone()).collect(),
            });
        }

        let run_id = self.next_run_id;
        self.hardware.process_sequence(&timeline, run_id).await?;
        self.hardware.play_once(run_id).await?;
        self.next_run_id += 1;
        self.runs += 1;

        let variables = self.sequence.variables.snapshot();
        let sweep = self.sequence.variables.sweep_snapshot();
        self.storage
            .store_run_parameters(run_id, &variables, &sweep)
            .await;

        RunStarted {
            run_id,
            mode: self.state.as_str(),
            run_index: self.run_index,
            iteration: self.iteration,
        }
        .log();
        self.notifier.publish(&format!("run {} started", run_id));
        Ok(())
    }

    async fn advance(&mut self) {
        match self.state {
            SchedulerState::SingleShot => self.settle(SchedulerState::Idle, "single run finished"),
            SchedulerState::Continuous => self.next_run().await,
            SchedulerState::Sweeping => {
                self.run_index += 1;
                if self.run_index >= self.sweep.len() {
                    self.run_index = 0;
                    self.iteration += 1;
                    SweepPassCompleted {
                        iteration: self.iteration,
                        runs: self.sweep.len(),
                    }
                    .log();
                    self.notifier
                        .publish(&format!("sweep pass {} completed", self.iteration));

                    if let Some(limit) = self.options.max_iterations {
                        if self.iteration >= limit {
                            self.settle(SchedulerState::Idle, "iteration limit reached");
                            return;
                        }
                    }
                    if self.shuffling {
                        self.sweep.shuffle(&mut self.rng);
                    }
                }

                let indices = self.sweep[self.run_index].clone();
                if let Err(error) = self.sequence.variables.set_scan_indices(&indices) {
                    self.notifier.publish(&format!("sweep aborted: {}", error));
                    self.halt("sweep variables changed").await;
                    return;
                }
                self.next_run().await;
            }
            SchedulerState::Idle | SchedulerState::Stopped => {}
        }
    }

    async fn next_run(&mut self) {
        if let Err(error) = self.run_cycle().await {
            let reason = format!("run failed: {}", error);
            self.halt(&reason).await;
        }
    }

    fn ensure_resolved(&self) -> Result<(), SchedulerError> {
        let unresolved = &self.sequence.variables.evaluation().unresolved;
        if unresolved.is_empty() {
            Ok(())
        } else {
            Err(SchedulerError::UnresolvedVariables {
                variables: unresolved.clone(),
            })
        }
    }

    /// Enter a resting state without touching the hardware.
    fn settle(&mut self, state: SchedulerState, reason: &str) {
        self.state = state;
        SchedulerStopped {
            reason,
            runs: self.runs,
        }
        .log();
        self.notifier
            .publish(&format!("scheduler stopped: {}", reason));
    }

    /// Enter `Stopped` and stop the hardware, ignoring its errors.
    async fn halt(&mut self, reason: &str) {
        self.settle(SchedulerState::Stopped, reason);
        let _ = self.hardware.stop().await;
    }

    fn refused(
        &self,
        command: &str,
        result: Result<(), SchedulerError>,
    ) -> Result<(), SchedulerError> {
        if let Err(error) = &result {
            RunRefused { command, error }.log();
            self.notifier
                .publish(&format!("refused {}: {}", command, error));
        }
        result
    }
}
