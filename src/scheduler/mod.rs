// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Iteration scheduling: single shots, continuous runs and parameter sweeps.
//!
//! [`IterationScheduler`] holds the run state machine. [`spawn`] moves it onto its own
//! task and returns a [`SchedulerHandle`] for issuing commands.

mod iteration;
mod runner;
mod state;
mod sweep;

#[cfg(test)]
mod integration_tests;

pub use iteration::IterationScheduler;
pub use runner::{spawn, SchedulerCommand, SchedulerHandle, SequenceEdit};
pub use state::{SchedulerState, SchedulerStatus};
pub use sweep::{cartesian_product, sweep_axes, IndexTuple, SweepAxis};
