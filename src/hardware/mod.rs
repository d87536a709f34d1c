// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Output systems and the aggregate that drives them.
//!
//! * [`OutputSystem`] - the contract every backend implements
//! * [`Hardware`] - partitions timelines by card ownership and synchronizes completion
//! * [`CompletionBarrier`] - the fan-in rule for completion reports
//! * [`DummyOutputSystem`] - a timer-driven backend for development and tests

mod aggregate;
mod barrier;
mod dummy;
mod output_system;
pub mod resample;

pub use aggregate::Hardware;
pub use barrier::CompletionBarrier;
pub use dummy::DummyOutputSystem;
pub use output_system::{HardwareEvent, OutputSystem};
