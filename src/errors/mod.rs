// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Error taxonomy for the sequencer.
//!
//! * [`ConfigurationError`] - edit-time and configuration-file rejections
//! * [`VariableEvaluationError`] - per-variable evaluation faults
//! * [`CompileError`] - per-track and per-playlist-node compile faults
//! * [`HardwareError`] - faults surfaced by output systems
//! * [`SchedulerError`] - commands the scheduler refuses
//! * [`DocumentError`] - sequence document and config file I/O

mod compile;
mod config;
mod document;
mod evaluation;
mod hardware;
mod scheduler;

pub use compile::CompileError;
pub use config::ConfigurationError;
pub use document::DocumentError;
pub use evaluation::VariableEvaluationError;
pub use hardware::HardwareError;
pub use scheduler::SchedulerError;
