// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for human-readable output and
//! [`StructuredLog`] to emit the same event with named fields.
//!
//! # Organization
//!
//! * `variables` - variable evaluation results
//! * `compiler` - routine compilation and playlist assembly
//! * `hardware` - dispatch to output systems and the completion barrier
//! * `scheduler` - run lifecycle, sweeps and collaborator failures
//!
//! # Usage Pattern
//!
//! ```rust
//! use the_sequencer::observability::messages::scheduler::RunStarted;
//! use the_sequencer::observability::messages::StructuredLog;
//!
//! let msg = RunStarted {
//!     run_id: 12,
//!     mode: "sweeping",
//!     run_index: 3,
//!     iteration: 0,
//! };
//!
//! msg.log();
//! ```

use tracing::Span;

pub mod compiler;
pub mod hardware;
pub mod scheduler;
pub mod variables;

/// A message that knows its log level and its structured fields.
pub trait StructuredLog {
    /// Emit the message at its level with its fields attached.
    fn log(&self);

    /// Open a span carrying the message's fields.
    fn span(&self, name: &str) -> Span;
}
