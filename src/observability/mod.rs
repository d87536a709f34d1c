// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! Lifecycle events are logged through message structs rather than string
//! literals at the call site. Each struct implements `Display` for the text and
//! [`messages::StructuredLog`] for the level and the structured fields.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::variables` - evaluation passes and unresolved variables
//! * `messages::compiler` - track failures and assembled timelines
//! * `messages::hardware` - dispatch, completion and backend faults
//! * `messages::scheduler` - runs, sweeps, storage and notifications
//!
//! # Usage
//!
//! ```rust
//! use the_sequencer::observability::messages::scheduler::SweepPassCompleted;
//!
//! let msg = SweepPassCompleted { iteration: 2, runs: 6 };
//! tracing::info!("{}", msg);
//! ```

pub mod messages;
