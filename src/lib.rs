// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod compiler;      // routine compiler + playlist assembler
pub mod config;        // config + runtime builder
pub mod document;      // sequence documents on disk
pub mod errors;        // error handling
pub mod expression;    // formula language
pub mod hardware;      // output systems + completion barrier
pub mod notify;        // status notifications
pub mod observability;
pub mod scheduler;     // run state machine + sweeps
pub mod sequence;      // editable sequence model
pub mod storage;       // run parameter persistence
pub mod variables;     // variable dataflow evaluation
