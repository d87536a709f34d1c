// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Samples per analog ramp (linear, exponential and sine events)
pub const ANALOG_RESOLUTION: usize = 500;
/// Port of the TCP publish endpoint when none is configured
pub const DEFAULT_NOTIFICATION_PORT: u16 = 9193;
/// Milliseconds the dummy backend waits before reporting completion
pub const DEFAULT_COMPLETION_DELAY_MS: u64 = 1500;
/// Upper bound on values per swept variable
pub const MAX_SWEEP_VALUES: usize = 1_000_000;
/// Upper bound on index tuples in one sweep pass
pub const MAX_SWEEP_POINTS: usize = 1_000_000;
/// Highest analog card sample rate accepted, in samples per ms
pub const MAX_SAMPLE_RATE: f64 = 10_000.0;
/// Upper bound on samples in one resampled channel
pub const MAX_RESAMPLE_POINTS: usize = 10_000_000;
/// Milliseconds a notification may spend connecting before it is dropped
pub const NOTIFICATION_CONNECT_TIMEOUT_MS: u64 = 2_000;
/// Buffered sequence changes per subscriber before the oldest are dropped
pub const CHANGE_FEED_CAPACITY: usize = 256;
/// Buffered commands waiting for the scheduler task
pub const SCHEDULER_COMMAND_CAPACITY: usize = 64;
