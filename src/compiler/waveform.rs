// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Fixed-resolution sampling of analog waveforms.

use std::f64::consts::PI;

use super::CompiledEvent;

/// An analog waveform with its parameters already evaluated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Linear {
        start: f64,
        end: f64,
    },
    Exponential {
        start: f64,
        end: f64,
        gamma: f64,
    },
    Sine {
        amplitude: f64,
        frequency: f64,
        phase: f64,
        offset: f64,
    },
}

impl Shape {
    /// Value at `t` ms into an event lasting `duration` ms.
    pub fn value(&self, t: f64, duration: f64) -> f64 {
        match *self {
            Shape::Linear { start, end } => {
                if duration == 0.0 {
                    end
                } else {
                    start + (end - start) * (t / duration)
                }
            }
            Shape::Exponential { start, end, gamma } => end + (start - end) * (-gamma * t).exp(),
            Shape::Sine {
                amplitude,
                frequency,
                phase,
                offset,
            } => amplitude * (2.0 * PI * frequency * t + phase).sin() + offset,
        }
    }
}

/// Sample `shape` at `resolution` evenly spaced points over `duration`, endpoints included.
///
/// Every sample but the last lasts `duration / (resolution - 1)`; the last lasts zero
/// and marks the value held after the event. A zero-length event yields that hold
/// sample alone.
///
/// # Examples
///
/// ```
/// use the_sequencer::compiler::waveform::{sample, Shape};
///
/// let ramp = sample(&Shape::Linear { start: 0.0, end: 10.0 }, 100.0, 5);
/// let values: Vec<f64> = ramp.iter().map(|e| e.value).collect();
/// assert_eq!(values, vec![0.0, 2.5, 5.0, 7.5, 10.0]);
/// assert_eq!(ramp[0].duration, 25.0);
/// assert_eq!(ramp[4].duration, 0.0);
/// ```
pub fn sample(shape: &Shape, duration: f64, resolution: usize) -> Vec<CompiledEvent> {
    if duration == 0.0 {
        return vec![CompiledEvent {
            duration: 0.0,
            value: shape.value(0.0, 0.0),
        }];
    }

    let n = resolution.max(2);
    let step = duration / (n - 1) as f64;
    (0..n)
        .map(|i| {
            let last = i == n - 1;
            // Pin the final sample to the exact end so ramps land on their end value.
            let t = if last { duration } else { i as f64 * step };
            CompiledEvent {
                duration: if last { 0.0 } else { step },
                value: shape.value(t, duration),
            }
        })
        .collect()
}
