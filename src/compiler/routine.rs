// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;

use super::waveform::{sample, Shape};
use super::{CompiledEvent, CompiledTrack};
use crate::config::consts::ANALOG_RESOLUTION;
use crate::errors::CompileError;
use crate::expression::{Bindings, Formula};
use crate::observability::messages::compiler::TrackCompileFailed;
use crate::observability::messages::StructuredLog;
use crate::sequence::{ChannelId, Event, Routine, Track, Waveform};

/// One routine compiled against a set of variable values.
///
/// Each channel carries either its compiled track or the error that stopped it;
/// a broken track never affects the others.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRoutine {
    pub name: String,
    pub tracks: BTreeMap<ChannelId, Result<CompiledTrack, CompileError>>,
}

impl CompiledRoutine {
    /// Longest successfully compiled track, offset included.
    pub fn duration(&self) -> f64 {
        self.tracks
            .values()
            .filter_map(|track| track.as_ref().ok())
            .map(CompiledTrack::duration)
            .fold(0.0, f64::max)
    }

    pub fn errors(&self) -> impl Iterator<Item = (&ChannelId, &CompileError)> {
        self.tracks
            .iter()
            .filter_map(|(channel, track)| track.as_ref().err().map(|e| (channel, e)))
    }
}

/// Turns symbolic routines into concrete per-channel events.
pub struct RoutineCompiler<'a, B: Bindings + ?Sized> {
    values: &'a B,
    resolution: usize,
}

impl<'a, B: Bindings + ?Sized> RoutineCompiler<'a, B> {
    pub fn new(values: &'a B) -> Self {
        Self {
            values,
            resolution: ANALOG_RESOLUTION,
        }
    }

    /// Override the number of samples per analog ramp.
    pub fn with_resolution(mut self, resolution: usize) -> Self {
        self.resolution = resolution.max(2);
        self
    }

    /// Compile every track of `routine`.
    pub fn compile(&self, routine: &Routine) -> CompiledRoutine {
        let tracks = routine
            .tracks
            .iter()
            .map(|track| {
                let compiled = self.compile_track(&routine.name, track);
                if let Err(error) = &compiled {
                    TrackCompileFailed {
                        routine: &routine.name,
                        channel: &track.channel,
                        error,
                    }
                    .log();
                }
                (track.channel.clone(), compiled)
            })
            .collect();

        CompiledRoutine {
            name: routine.name.clone(),
            tracks,
        }
    }

    /// Duration of the longest track, or the first track error.
    pub fn duration(&self, routine: &Routine) -> Result<f64, CompileError> {
        let mut longest = 0.0f64;
        for track in &routine.tracks {
            longest = longest.max(self.compile_track(&routine.name, track)?.duration());
        }
        Ok(longest)
    }

    pub fn compile_track(
        &self,
        routine: &str,
        track: &Track,
    ) -> Result<CompiledTrack, CompileError> {
        let context = |what: String| format!("routine '{}' channel {} {}", routine, track.channel, what);

        let offset = self.eval(&track.offset, || context("offset".into()))?;
        if offset < 0.0 {
            return Err(CompileError::NegativeDuration {
                context: context("offset".into()),
                duration: offset,
            });
        }

        let mut events = Vec::with_capacity(track.events.len());
        for (index, event) in track.events.iter().enumerate() {
            let event_context = |what: &str| context(format!("event {} {}", index, what));
            events.extend(self.compile_event(event, &event_context)?);
        }

        Ok(CompiledTrack { offset, events })
    }

    fn compile_event(
        &self,
        event: &Event,
        context: &dyn Fn(&str) -> String,
    ) -> Result<Vec<CompiledEvent>, CompileError> {
        let duration = self.eval(event.duration(), || context("duration"))?;
        if duration < 0.0 {
            return Err(CompileError::NegativeDuration {
                context: context("duration"),
                duration,
            });
        }

        let samples = match event {
            Event::Digital { state, .. } => vec![CompiledEvent {
                duration,
                value: if *state { 1.0 } else { 0.0 },
            }],
            Event::Analog { waveform, .. } => {
                let shape = match waveform {
                    Waveform::Constant { value } => {
                        let value = self.eval(value, || context("value"))?;
                        return Ok(vec![CompiledEvent { duration, value }]);
                    }
                    Waveform::Linear { start, end } => Shape::Linear {
                        start: self.eval(start, || context("start"))?,
                        end: self.eval(end, || context("end"))?,
                    },
                    Waveform::Exponential { start, end, gamma } => Shape::Exponential {
                        start: self.eval(start, || context("start"))?,
                        end: self.eval(end, || context("end"))?,
                        gamma: self.eval(gamma, || context("gamma"))?,
                    },
                    Waveform::Sine {
                        amplitude,
                        frequency,
                        phase,
                        offset,
                    } => Shape::Sine {
                        amplitude: self.eval(amplitude, || context("amplitude"))?,
                        frequency: self.eval(frequency, || context("frequency"))?,
                        phase: self.eval(phase, || context("phase"))?,
                        offset: self.eval(offset, || context("offset"))?,
                    },
                };
                sample(&shape, duration, self.resolution)
            }
        };

        if samples.iter().any(|s| !s.value.is_finite()) {
            return Err(CompileError::NonFiniteSample {
                context: context("waveform"),
            });
        }
        Ok(samples)
    }

    fn eval(&self, formula: &Formula, context: impl FnOnce() -> String) -> Result<f64, CompileError> {
        crate::expression::evaluate(formula.as_str(), self.values).map_err(|source| {
            CompileError::Expression {
                context: context(),
                source,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::ExpressionError;
    use indexmap::IndexMap;

    fn values() -> IndexMap<String, f64> {
        [("t_ramp", 100.0), ("v_max", 10.0), ("t_delay", 2.0)]
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect()
    }

    fn dio(index: usize) -> ChannelId {
        ChannelId::new("dio0", index)
    }

    fn ao(index: usize) -> ChannelId {
        ChannelId::new("ao0", index)
    }

    #[test]
    fn test_digital_track() {
        let values = values();
        let routine = Routine::new("pulse").with_track(
            Track::new(dio(0))
                .with_offset("t_delay")
                .with_event(Event::digital(5, true))
                .with_event(Event::digital("t_delay * 2", false)),
        );

        let compiled = RoutineCompiler::new(&values).compile(&routine);
        let track = compiled.tracks[&dio(0)].as_ref().unwrap();
        assert_eq!(track.offset, 2.0);
        assert_eq!(
            track.events,
            vec![
                CompiledEvent { duration: 5.0, value: 1.0 },
                CompiledEvent { duration: 4.0, value: 0.0 },
            ]
        );
        assert_eq!(compiled.duration(), 11.0);
    }

    #[test]
    fn test_linear_ramp_uses_resolution() {
        let values = values();
        let routine = Routine::new("ramp")
            .with_track(Track::new(ao(0)).with_event(Event::linear("t_ramp", 0, "v_max")));

        let compiled = RoutineCompiler::new(&values).compile(&routine);
        let events = &compiled.tracks[&ao(0)].as_ref().unwrap().events;
        assert_eq!(events.len(), ANALOG_RESOLUTION);
        assert_eq!(events[0].value, 0.0);
        assert_eq!(events[ANALOG_RESOLUTION - 1].value, 10.0);
        assert_eq!(events[ANALOG_RESOLUTION - 1].duration, 0.0);
        assert!(events.windows(2).all(|w| w[1].value > w[0].value));
        assert!((compiled.duration() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_broken_track_does_not_affect_others() {
        let values = values();
        let routine = Routine::new("mixed")
            .with_track(Track::new(dio(0)).with_event(Event::digital("missing", true)))
            .with_track(Track::new(dio(1)).with_event(Event::digital(3, true)));

        let compiled = RoutineCompiler::new(&values).compile(&routine);
        match &compiled.tracks[&dio(0)] {
            Err(CompileError::Expression { context, source }) => {
                assert!(context.contains("event 0 duration"));
                assert_eq!(source, &ExpressionError::UnknownName("missing".into()));
            }
            other => panic!("expected expression error, got {:?}", other),
        }
        assert!(compiled.tracks[&dio(1)].is_ok());
        assert_eq!(compiled.errors().count(), 1);
        assert_eq!(compiled.duration(), 3.0);
    }

    #[test]
    fn test_negative_duration_is_an_error() {
        let values = values();
        let routine = Routine::new("bad")
            .with_track(Track::new(dio(0)).with_event(Event::digital("-1", true)));

        let compiled = RoutineCompiler::new(&values).compile(&routine);
        assert!(matches!(
            compiled.tracks[&dio(0)],
            Err(CompileError::NegativeDuration { duration, .. }) if duration == -1.0
        ));
    }

    #[test]
    fn test_constant_and_zero_length_ramp() {
        let values = values();
        let routine = Routine::new("hold").with_track(
            Track::new(ao(0))
                .with_event(Event::constant(10, "v_max / 2"))
                .with_event(Event::linear(0, 0, 3)),
        );

        let compiled = RoutineCompiler::new(&values).compile(&routine);
        assert_eq!(
            compiled.tracks[&ao(0)].as_ref().unwrap().events,
            vec![
                CompiledEvent { duration: 10.0, value: 5.0 },
                CompiledEvent { duration: 0.0, value: 3.0 },
            ]
        );
    }

    #[test]
    fn test_duration_reports_first_error() {
        let values = values();
        let routine = Routine::new("bad")
            .with_track(Track::new(dio(0)).with_event(Event::digital("1/0", true)));
        assert!(RoutineCompiler::new(&values).duration(&routine).is_err());
    }
}
