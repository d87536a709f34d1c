// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::output_system::{HardwareEvent, OutputSystem};
use super::resample::zero_order_hold;
use crate::compiler::Timeline;
use crate::config::consts::{DEFAULT_COMPLETION_DELAY_MS, MAX_RESAMPLE_POINTS};
use crate::errors::HardwareError;
use crate::observability::messages::hardware::ProgramLoaded;
use crate::observability::messages::StructuredLog;
use crate::sequence::{Card, CardKind};

/// A backend without hardware: it logs what it receives and reports completion on a timer.
pub struct DummyOutputSystem {
    name: String,
    cards: Vec<Card>,
    delay: Duration,
    listeners: Vec<mpsc::UnboundedSender<HardwareEvent>>,
    program: Option<(u64, Timeline)>,
    running: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl DummyOutputSystem {
    pub fn new(name: impl Into<String>, cards: Vec<Card>) -> Self {
        Self {
            name: name.into(),
            cards,
            delay: Duration::from_millis(DEFAULT_COMPLETION_DELAY_MS),
            listeners: Vec::new(),
            program: None,
            running: Arc::new(AtomicBool::new(false)),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// The loaded run id and timeline, after resampling.
    pub fn program(&self) -> Option<(u64, &Timeline)> {
        self.program.as_ref().map(|(run_id, timeline)| (*run_id, timeline))
    }

    fn loaded_run(&self) -> Result<u64, HardwareError> {
        self.program
            .as_ref()
            .map(|(run_id, _)| *run_id)
            .ok_or_else(|| HardwareError::NoProgram(self.name.clone()))
    }

    fn notifier(&self, run_id: u64) -> Notifier {
        Notifier {
            listeners: self.listeners.clone(),
            event: HardwareEvent::SequenceFinished {
                system: self.name.clone(),
                run_id,
            },
        }
    }
}

#[derive(Clone)]
struct Notifier {
    listeners: Vec<mpsc::UnboundedSender<HardwareEvent>>,
    event: HardwareEvent,
}

impl Notifier {
    fn notify(&self) {
        for listener in &self.listeners {
            // A dropped listener means nobody is waiting any more.
            let _ = listener.send(self.event.clone());
        }
    }
}

#[async_trait]
impl OutputSystem for DummyOutputSystem {
    fn name(&self) -> &str {
        &self.name
    }

    fn cards(&self) -> &[Card] {
        &self.cards
    }

    async fn process_sequence(&mut self, timeline: &Timeline, run_id: u64) -> Result<(), HardwareError> {
        let mut program = timeline.clone();
        for (channel, points) in program.channels.iter_mut() {
            let card = self
                .cards
                .iter()
                .find(|card| card.name == channel.card)
                .ok_or_else(|| HardwareError::InvalidTimeline {
                    system: self.name.clone(),
                    message: format!("channel {} is not on this system", channel),
                })?;
            if let (CardKind::Analog, Some(rate)) = (card.kind, card.sample_rate) {
                *points = zero_order_hold(points, rate).ok_or_else(|| {
                    HardwareError::InvalidTimeline {
                        system: self.name.clone(),
                        message: format!(
                            "channel {} needs more than {} samples at {} per ms",
                            channel, MAX_RESAMPLE_POINTS, rate
                        ),
                    }
                })?;
            }
        }

        ProgramLoaded {
            system: &self.name,
            run_id,
            channels: program.channels.len(),
            points: program.point_count(),
            length: program.length,
        }
        .log();
        self.program = Some((run_id, program));
        Ok(())
    }

    async fn cycle_init(&mut self) -> Result<(), HardwareError> {
        tracing::debug!(system = %self.name, "cycle init");
        Ok(())
    }

    async fn play_once(&mut self, run_id: u64) -> Result<(), HardwareError> {
        self.loaded_run()?;
        let notifier = self.notifier(run_id);
        let running = Arc::clone(&self.running);
        let cancel = self.cancel.clone();
        let delay = self.delay;

        running.store(true, Ordering::SeqCst);
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    if running.swap(false, Ordering::SeqCst) {
                        notifier.notify();
                    }
                }
            }
        });
        Ok(())
    }

    async fn play(&mut self) -> Result<(), HardwareError> {
        let run_id = self.loaded_run()?;
        let notifier = self.notifier(run_id);
        let cancel = self.cancel.clone();
        let delay = self.delay;

        self.running.store(true, Ordering::SeqCst);
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval_at(tokio::time::Instant::now() + delay, delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticks.tick() => notifier.notify(),
                }
            }
        });
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), HardwareError> {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        if self.running.swap(false, Ordering::SeqCst) {
            if let Some((run_id, _)) = &self.program {
                self.notifier(*run_id).notify();
            }
        }
        Ok(())
    }

    fn add_sequence_end_listener(&mut self, listener: mpsc::UnboundedSender<HardwareEvent>) {
        self.listeners.push(listener);
    }
}
