// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::compiler::Timeline;
use crate::config::{Runtime, SchedulerOptions};
use crate::errors::{HardwareError, SchedulerError};
use crate::hardware::{DummyOutputSystem, Hardware, HardwareEvent, OutputSystem};
use crate::notify::testing::RecordingNotifier;
use crate::scheduler::{spawn, IterationScheduler, SchedulerHandle, SchedulerState};
use crate::sequence::{
    Card, CardKind, ChannelId, Event, Playlist, PlaylistNode, Routine, Sequence, Track,
};
use crate::storage::{MemoryStorage, RunStorage};
use crate::variables::VariableSpec;

const TIMEOUT: Duration = Duration::from_secs(5);

/// A backend the test completes by hand.
#[derive(Clone, Default)]
struct Probe {
    listener: Arc<Mutex<Option<mpsc::UnboundedSender<HardwareEvent>>>>,
    played: Arc<Mutex<Vec<u64>>>,
}

impl Probe {
    fn send(&self, event: HardwareEvent) {
        let listener = self.listener.lock().unwrap();
        listener.as_ref().unwrap().send(event).unwrap();
    }

    fn finish(&self, run_id: u64) {
        self.send(HardwareEvent::SequenceFinished {
            system: "manual".into(),
            run_id,
        });
    }

    fn played(&self) -> Vec<u64> {
        self.played.lock().unwrap().clone()
    }
}

struct ManualOutputSystem {
    cards: Vec<Card>,
    probe: Probe,
}

#[async_trait]
impl OutputSystem for ManualOutputSystem {
    fn name(&self) -> &str {
        "manual"
    }

    fn cards(&self) -> &[Card] {
        &self.cards
    }

    async fn process_sequence(&mut self, _timeline: &Timeline, _run_id: u64) -> Result<(), HardwareError> {
        Ok(())
    }

    async fn cycle_init(&mut self) -> Result<(), HardwareError> {
        Ok(())
    }

    async fn play_once(&mut self, run_id: u64) -> Result<(), HardwareError> {
        self.probe.played.lock().unwrap().push(run_id);
        Ok(())
    }

    async fn play(&mut self) -> Result<(), HardwareError> {
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), HardwareError> {
        Ok(())
    }

    fn add_sequence_end_listener(&mut self, listener: mpsc::UnboundedSender<HardwareEvent>) {
        *self.probe.listener.lock().unwrap() = Some(listener);
    }
}

fn dio_card() -> Card {
    Card::new("dio0", CardKind::Digital, ["shutter", "trigger"])
}

/// `a` (2 values, outer) and `b` (3 values, inner) sweep; `pulse` drives dio0[0].
fn sequence() -> Sequence {
    let mut sequence = Sequence::new();
    sequence.variables.add_group("g").unwrap();
    sequence
        .variables
        .add_variable("g", VariableSpec::formula("t_on", "2"))
        .unwrap();
    sequence
        .variables
        .add_variable("g", VariableSpec::swept("b", 10.0, 12.0, 1.0, 1))
        .unwrap();
    sequence
        .variables
        .add_variable("g", VariableSpec::swept("a", 0.0, 1.0, 1.0, 0))
        .unwrap();

    sequence
        .routines
        .insert_routine(Routine {
            name: "pulse".into(),
            tracks: vec![Track::new(ChannelId::new("dio0", 0))
                .with_event(Event::digital("t_on + a", true))
                .with_event(Event::digital(1, false))],
        })
        .unwrap();
    sequence
        .playlists
        .insert_playlist(Playlist::new("main").with_node(PlaylistNode::routine("pulse", 1)))
        .unwrap();
    sequence.playlists.set_active("main").unwrap();
    sequence
}

struct Fixture {
    handle: SchedulerHandle,
    storage: MemoryStorage,
    notifier: RecordingNotifier,
}

async fn start(hardware: Hardware, sequence: Sequence, options: SchedulerOptions, storage: MemoryStorage) -> Fixture {
    let notifier = RecordingNotifier::default();
    let runtime = Runtime {
        hardware,
        storage: Box::new(storage.clone()),
        notifier: Box::new(notifier.clone()),
        options,
    };
    let scheduler = IterationScheduler::new(sequence, runtime).await;
    let (handle, _task) = spawn(scheduler);
    Fixture {
        handle,
        storage,
        notifier,
    }
}

fn dummy_hardware(delay_ms: u64) -> Hardware {
    let mut hardware = Hardware::new();
    hardware
        .add_system(Box::new(
            DummyOutputSystem::new("dummy", vec![dio_card()]).with_delay(Duration::from_millis(delay_ms)),
        ))
        .unwrap();
    hardware
}

fn manual_hardware() -> (Hardware, Probe) {
    let probe = Probe::default();
    let mut hardware = Hardware::new();
    hardware
        .add_system(Box::new(ManualOutputSystem {
            cards: vec![dio_card()],
            probe: probe.clone(),
        }))
        .unwrap();
    (hardware, probe)
}

async fn at_rest(handle: &SchedulerHandle) -> crate::scheduler::SchedulerStatus {
    tokio::time::timeout(TIMEOUT, handle.wait_until_at_rest())
        .await
        .expect("scheduler did not come to rest")
        .unwrap()
}

async fn wait_for_runs(handle: &SchedulerHandle, next_run_id: u64) {
    let mut status = handle.subscribe();
    tokio::time::timeout(TIMEOUT, status.wait_for(|s| s.next_run_id >= next_run_id))
        .await
        .expect("runs were not dispatched")
        .unwrap();
}

#[tokio::test]
async fn test_play_once_records_run_and_returns_to_idle() {
    let fx = start(dummy_hardware(10), sequence(), SchedulerOptions::default(), MemoryStorage::new()).await;

    fx.handle.play_once().await.unwrap();
    let status = at_rest(&fx.handle).await;

    assert_eq!(status.state, SchedulerState::Idle);
    assert_eq!(status.next_run_id, 2);
    let records = fx.storage.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].run_id, 1);
    assert_eq!(records[0].variables["t_on"], 2.0);
    assert_eq!(records[0].sweep["a"], 0);
    assert!(fx.notifier.messages().contains(&"run 1 started".to_string()));
}

#[tokio::test]
async fn test_run_ids_continue_from_storage() {
    let storage = MemoryStorage::new();
    storage
        .store_run_parameters(41, &Default::default(), &Default::default())
        .await;
    let fx = start(dummy_hardware(5), sequence(), SchedulerOptions::default(), storage).await;

    assert_eq!(fx.handle.status().await.unwrap().next_run_id, 42);
    fx.handle.play_once().await.unwrap();
    at_rest(&fx.handle).await;

    let records = fx.storage.records().await;
    assert_eq!(records.last().unwrap().run_id, 42);
}

#[tokio::test]
async fn test_sweep_runs_every_tuple_inner_axis_fastest() {
    let options = SchedulerOptions {
        max_iterations: Some(1),
        ..Default::default()
    };
    let fx = start(dummy_hardware(5), sequence(), options, MemoryStorage::new()).await;

    fx.handle.iterate().await.unwrap();
    let status = at_rest(&fx.handle).await;

    assert_eq!(status.state, SchedulerState::Idle);
    assert_eq!(status.iteration, 1);
    assert_eq!(status.sweep_length, 6);

    let order: Vec<(usize, usize)> = fx
        .storage
        .records()
        .await
        .iter()
        .map(|r| (r.sweep["a"], r.sweep["b"]))
        .collect();
    assert_eq!(order, vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]);

    let values: Vec<f64> = fx
        .storage
        .records()
        .await
        .iter()
        .map(|r| r.variables["b"])
        .collect();
    assert_eq!(values, vec![10.0, 11.0, 12.0, 10.0, 11.0, 12.0]);
    assert!(fx
        .notifier
        .messages()
        .contains(&"sweep pass 1 completed".to_string()));
}

#[tokio::test]
async fn test_shuffled_passes_cover_every_tuple() {
    let options = SchedulerOptions {
        shuffle: true,
        shuffle_seed: Some(3),
        max_iterations: Some(2),
        ..Default::default()
    };
    let fx = start(dummy_hardware(2), sequence(), options, MemoryStorage::new()).await;

    fx.handle.iterate().await.unwrap();
    let status = at_rest(&fx.handle).await;
    assert_eq!(status.iteration, 2);

    let records = fx.storage.records().await;
    assert_eq!(records.len(), 12);
    for pass in records.chunks(6) {
        let tuples: HashSet<(usize, usize)> =
            pass.iter().map(|r| (r.sweep["a"], r.sweep["b"])).collect();
        assert_eq!(tuples.len(), 6);
    }
}

#[tokio::test]
async fn test_continuous_repeats_until_stopped() {
    let fx = start(dummy_hardware(5), sequence(), SchedulerOptions::default(), MemoryStorage::new()).await;

    fx.handle.play_continuous().await.unwrap();
    wait_for_runs(&fx.handle, 4).await;
    fx.handle.stop().await.unwrap();
    let status = at_rest(&fx.handle).await;

    assert_eq!(status.state, SchedulerState::Stopped);
    assert!(fx.storage.records().await.len() >= 3);
}

#[tokio::test]
async fn test_new_run_refused_while_hardware_running() {
    let (hardware, probe) = manual_hardware();
    let fx = start(hardware, sequence(), SchedulerOptions::default(), MemoryStorage::new()).await;

    fx.handle.play_once().await.unwrap();
    assert_eq!(fx.handle.play_once().await, Err(SchedulerError::RunInProgress));
    assert_eq!(fx.handle.iterate().await, Err(SchedulerError::RunInProgress));

    let status = fx.handle.status().await.unwrap();
    assert_eq!(status.state, SchedulerState::SingleShot);
    assert!(status.running);
    assert_eq!(probe.played(), vec![1]);

    probe.finish(1);
    let status = at_rest(&fx.handle).await;
    assert_eq!(status.state, SchedulerState::Idle);
}

#[tokio::test]
async fn test_stop_ignores_late_completion() {
    let (hardware, probe) = manual_hardware();
    let fx = start(hardware, sequence(), SchedulerOptions::default(), MemoryStorage::new()).await;

    fx.handle.play_continuous().await.unwrap();
    fx.handle.stop().await.unwrap();
    probe.finish(1);
    tokio::time::sleep(Duration::from_millis(20)).await;

    let status = fx.handle.status().await.unwrap();
    assert_eq!(status.state, SchedulerState::Stopped);
    assert_eq!(status.next_run_id, 2);
    assert_eq!(probe.played(), vec![1]);
}

#[tokio::test]
async fn test_hardware_fault_stops_sweep() {
    let (hardware, probe) = manual_hardware();
    let fx = start(hardware, sequence(), SchedulerOptions::default(), MemoryStorage::new()).await;

    fx.handle.iterate().await.unwrap();
    probe.finish(1);
    probe.send(HardwareEvent::Fault {
        system: "manual".into(),
        message: "trigger lost".into(),
    });

    let status = at_rest(&fx.handle).await;
    assert_eq!(status.state, SchedulerState::Stopped);
    assert_eq!(probe.played(), vec![1, 2]);
    assert!(fx
        .notifier
        .messages()
        .iter()
        .any(|m| m.contains("trigger lost")));
}

#[tokio::test]
async fn test_unresolved_variables_refuse_runs() {
    let fx = start(dummy_hardware(5), sequence(), SchedulerOptions::default(), MemoryStorage::new()).await;

    fx.handle
        .edit(|sequence| {
            sequence
                .variables
                .add_variable("g", VariableSpec::formula("x", "y + 1"))?;
            sequence
                .variables
                .add_variable("g", VariableSpec::formula("y", "x + 1"))
        })
        .await
        .unwrap();

    match fx.handle.play_once().await {
        Err(SchedulerError::UnresolvedVariables { variables }) => {
            assert!(variables.contains(&"x".to_string()));
            assert!(variables.contains(&"y".to_string()));
        }
        other => panic!("expected refusal, got {:?}", other),
    }
    assert_eq!(fx.handle.status().await.unwrap().state, SchedulerState::Idle);
    assert!(fx.storage.records().await.is_empty());
}

#[tokio::test]
async fn test_iterate_without_swept_variables_is_refused() {
    let fx = start(dummy_hardware(5), sequence(), SchedulerOptions::default(), MemoryStorage::new()).await;

    fx.handle
        .edit(|sequence| {
            sequence.variables.set_swept("a", false)?;
            sequence.variables.set_swept("b", false)
        })
        .await
        .unwrap();

    assert_eq!(fx.handle.iterate().await, Err(SchedulerError::NoSweepVariables));
    assert!(fx
        .notifier
        .messages()
        .iter()
        .any(|m| m.starts_with("refused iterate")));
}

/// `pulse` followed by a routine whose only event has a negative duration.
fn broken_sequence() -> Sequence {
    let mut sequence = sequence();
    sequence
        .routines
        .insert_routine(Routine {
            name: "broken".into(),
            tracks: vec![Track::new(ChannelId::new("dio0", 1))
                .with_event(Event::digital("0 - t_on", true))],
        })
        .unwrap();
    sequence
        .playlists
        .insert_playlist(
            Playlist::new("mixed")
                .with_node(PlaylistNode::routine("pulse", 1))
                .with_node(PlaylistNode::routine("broken", 1)),
        )
        .unwrap();
    sequence.playlists.set_active("mixed").unwrap();
    sequence
}

#[tokio::test]
async fn test_compile_errors_refuse_run() {
    let fx = start(dummy_hardware(5), broken_sequence(), SchedulerOptions::default(), MemoryStorage::new()).await;

    assert!(matches!(
        fx.handle.play_once().await,
        Err(SchedulerError::Compile { .. })
    ));
    let status = fx.handle.status().await.unwrap();
    assert_eq!(status.state, SchedulerState::Idle);
    assert_eq!(status.next_run_id, 1);
    assert!(fx.storage.records().await.is_empty());
}

#[tokio::test]
async fn test_partial_timelines_allowed_by_option() {
    let options = SchedulerOptions {
        allow_partial_timelines: true,
        ..Default::default()
    };
    let fx = start(dummy_hardware(5), broken_sequence(), options, MemoryStorage::new()).await;

    fx.handle.play_once().await.unwrap();
    at_rest(&fx.handle).await;
    assert_eq!(fx.storage.records().await.len(), 1);
}

#[tokio::test]
async fn test_shutdown_returns_scheduler() {
    let notifier = RecordingNotifier::default();
    let runtime = Runtime {
        hardware: dummy_hardware(1_000),
        storage: Box::new(MemoryStorage::new()),
        notifier: Box::new(notifier),
        options: SchedulerOptions::default(),
    };
    let (handle, task) = spawn(IterationScheduler::new(sequence(), runtime).await);

    handle.shuffle_on().await.unwrap();
    handle.play_once().await.unwrap();
    handle.shutdown().await.unwrap();

    let scheduler = task.await.unwrap();
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
    assert!(scheduler.status().shuffle);
    assert!(!scheduler.hardware().is_running());
    assert_eq!(handle.play_once().await, Err(SchedulerError::ShutDown));
}
