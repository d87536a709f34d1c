// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The scheduler task and the handle callers use to talk to it.
//!
//! The task owns the [`IterationScheduler`]. Commands from any number of handles and
//! completion events from the hardware are consumed by one `select!` loop, so sequence
//! edits, commands and completions never interleave.

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::iteration::IterationScheduler;
use super::state::SchedulerStatus;
use crate::config::consts::SCHEDULER_COMMAND_CAPACITY;
use crate::errors::{ConfigurationError, SchedulerError};
use crate::hardware::HardwareEvent;
use crate::observability::messages::scheduler::SchedulerStarted;
use crate::observability::messages::StructuredLog;
use crate::sequence::Sequence;

/// An edit applied to the sequence on the scheduler task.
pub type SequenceEdit = Box<dyn FnOnce(&mut Sequence) -> Result<(), ConfigurationError> + Send>;

type Reply<T> = oneshot::Sender<T>;

/// Commands accepted by the scheduler task.
pub enum SchedulerCommand {
    PlayOnce {
        response: Reply<Result<(), SchedulerError>>,
    },
    PlayContinuous {
        response: Reply<Result<(), SchedulerError>>,
    },
    Iterate {
        response: Reply<Result<(), SchedulerError>>,
    },
    Stop {
        response: Reply<Result<(), SchedulerError>>,
    },
    SetShuffle {
        enabled: bool,
        response: Reply<()>,
    },
    Edit {
        edit: SequenceEdit,
        response: Reply<Result<(), ConfigurationError>>,
    },
    Status {
        response: Reply<SchedulerStatus>,
    },
    /// Stop the hardware and end the task.
    Shutdown {
        response: Reply<()>,
    },
}

/// Start the scheduler task.
///
/// The join handle yields the scheduler back after shutdown, or once every handle is dropped.
pub fn spawn(mut scheduler: IterationScheduler) -> (SchedulerHandle, JoinHandle<IterationScheduler>) {
    let (commands, receiver) = mpsc::channel(SCHEDULER_COMMAND_CAPACITY);
    let (status, status_receiver) = watch::channel(scheduler.status());
    let events = scheduler.take_hardware_events();

    let task = tokio::spawn(run(scheduler, receiver, events, status));
    (
        SchedulerHandle {
            commands,
            status: status_receiver,
        },
        task,
    )
}

async fn run(
    mut scheduler: IterationScheduler,
    mut commands: mpsc::Receiver<SchedulerCommand>,
    mut events: Option<mpsc::UnboundedReceiver<HardwareEvent>>,
    status: watch::Sender<SchedulerStatus>,
) -> IterationScheduler {
    let systems: Vec<String> = scheduler.hardware().systems().map(str::to_string).collect();
    let names: Vec<&str> = systems.iter().map(String::as_str).collect();
    SchedulerStarted {
        next_run_id: scheduler.status().next_run_id,
        systems: &names,
    }
    .log();

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(command) => {
                    let last = matches!(command, SchedulerCommand::Shutdown { .. });
                    handle(&mut scheduler, command, &status).await;
                    if last {
                        break;
                    }
                }
                None => {
                    scheduler.shutdown().await;
                    break;
                }
            },
            Some(event) = next_event(&mut events) => {
                scheduler.on_hardware_event(event).await;
                status.send_replace(scheduler.status());
            }
        }
    }

    scheduler
}

async fn handle(
    scheduler: &mut IterationScheduler,
    command: SchedulerCommand,
    status: &watch::Sender<SchedulerStatus>,
) {
    match command {
        SchedulerCommand::PlayOnce { response } => {
            let result = scheduler.play_once().await;
            reply(scheduler, status, response, result);
        }
        SchedulerCommand::PlayContinuous { response } => {
            let result = scheduler.play_continuous().await;
            reply(scheduler, status, response, result);
        }
        SchedulerCommand::Iterate { response } => {
            let result = scheduler.iterate().await;
            reply(scheduler, status, response, result);
        }
        SchedulerCommand::Stop { response } => {
            let result = scheduler.stop().await;
            reply(scheduler, status, response, result);
        }
        SchedulerCommand::SetShuffle { enabled, response } => {
            scheduler.set_shuffle(enabled);
            reply(scheduler, status, response, ());
        }
        SchedulerCommand::Edit { edit, response } => {
            let result = edit(scheduler.sequence_mut());
            reply(scheduler, status, response, result);
        }
        SchedulerCommand::Status { response } => {
            let _ = response.send(scheduler.status());
        }
        SchedulerCommand::Shutdown { response } => {
            scheduler.shutdown().await;
            reply(scheduler, status, response, ());
        }
    }
}

/// Publish the new status before answering, so a caller never observes the old one.
fn reply<T>(
    scheduler: &IterationScheduler,
    status: &watch::Sender<SchedulerStatus>,
    response: Reply<T>,
    value: T,
) {
    status.send_replace(scheduler.status());
    // The caller may have stopped waiting.
    let _ = response.send(value);
}

async fn next_event(
    events: &mut Option<mpsc::UnboundedReceiver<HardwareEvent>>,
) -> Option<HardwareEvent> {
    match events {
        Some(events) => events.recv().await,
        None => std::future::pending().await,
    }
}

/// Cloneable access to a running scheduler task.
#[derive(Clone)]
pub struct SchedulerHandle {
    commands: mpsc::Sender<SchedulerCommand>,
    status: watch::Receiver<SchedulerStatus>,
}

impl SchedulerHandle {
    pub async fn play_once(&self) -> Result<(), SchedulerError> {
        self.request(|response| SchedulerCommand::PlayOnce { response })
            .await?
    }

    pub async fn play_continuous(&self) -> Result<(), SchedulerError> {
        self.request(|response| SchedulerCommand::PlayContinuous { response })
            .await?
    }

    pub async fn iterate(&self) -> Result<(), SchedulerError> {
        self.request(|response| SchedulerCommand::Iterate { response })
            .await?
    }

    pub async fn stop(&self) -> Result<(), SchedulerError> {
        self.request(|response| SchedulerCommand::Stop { response })
            .await?
    }

    pub async fn shuffle_on(&self) -> Result<(), SchedulerError> {
        self.request(|response| SchedulerCommand::SetShuffle {
            enabled: true,
            response,
        })
        .await
    }

    pub async fn shuffle_off(&self) -> Result<(), SchedulerError> {
        self.request(|response| SchedulerCommand::SetShuffle {
            enabled: false,
            response,
        })
        .await
    }

    /// Apply `edit` to the sequence between runs.
    pub async fn edit<F>(&self, edit: F) -> Result<(), SchedulerError>
    where
        F: FnOnce(&mut Sequence) -> Result<(), ConfigurationError> + Send + 'static,
    {
        self.request(|response| SchedulerCommand::Edit {
            edit: Box::new(edit),
            response,
        })
        .await??;
        Ok(())
    }

    pub async fn status(&self) -> Result<SchedulerStatus, SchedulerError> {
        self.request(|response| SchedulerCommand::Status { response })
            .await
    }

    pub async fn shutdown(&self) -> Result<(), SchedulerError> {
        self.request(|response| SchedulerCommand::Shutdown { response })
            .await
    }

    /// Status updates, published after every command and hardware event.
    pub fn subscribe(&self) -> watch::Receiver<SchedulerStatus> {
        self.status.clone()
    }

    /// Wait until the scheduler is idle or stopped and no output system is running.
    pub async fn wait_until_at_rest(&self) -> Result<SchedulerStatus, SchedulerError> {
        let mut status = self.status.clone();
        let settled = status
            .wait_for(|s| s.state.is_at_rest() && !s.running)
            .await
            .map_err(|_| SchedulerError::ShutDown)?;
        Ok(settled.clone())
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> SchedulerCommand,
    ) -> Result<T, SchedulerError> {
        let (response, reply) = oneshot::channel();
        self.commands
            .send(command(response))
            .await
            .map_err(|_| SchedulerError::ShutDown)?;
        reply.await.map_err(|_| SchedulerError::ShutDown)
    }
}
