// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{bail, Context, Result};
use std::env;
use the_sequencer::config::{load_and_validate_config, load_sequence, RuntimeBuilder};
use the_sequencer::scheduler::{spawn, IterationScheduler};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// What to do once the scheduler is up.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Once,
    Continuous,
    Iterate,
}

impl Mode {
    fn parse(arg: Option<&str>) -> Result<Self> {
        match arg {
            None | Some("once") => Ok(Mode::Once),
            Some("continuous") => Ok(Mode::Continuous),
            Some("iterate") => Ok(Mode::Iterate),
            Some(other) => bail!("unknown mode '{}' (expected once, continuous or iterate)", other),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        eprintln!("Usage: {} <config.yaml> [once|continuous|iterate]", args[0]);
        eprintln!("Example: {} configs/demo.yaml iterate", args[0]);
        std::process::exit(1);
    }
    let mode = Mode::parse(args.get(2).map(String::as_str))?;

    let config = load_and_validate_config(&args[1])
        .with_context(|| format!("Failed to load configuration {}", args[1]))?;
    let runtime = RuntimeBuilder::from_config(&config).context("Failed to build runtime")?;
    let sequence = load_sequence(&config, &runtime.hardware)
        .with_context(|| format!("Failed to load sequence {}", config.sequence.display()))?;
    info!(
        "Loaded sequence {} ({} variables, {} routines)",
        config.sequence.display(),
        sequence.variables.variables().count(),
        sequence.routines.len()
    );

    let (handle, task) = spawn(IterationScheduler::new(sequence, runtime).await);
    match mode {
        Mode::Once => handle.play_once().await,
        Mode::Continuous => handle.play_continuous().await,
        Mode::Iterate => handle.iterate().await,
    }
    .context("Scheduler refused to start")?;

    tokio::select! {
        result = handle.wait_until_at_rest() => {
            let status = result?;
            info!("Scheduler at rest after run {}", status.next_run_id.saturating_sub(1));
        }
        _ = shutdown_signal() => {
            info!("Received Ctrl+C, stopping");
            handle.stop().await?;
        }
    }

    handle.shutdown().await?;
    task.await.context("Scheduler task failed")?;
    Ok(())
}

async fn shutdown_signal() {
    if signal::ctrl_c().await.is_err() {
        // Without a handler, only the scheduler can end the process.
        std::future::pending::<()>().await;
    }
}
