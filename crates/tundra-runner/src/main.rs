//! Bot runtime entry point.
//!
//! The runner keeps a population of bots alive in the host world. It
//! receives world events from NATS, keeps an in-memory mirror of who stands
//! where, drives each bot's behavior loop, runs conversations through a
//! text generation backend, and publishes every bot action back to NATS.
//!
//! # Architecture
//!
//! ```text
//! NATS (world events) --> WorldMirror --> BotManager --> BotController / Orchestrator
//!                                                             |
//! NATS (room events)  <-- NatsPublisher <-- MirroredEvents <--+
//! ```

mod config;
mod error;
mod manager;
mod nats;
mod sink;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tundra_behavior::BehaviorContext;
use tundra_dialogue::personas::BUILTIN_MODELFILE;
use tundra_dialogue::{DialogueContext, Orchestrator, PersonaBook, create_backend};
use tundra_world::{RoomDirectory, RoomEvents, RoomLayouts, WorldMirror};

use crate::config::{BotsConfig, RunnerConfig};
use crate::error::RunnerError;
use crate::manager::BotManager;
use crate::nats::{NatsClient, NatsPublisher};
use crate::sink::MirroredEvents;

/// Application entry point.
///
/// Initializes logging, loads configuration, connects to NATS, brings out
/// the initial population, and serves world events until the subscription
/// ends or Ctrl-C is pressed.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    info!("tundra-runner starting");

    let config = RunnerConfig::from_env().context("loading environment")?;
    let mut bots = BotsConfig::load(&config.config_path)
        .with_context(|| format!("loading {}", config.config_path.display()))?;
    config.apply_overrides(&mut bots.dialogue);
    info!(
        nats_url = config.nats_url,
        backend = ?config.backend.backend_type,
        api_url = config.backend.api_url,
        model = bots.dialogue.model,
        per_persona_models = bots.dialogue.per_persona_models,
        generation_timeout_ms = bots.dialogue.generation_timeout_ms,
        roster = bots.population.roster.len(),
        "configuration loaded"
    );

    let nats = NatsClient::connect(&config.nats_url).await?;
    let (publisher, publisher_task) = NatsPublisher::spawn(nats.clone());

    let mirror = Arc::new(WorldMirror::new());
    let sink = Arc::new(MirroredEvents::new(
        Arc::clone(&mirror),
        Arc::new(publisher) as Arc<dyn RoomEvents>,
    ));

    let behavior = Arc::new(BehaviorContext::new(
        bots.behavior,
        RoomLayouts::standard(),
        Arc::clone(&sink) as Arc<dyn RoomEvents>,
        Arc::clone(&mirror) as Arc<dyn RoomDirectory>,
    ));
    let dialogue = DialogueContext::new(
        bots.dialogue,
        create_backend(&config.backend),
        Arc::clone(&sink) as Arc<dyn RoomEvents>,
    )?;

    if let Some(dir) = &config.modelfiles_dir {
        write_modelfiles(&dialogue.personas, dir, config.modelfile_base.as_deref())?;
    }

    let initial = bots.population.initial;
    let rotation_enabled = bots.population.rotation_enabled;
    let manager = Arc::new(BotManager::new(
        behavior,
        Orchestrator::new(Arc::new(dialogue)),
        sink,
        mirror,
        bots.population,
    ));
    manager.populate(initial);

    let cancel = CancellationToken::new();
    let rotation =
        rotation_enabled.then(|| tokio::spawn(Arc::clone(&manager).run_rotation(cancel.clone())));

    let events = nats.world_events().await?;
    info!("runner initialized, serving world events");
    tokio::select! {
        () = manager.serve(events) => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!(error = %e, "failed to listen for Ctrl-C");
            }
            info!("shutdown requested");
        }
    }

    cancel.cancel();
    if let Some(rotation) = rotation {
        finish_task("rotation", rotation).await;
    }
    manager.shutdown();
    drop(manager);
    publisher_task.abort();

    info!("tundra-runner stopped");
    Ok(())
}

/// Wait for a background task, logging a panic or abort.
///
/// Returns whether the task ran to completion.
async fn finish_task(name: &str, task: JoinHandle<()>) -> bool {
    match task.await {
        Ok(()) => true,
        Err(e) => {
            warn!(task = name, error = %e, "background task failed");
            false
        }
    }
}

/// Structured logging; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

/// Write one Ollama Modelfile per persona into `dir`.
fn write_modelfiles(personas: &PersonaBook, dir: &Path, base: Option<&Path>) -> Result<(), RunnerError> {
    let base = match base {
        Some(path) => std::fs::read_to_string(path).map_err(|source| RunnerError::Io {
            path: path.display().to_string(),
            source,
        })?,
        None => BUILTIN_MODELFILE.to_owned(),
    };
    let written = personas.write_modelfiles(dir, &base)?;
    info!(
        dir = %dir.display(),
        written = written.len(),
        personas = personas.len(),
        "persona Modelfiles ready"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn finished_task_is_clean() {
        let task = tokio::spawn(async {});
        assert!(finish_task("quick", task).await);
    }

    #[tokio::test(start_paused = true)]
    async fn aborted_task_is_reported() {
        let task = tokio::spawn(tokio::time::sleep(Duration::from_secs(3600)));
        task.abort();
        assert!(!finish_task("sleeper", task).await);
    }
}
