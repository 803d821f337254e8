//! Cycle worker for the Hamlet settlement simulation.
//!
//! Runs the batch task on a fixed interval: every settlement in scope gets
//! one production and growth cycle per tick, through the current pipeline
//! with the legacy pipeline as fallback.
//!
//! # Startup Sequence
//!
//! 1. Parse command-line arguments
//! 2. Load configuration from `hamlet.yaml` (defaults when absent)
//! 3. Initialize structured logging (tracing)
//! 4. Connect to `PostgreSQL` and run migrations
//! 5. Wire the task runner over the database store and season resolver
//! 6. Run one batch, or loop until Ctrl-C

mod error;

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use hamlet_core::{HamletConfig, TaskRunner};
use hamlet_db::HamletDb;
use hamlet_types::{TaskOutcome, TaskPayload, WorldId};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::error::WorkerError;

/// Settlement production and growth worker.
#[derive(Parser, Debug)]
#[command(name = "hamlet-worker")]
#[command(about = "Run settlement production and growth cycles")]
struct Args {
    /// Path to the YAML configuration file.
    #[arg(long, env = "HAMLET_CONFIG", default_value = "hamlet.yaml")]
    config: PathBuf,

    /// Only process settlements of this world.
    #[arg(long)]
    world: Option<Uuid>,

    /// Run a single batch and exit.
    #[arg(long)]
    once: bool,
}

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, logging, or the database cannot be
/// set up. Failures inside a batch are logged and never end the process.
#[tokio::main]
async fn main() -> Result<(), WorkerError> {
    let args = Args::parse();

    let (config, from_file) = load_config(&args.config)?;
    init_logging(&config)?;

    info!("hamlet-worker starting");
    if !from_file {
        info!(path = %args.config.display(), "Config file not found, using defaults");
    }
    info!(
        max_concurrency = config.batch.max_concurrency,
        interval_secs = config.cycle.interval_secs,
        "Configuration loaded"
    );

    let db = HamletDb::connect(&config.infrastructure).await?;
    db.migrate().await?;

    let runner = TaskRunner::from_config(db.store(), db.modifier_resolver(), &config)?;
    let world = args.world.map(WorldId::from);

    if args.once {
        report(&runner.process_all_settlements_async(world).await);
    } else {
        let mut ticker = tokio::time::interval(Duration::from_secs(config.cycle.interval_secs));
        info!(world_id = ?world, "Entering cycle loop");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    report(&runner.process_all_settlements_async(world).await);
                }
                signal = tokio::signal::ctrl_c() => {
                    if let Err(e) = signal {
                        warn!(error = %e, "Failed to listen for shutdown signal");
                    }
                    info!("Shutdown requested");
                    break;
                }
            }
        }
    }

    db.close().await;
    info!("hamlet-worker shutdown complete");
    Ok(())
}

/// Load configuration, falling back to defaults when the file is absent.
///
/// Returns the configuration and whether it came from the file.
fn load_config(path: &Path) -> Result<(HamletConfig, bool), WorkerError> {
    if path.exists() {
        return Ok((HamletConfig::from_file(path)?, true));
    }
    let mut config = HamletConfig::default();
    config.infrastructure.apply_env_overrides();
    config.validate()?;
    Ok((config, false))
}

/// Install the tracing subscriber. `RUST_LOG` wins over the configured level.
fn init_logging(config: &HamletConfig) -> Result<(), WorkerError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let installed = if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
    };
    installed.map_err(|e| WorkerError::Logging {
        message: e.to_string(),
    })
}

fn report(outcome: &TaskOutcome) {
    match &outcome.result {
        Some(TaskPayload::Batch(batch)) => {
            info!(
                total = batch.total,
                processed = batch.processed,
                failed = batch.failures.len(),
                "Batch finished"
            );
            for failure in &batch.failures {
                warn!(
                    settlement_id = %failure.settlement_id,
                    error = %failure.message,
                    "Settlement cycle failed"
                );
            }
        }
        _ => error!(error = outcome.message().unwrap_or("unknown"), "Batch failed"),
    }
}
