//! Gamemaster binary.
//!
//! Wires configuration, logging and the live collaborators into an
//! orchestrator and runs it in the configured mode.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `gamemaster-config.yaml` (or the path in
//!    `GAME_MASTER_CONFIG`), applying environment overrides
//! 2. Initialize structured logging (tracing)
//! 3. Connect the LLM backend and discover content tools, degrading what
//!    cannot be reached
//! 4. Install the Ctrl-C handler on the shared stop control
//! 5. Run the selected mode and log the result

mod error;

use std::path::{Path, PathBuf};

use gamemaster_core::config::{GameMasterConfig, LoggingConfig};
use gamemaster_core::orchestrator::RunOutcome;
use gamemaster_runner::bootstrap;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Environment variable naming the configuration file.
const CONFIG_PATH_ENV: &str = "GAME_MASTER_CONFIG";

/// Configuration file used when `GAME_MASTER_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "gamemaster-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is unusable, logging cannot be
/// installed, or a single-shot cycle fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let path = config_path();
    let (config, from_file) = load_config(&path)?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging)?;
    info!("gamemaster-engine starting");
    if from_file {
        info!(path = %path.display(), "Configuration loaded");
    } else {
        info!(path = %path.display(), "Config file not found, using defaults");
    }
    info!(
        mode = %config.mode,
        llm_url = %config.llm.api_url,
        discovery_url = %config.tools.discovery_url,
        trigger_time = %config.schedule.trigger_time,
        npcs = config.cast.len(),
        max_cycles = config.bounds.max_cycles,
        "Configuration resolved"
    );

    // 3. Connect collaborators.
    let mut orchestrator = bootstrap::initialize(&config.tools.discovery_url, &config).await?;
    info!(
        degraded = ?orchestrator.degraded(),
        tools = orchestrator.catalog().len(),
        "Orchestrator initialized"
    );

    // 4. Stop on Ctrl-C.
    let control = orchestrator.control();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current cycle");
            control.request_stop();
        }
    });

    // 5. Run.
    match orchestrator.run(config.mode).await {
        RunOutcome::Single(result) => {
            if let Ok(json) = serde_json::to_string_pretty(&result) {
                info!(result = %json, "Single cycle result");
            }
            if let Some(failure) = result.failure() {
                return Err(EngineError::Cycle {
                    day: result.day,
                    phase: failure.phase,
                    message: failure.error.clone(),
                }
                .into());
            }
            info!(day = orchestrator.world_state().day, "gamemaster-engine finished");
        }
        RunOutcome::Continuous(exit) => {
            info!(
                reason = ?exit.reason,
                cycles = exit.cycles,
                day = orchestrator.world_state().day,
                "gamemaster-engine stopped"
            );
        }
    }
    Ok(())
}

/// Resolve the configuration file path.
fn config_path() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV).map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Load configuration from `path`, or defaults when the file is absent.
///
/// Environment overrides apply in both cases. Returns whether the file
/// was read.
fn load_config(path: &Path) -> Result<(GameMasterConfig, bool), EngineError> {
    if path.exists() {
        Ok((GameMasterConfig::from_file(path)?, true))
    } else {
        let mut config = GameMasterConfig::default();
        config.apply_env_overrides();
        Ok((config, false))
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig) -> Result<(), EngineError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = if logging.json {
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

    installed.map_err(|e| EngineError::Logging {
        message: e.to_string(),
    })
}
