//! Startup wiring: connect to the remote backends and build the orchestrator.
//!
//! Connection failures never abort startup. A backend that cannot be
//! reached leaves its slots on the fallback implementations, and the slot
//! names are recorded on the orchestrator as degraded.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use gamemaster_core::collaborator::Collaborators;
use gamemaster_core::config::{ConfigError, GameMasterConfig, LlmConfig, ToolsConfig};
use gamemaster_core::orchestrator::Orchestrator;
use gamemaster_types::ToolCatalog;
use tracing::{info, warn};

use crate::adapters::{LlmComposer, LlmDialogue, LlmNarrator, LlmPublisher, LlmService};
use crate::discovery::ToolDiscovery;
use crate::error::RunnerError;
use crate::llm::LlmBackend;
use crate::prompt::PromptEngine;

/// Slots served by the text-generation backend.
pub const LLM_SLOTS: [&str; 4] = ["narrator", "dialogue", "composer", "publisher"];

/// Name recorded when tool discovery fails.
pub const TOOLS_SLOT: &str = "tools";

/// Build the backend, load the templates and probe the server.
///
/// # Errors
///
/// Returns the first [`RunnerError`] hit while connecting.
pub async fn connect_llm(config: &LlmConfig) -> Result<Arc<LlmService>, RunnerError> {
    let backend = LlmBackend::new(config)?;
    let prompts = PromptEngine::new(Path::new(&config.templates_dir))?;
    backend.probe().await?;
    info!(api_url = %backend.api_url(), model = %config.model, "LLM backend connected");
    Ok(Arc::new(LlmService::new(backend, prompts)))
}

/// Run the tool-discovery handshake against `url`.
///
/// # Errors
///
/// Returns [`RunnerError::Discovery`] if the handshake fails.
pub async fn discover_tools(url: &str, config: &ToolsConfig) -> Result<ToolCatalog, RunnerError> {
    let discovery = ToolDiscovery::new(url, Duration::from_millis(config.handshake_timeout_ms))?;
    let catalog = discovery.discover().await?;
    info!(url, tools = catalog.len(), "Content tools discovered");
    Ok(catalog)
}

/// Fallback collaborators with the four LLM slots replaced by live adapters.
///
/// Votes stay simulated: no live vote collector exists yet.
pub fn live_collaborators(service: &Arc<LlmService>) -> Collaborators {
    Collaborators::degraded()
        .with_narrator(LlmNarrator::new(Arc::clone(service)))
        .with_dialogue(LlmDialogue::new(Arc::clone(service)))
        .with_composer(LlmComposer::new(Arc::clone(service)))
        .with_publisher(LlmPublisher::new(Arc::clone(service)))
}

/// What one connection attempt produced.
struct Connections {
    llm: Option<Arc<LlmService>>,
    catalog: Option<ToolCatalog>,
}

impl Connections {
    async fn attempt(discovery_url: &str, config: &GameMasterConfig) -> Self {
        let llm = match connect_llm(&config.llm).await {
            Ok(service) => Some(service),
            Err(err) => {
                warn!(
                    api_url = %config.llm.api_url,
                    error = %err,
                    slots = ?LLM_SLOTS,
                    "LLM backend unavailable, using fallback content"
                );
                None
            }
        };

        let catalog = match discover_tools(discovery_url, &config.tools).await {
            Ok(catalog) => Some(catalog),
            Err(err) => {
                warn!(url = discovery_url, error = %err, "Tool discovery failed, continuing without content tools");
                None
            }
        };

        Self { llm, catalog }
    }

    fn failed(&self) -> Vec<String> {
        let mut failed = Vec::new();
        if self.llm.is_none() {
            failed.extend(LLM_SLOTS.iter().map(|slot| (*slot).to_owned()));
        }
        if self.catalog.is_none() {
            failed.push(TOOLS_SLOT.to_owned());
        }
        failed
    }
}

/// Connect every remote collaborator and build a ready orchestrator.
///
/// Unreachable backends are logged as warnings and their slots degraded;
/// the orchestrator is built either way.
///
/// # Errors
///
/// Returns [`ConfigError`] only for unusable configuration, such as a
/// malformed trigger time.
pub async fn initialize(
    discovery_url: &str,
    config: &GameMasterConfig,
) -> Result<Orchestrator, ConfigError> {
    let connections = Connections::attempt(discovery_url, config).await;
    let degraded = connections.failed();

    let collaborators = connections
        .llm
        .as_ref()
        .map_or_else(Collaborators::degraded, live_collaborators);
    let catalog = connections.catalog.unwrap_or_else(ToolCatalog::empty);

    let mut orchestrator = Orchestrator::from_config(config, collaborators, catalog)?;
    if degraded.is_empty() {
        info!("All collaborators live");
    } else {
        warn!(degraded = ?degraded, "Starting with degraded collaborators");
    }
    orchestrator.set_degraded(degraded);
    Ok(orchestrator)
}

/// Retry the connections and install live collaborators where they now
/// succeed.
///
/// Slots that are already live stay as they are even if the retry fails.
/// Returns the capabilities still degraded afterwards.
pub async fn reinitialize(
    orchestrator: &mut Orchestrator,
    discovery_url: &str,
    config: &GameMasterConfig,
) -> Vec<String> {
    let connections = Connections::attempt(discovery_url, config).await;
    let failed = connections.failed();

    if let Some(service) = connections.llm.as_ref() {
        orchestrator.install(live_collaborators(service));
    }
    if let Some(catalog) = connections.catalog {
        orchestrator.set_catalog(catalog);
    }

    let still_degraded: Vec<String> = orchestrator
        .degraded()
        .iter()
        .filter(|slot| failed.contains(slot))
        .cloned()
        .collect();
    info!(degraded = ?still_degraded, "Collaborators reinitialized");
    orchestrator.set_degraded(still_degraded.clone());
    still_degraded
}
