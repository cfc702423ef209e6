//! Configuration loading and typed config structures.
//!
//! The canonical configuration lives in `gamemaster-config.yaml` at the
//! project root. Every field has a default matching the production
//! deployment, so an empty (or missing) file yields a working
//! configuration. Environment variables override the YAML for the values
//! that deployments set per container.

use std::path::Path;
use std::str::FromStr;

use chrono::NaiveTime;
use gamemaster_types::{NpcProfile, default_cast};
use serde::Deserialize;
use tracing::warn;

use crate::clock::{self, ClockError};

/// Environment variable selecting the operating mode.
pub const MODE_ENV: &str = "GAME_MASTER_MODE";
/// Environment variable holding the text-generation backend address.
pub const LLM_URL_ENV: &str = "LLAMA_CPP_URL";
/// Environment variable holding the tool-discovery address.
pub const DISCOVERY_URL_ENV: &str = "PIXELLE_MCP_URL";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is not usable.
    #[error("invalid schedule: {source}")]
    Schedule {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

// ---------------------------------------------------------------------------
// Operating mode
// ---------------------------------------------------------------------------

/// How the scheduler drives cycles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum OperatingMode {
    /// Run one cycle and return.
    #[default]
    Single,
    /// Run one cycle per day at the trigger time.
    Scheduled,
    /// Run cycles back to back with compressed waits.
    Simulation,
}

impl OperatingMode {
    /// Lowercase name as accepted in configuration.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Scheduled => "scheduled",
            Self::Simulation => "simulation",
        }
    }

    /// Parse a mode name, falling back to [`OperatingMode::Single`] with a
    /// warning when the name is not recognized.
    pub fn parse_lenient(value: &str) -> Self {
        value.parse().unwrap_or_else(|_err: UnknownMode| {
            warn!(mode = value, "unknown operating mode, using single");
            Self::Single
        })
    }
}

/// An operating mode name that is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown operating mode: {0}")]
pub struct UnknownMode(pub String);

impl FromStr for OperatingMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "scheduled" => Ok(Self::Scheduled),
            "simulation" => Ok(Self::Simulation),
            other => Err(UnknownMode(other.to_owned())),
        }
    }
}

impl From<String> for OperatingMode {
    fn from(value: String) -> Self {
        Self::parse_lenient(&value)
    }
}

impl core::fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level orchestrator configuration.
///
/// Mirrors the structure of `gamemaster-config.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GameMasterConfig {
    /// Operating mode (`single`, `scheduled`, `simulation`).
    #[serde(default)]
    pub mode: OperatingMode,

    /// Real-time schedule settings.
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Compressed-time simulation settings.
    #[serde(default)]
    pub simulation: SimulationTimingConfig,

    /// Text-generation backend settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Content-tool discovery settings.
    #[serde(default)]
    pub tools: ToolsConfig,

    /// NPCs reacting to each episode, in speaking order.
    #[serde(default = "default_cast")]
    pub cast: Vec<NpcProfile>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Bounds on the continuous modes.
    #[serde(default)]
    pub bounds: BoundsConfig,
}

impl Default for GameMasterConfig {
    fn default() -> Self {
        Self {
            mode: OperatingMode::default(),
            schedule: ScheduleConfig::default(),
            simulation: SimulationTimingConfig::default(),
            llm: LlmConfig::default(),
            tools: ToolsConfig::default(),
            cast: default_cast(),
            logging: LoggingConfig::default(),
            bounds: BoundsConfig::default(),
        }
    }
}

impl GameMasterConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment overrides are applied after parsing:
    /// - `GAME_MASTER_MODE` overrides `mode`
    /// - `LLAMA_CPP_URL` overrides `llm.api_url`
    /// - `PIXELLE_MCP_URL` overrides `tools.discovery_url`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Schedule`] if the trigger time is malformed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string and apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Schedule`] if the trigger time is malformed.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides();
        config.schedule.trigger()?;
        Ok(config)
    }

    /// Override deployment-specific values with environment variables.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup(MODE_ENV) {
            self.mode = OperatingMode::parse_lenient(&val);
        }
        if let Some(val) = lookup(LLM_URL_ENV) {
            self.llm.api_url = val;
        }
        if let Some(val) = lookup(DISCOVERY_URL_ENV) {
            self.tools.discovery_url = val;
        }
    }
}

/// Real-time schedule configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScheduleConfig {
    /// Daily trigger time in `HH:MM` (local offset).
    #[serde(default = "default_trigger_time")]
    pub trigger_time: String,

    /// Seconds to wait after a scheduling-loop failure.
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,
}

impl ScheduleConfig {
    /// The parsed trigger time.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidTriggerTime`] if `trigger_time` is malformed.
    pub fn trigger(&self) -> Result<NaiveTime, ClockError> {
        clock::parse_trigger_time(&self.trigger_time)
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            trigger_time: default_trigger_time(),
            retry_backoff_secs: default_retry_backoff_secs(),
        }
    }
}

/// Compressed-time waits used by simulation mode, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SimulationTimingConfig {
    /// Pause after the episode is generated.
    #[serde(default = "default_episode_pause_secs")]
    pub episode_pause_secs: u64,

    /// Stand-in for the player voting window.
    #[serde(default = "default_voting_secs")]
    pub voting_secs: u64,

    /// Stand-in for content generation.
    #[serde(default = "default_content_secs")]
    pub content_secs: u64,

    /// Pause after publication.
    #[serde(default)]
    pub publish_pause_secs: u64,

    /// Wait between simulated days.
    #[serde(default = "default_inter_cycle_secs")]
    pub inter_cycle_secs: u64,

    /// Wait after a failed simulated day.
    #[serde(default = "default_retry_secs")]
    pub retry_secs: u64,
}

impl Default for SimulationTimingConfig {
    fn default() -> Self {
        Self {
            episode_pause_secs: default_episode_pause_secs(),
            voting_secs: default_voting_secs(),
            content_secs: default_content_secs(),
            publish_pause_secs: 0,
            inter_cycle_secs: default_inter_cycle_secs(),
            retry_secs: default_retry_secs(),
        }
    }
}

/// Text-generation backend configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_llm_url")]
    pub api_url: String,

    /// Bearer token, empty when the backend needs none.
    #[serde(default)]
    pub api_key: String,

    /// Model identifier sent with each request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Maximum tokens per completion.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Repetition penalty (llama.cpp extension).
    #[serde(default = "default_repeat_penalty")]
    pub repeat_penalty: f64,

    /// Reuse the backend's prompt cache (llama.cpp extension).
    #[serde(default = "default_true")]
    pub cache_prompt: bool,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Directory holding the prompt templates.
    #[serde(default = "default_templates_dir")]
    pub templates_dir: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: default_llm_url(),
            api_key: String::new(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            repeat_penalty: default_repeat_penalty(),
            cache_prompt: true,
            request_timeout_ms: default_request_timeout_ms(),
            templates_dir: default_templates_dir(),
        }
    }
}

/// Content-tool discovery configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ToolsConfig {
    /// MCP endpoint advertising the content-generation tools.
    #[serde(default = "default_discovery_url")]
    pub discovery_url: String,

    /// Timeout for the whole discovery handshake in milliseconds.
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            discovery_url: default_discovery_url(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON log lines instead of human-readable text.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Bounds on the continuous modes.
///
/// A value of 0 means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct BoundsConfig {
    /// Stop a continuous mode after this many cycle attempts.
    #[serde(default)]
    pub max_cycles: u64,
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_trigger_time() -> String {
    "08:00".to_owned()
}

const fn default_retry_backoff_secs() -> u64 {
    3600
}

const fn default_episode_pause_secs() -> u64 {
    1
}

const fn default_voting_secs() -> u64 {
    30
}

const fn default_content_secs() -> u64 {
    10
}

const fn default_inter_cycle_secs() -> u64 {
    60
}

const fn default_retry_secs() -> u64 {
    10
}

fn default_llm_url() -> String {
    "http://llama.cpp:8090/v1".to_owned()
}

fn default_model() -> String {
    "default".to_owned()
}

const fn default_temperature() -> f64 {
    0.7
}

const fn default_max_tokens() -> u32 {
    2000
}

const fn default_repeat_penalty() -> f64 {
    1.1
}

const fn default_request_timeout_ms() -> u64 {
    120_000
}

fn default_templates_dir() -> String {
    "templates".to_owned()
}

fn default_discovery_url() -> String {
    "http://pixelle-mcp:9004/pixelle/mcp".to_owned()
}

const fn default_handshake_timeout_ms() -> u64 {
    10_000
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}
