//! Error types for the Gamemaster binary.

/// Top-level error for the Gamemaster binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: gamemaster_core::config::ConfigError,
    },

    /// The log subscriber could not be installed.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the subscriber failure.
        message: String,
    },

    /// The single-shot cycle failed.
    #[error("cycle for day {day} failed in {phase}: {message}")]
    Cycle {
        /// Day the cycle ran for.
        day: u64,
        /// Phase that aborted.
        phase: gamemaster_types::Phase,
        /// Cause reported by the sequencer.
        message: String,
    },
}
