//! Error types for the live adapters.
//!
//! Uses `thiserror` for typed errors that surface through the whole live
//! pipeline: LLM calls, prompt rendering, response parsing, and tool
//! discovery. Every variant converts into a [`CollaboratorError`] so the
//! phase sequencer can decide whether a fallback applies.

use gamemaster_core::collaborator::CollaboratorError;

/// Errors that can occur in the live adapters.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The backend could not be reached (connection refused, timeout).
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    /// An LLM backend answered with an error or an unusable envelope.
    #[error("LLM backend error: {0}")]
    LlmBackend(String),

    /// Failed to load or render a prompt template.
    #[error("template error: {0}")]
    Template(String),

    /// The LLM response could not be parsed into the expected shape.
    #[error("response parse error: {0}")]
    Parse(String),

    /// The tool-discovery handshake failed.
    #[error("tool discovery error: {0}")]
    Discovery(String),

    /// Serialization or deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl RunnerError {
    /// Classify a `reqwest` transport error.
    pub(crate) fn from_transport(context: &str, err: &reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Self::Unreachable(format!("{context}: {err}"))
        } else {
            Self::LlmBackend(format!("{context}: {err}"))
        }
    }
}

impl From<RunnerError> for CollaboratorError {
    fn from(err: RunnerError) -> Self {
        match err {
            RunnerError::Unreachable(msg) | RunnerError::Discovery(msg) => Self::Unavailable(msg),
            RunnerError::LlmBackend(msg) | RunnerError::Template(msg) => Self::Backend(msg),
            RunnerError::Parse(msg) => Self::InvalidResponse(msg),
            RunnerError::Serde(source) => Self::InvalidResponse(source.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_runner_error_is_recoverable() {
        let errors = [
            RunnerError::Unreachable("connection refused".to_owned()),
            RunnerError::LlmBackend("500".to_owned()),
            RunnerError::Template("missing episode".to_owned()),
            RunnerError::Parse("not json".to_owned()),
            RunnerError::Discovery("no session".to_owned()),
        ];
        for err in errors {
            assert!(CollaboratorError::from(err).is_recoverable());
        }
    }

    #[test]
    fn parse_errors_become_invalid_responses() {
        let err = CollaboratorError::from(RunnerError::Parse("truncated".to_owned()));
        assert_eq!(err, CollaboratorError::InvalidResponse("truncated".to_owned()));
    }
}
