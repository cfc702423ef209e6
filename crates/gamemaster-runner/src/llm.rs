//! OpenAI-compatible chat-completions client.
//!
//! The deployment runs llama.cpp's server, which speaks the `OpenAI`
//! `/chat/completions` dialect plus a few sampling extensions
//! (`repeat_penalty`, `cache_prompt`). The runner does not care which
//! model is loaded; it sends a prompt and expects text back.

use std::time::Duration;

use gamemaster_core::config::LlmConfig;
use tracing::debug;

use crate::error::RunnerError;
use crate::prompt::RenderedPrompt;

/// Client for an OpenAI-compatible chat completions API.
///
/// Sends requests to `{api_url}/chat/completions`.
pub struct LlmBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
    repeat_penalty: f64,
    cache_prompt: bool,
}

impl LlmBackend {
    /// Create a new backend from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::LlmBackend`] if the HTTP client cannot be
    /// built.
    pub fn new(config: &LlmConfig) -> Result<Self, RunnerError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| RunnerError::LlmBackend(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            repeat_penalty: config.repeat_penalty,
            cache_prompt: config.cache_prompt,
        })
    }

    /// Base URL of the API.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Check that the backend answers `GET {api_url}/models`.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Unreachable`] if the server cannot be reached,
    /// or [`RunnerError::LlmBackend`] if it answers with an error status.
    pub async fn probe(&self) -> Result<(), RunnerError> {
        let url = format!("{}/models", self.api_url);
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|e| RunnerError::from_transport("model listing failed", &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RunnerError::LlmBackend(format!("model listing returned {status}")));
        }
        debug!(api_url = %self.api_url, "LLM backend reachable");
        Ok(())
    }

    /// Send a prompt and return the response text.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Unreachable`] on connection failure or
    /// timeout, [`RunnerError::LlmBackend`] on an error status or a
    /// malformed envelope, and [`RunnerError::Parse`] if the completion is
    /// empty.
    pub async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, RunnerError> {
        let url = format!("{}/chat/completions", self.api_url);

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user}
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "repeat_penalty": self.repeat_penalty,
            "cache_prompt": self.cache_prompt,
        });

        let response = self
            .authorized(self.client.post(&url))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| RunnerError::from_transport("completion request failed", &e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(RunnerError::LlmBackend(format!(
                "completion returned {status}: {error_body}"
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RunnerError::LlmBackend(format!("completion response parse failed: {e}")))?;

        extract_openai_content(&json)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.is_empty() {
            request
        } else {
            request.bearer_auth(&self.api_key)
        }
    }
}

impl core::fmt::Debug for LlmBackend {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LlmBackend")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// Extract the text content from an `OpenAI` chat completions response.
fn extract_openai_content(json: &serde_json::Value) -> Result<String, RunnerError> {
    let content = json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| {
            RunnerError::LlmBackend("response missing choices[0].message.content".to_owned())
        })?;

    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(RunnerError::Parse("completion was empty".to_owned()));
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_content_valid() {
        let json = serde_json::json!({
            "choices": [{
                "message": {
                    "content": "  Day 4: The hull groans.\n"
                }
            }]
        });
        let result = extract_openai_content(&json);
        assert_eq!(result.ok().as_deref(), Some("Day 4: The hull groans."));
    }

    #[test]
    fn extract_content_missing_choices() {
        let json = serde_json::json!({"error": "model not loaded"});
        assert!(matches!(
            extract_openai_content(&json),
            Err(RunnerError::LlmBackend(_))
        ));
    }

    #[test]
    fn extract_content_empty() {
        let json = serde_json::json!({"choices": [{"message": {"content": "   "}}]});
        assert!(matches!(
            extract_openai_content(&json),
            Err(RunnerError::Parse(_))
        ));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let config = LlmConfig {
            api_url: "http://localhost:8090/v1/".to_owned(),
            ..LlmConfig::default()
        };
        let backend = LlmBackend::new(&config);
        assert_eq!(
            backend.ok().map(|b| b.api_url().to_owned()).as_deref(),
            Some("http://localhost:8090/v1")
        );
    }
}
