//! Live collaborators backed by the llama.cpp text-generation server.
//!
//! All four LLM-driven slots share one [`LlmService`]: a backend plus the
//! prompt templates. Each adapter renders its prompt, sends it, and shapes
//! the reply. Errors convert into [`CollaboratorError`] so the sequencer
//! can fall back for the failed call.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use gamemaster_core::collaborator::{
    CollaboratorError, ContentComposer, DialogueGenerator, NarrativeGenerator, Publisher,
    log_publication,
};
use gamemaster_types::{ComposedContent, CycleSnapshot, NpcDialogue, NpcProfile};
use tracing::debug;

use crate::error::RunnerError;
use crate::llm::LlmBackend;
use crate::parse::parse_composition;
use crate::prompt::{PromptEngine, RenderedPrompt};

/// A connected backend and the templates used to talk to it.
#[derive(Debug)]
pub struct LlmService {
    backend: LlmBackend,
    prompts: PromptEngine,
}

impl LlmService {
    /// Pair a backend with its prompt templates.
    pub const fn new(backend: LlmBackend, prompts: PromptEngine) -> Self {
        Self { backend, prompts }
    }

    /// The prompt templates.
    pub const fn prompts(&self) -> &PromptEngine {
        &self.prompts
    }

    /// The backend.
    pub const fn backend(&self) -> &LlmBackend {
        &self.backend
    }

    /// Send a rendered prompt and return the completion text.
    ///
    /// # Errors
    ///
    /// Propagates any [`RunnerError`] from the backend.
    pub async fn ask(&self, purpose: &str, prompt: &RenderedPrompt) -> Result<String, RunnerError> {
        debug!(purpose, system = %prompt.system, user = %prompt.user, "LLM prompt");
        let started = Instant::now();
        let reply = self.backend.complete(prompt).await?;
        debug!(
            purpose,
            latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            response = %reply,
            "LLM response"
        );
        Ok(reply)
    }
}

/// Narrator writing each episode with the LLM.
#[derive(Debug, Clone)]
pub struct LlmNarrator {
    service: Arc<LlmService>,
}

impl LlmNarrator {
    /// Create a narrator over a shared service.
    pub const fn new(service: Arc<LlmService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl NarrativeGenerator for LlmNarrator {
    fn name(&self) -> &str {
        "llama-narrator"
    }

    async fn generate_episode(
        &self,
        day: u64,
        prior_summary: &str,
    ) -> Result<String, CollaboratorError> {
        let prompt = self.service.prompts().episode(day, prior_summary)?;
        Ok(self.service.ask("episode", &prompt).await?)
    }
}

/// Voices each NPC with the LLM, in character.
#[derive(Debug, Clone)]
pub struct LlmDialogue {
    service: Arc<LlmService>,
}

impl LlmDialogue {
    /// Create a dialogue generator over a shared service.
    pub const fn new(service: Arc<LlmService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl DialogueGenerator for LlmDialogue {
    fn name(&self) -> &str {
        "llama-dialogue"
    }

    async fn generate_dialogue(
        &self,
        npc: &NpcProfile,
        story: &str,
    ) -> Result<String, CollaboratorError> {
        let prompt = self.service.prompts().dialogue(npc, story)?;
        Ok(self.service.ask("dialogue", &prompt).await?)
    }
}

/// Asks the LLM for the outcome and content prompts as JSON.
#[derive(Debug, Clone)]
pub struct LlmComposer {
    service: Arc<LlmService>,
}

impl LlmComposer {
    /// Create a composer over a shared service.
    pub const fn new(service: Arc<LlmService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ContentComposer for LlmComposer {
    fn name(&self) -> &str {
        "llama-composer"
    }

    async fn compose(
        &self,
        story: &str,
        dialogues: &[NpcDialogue],
        decisions: &[String],
    ) -> Result<ComposedContent, CollaboratorError> {
        let prompt = self.service.prompts().outcome(story, dialogues, decisions)?;
        let raw = self.service.ask("outcome", &prompt).await?;
        Ok(parse_composition(&raw)?)
    }
}

/// Writes the teaser with the LLM, then publishes the day.
#[derive(Debug, Clone)]
pub struct LlmPublisher {
    service: Arc<LlmService>,
}

impl LlmPublisher {
    /// Create a publisher over a shared service.
    pub const fn new(service: Arc<LlmService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Publisher for LlmPublisher {
    fn name(&self) -> &str {
        "llama-publisher"
    }

    async fn publish(&self, snapshot: &CycleSnapshot) -> Result<String, CollaboratorError> {
        let prompt = self.service.prompts().teaser(snapshot)?;
        let teaser = self.service.ask("teaser", &prompt).await?;
        log_publication(snapshot, &teaser);
        Ok(teaser)
    }
}
