//! Collaborator traits: the contracts the phase sequencer consumes.
//!
//! Each trait wraps one external capability. Implementations may be live
//! (calling a remote backend) or fallback (deterministic, no I/O). Which
//! one backs each slot is decided once, at initialization, and recorded
//! in [`Collaborators`]; the sequencer never re-checks availability.
//!
//! When a live implementation returns a recoverable [`CollaboratorError`]
//! the sequencer substitutes the slot's fallback result for that call
//! only. Non-recoverable errors fail the cycle.

use async_trait::async_trait;
use gamemaster_types::{ComposedContent, CycleSnapshot, NpcDialogue, NpcProfile};
use tracing::info;

use crate::fallback::{FallbackComposer, FallbackNarrator, FallbackPublisher, IdleCast, SimulatedBallot};

/// Errors returned by collaborator calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    /// The backend could not be reached.
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    /// The backend answered with an error.
    #[error("collaborator backend error: {0}")]
    Backend(String),

    /// The backend answered but the response was unusable.
    #[error("invalid collaborator response: {0}")]
    InvalidResponse(String),

    /// An internal invariant was violated. Never recovered by a fallback.
    #[error("collaborator invariant violated: {0}")]
    Invariant(String),
}

impl CollaboratorError {
    /// Whether a fallback result may stand in for the failed call.
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Invariant(_))
    }
}

/// Produces the day's story segment.
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    /// Short name used in log records and failure reports.
    fn name(&self) -> &str;

    /// Generate the story for `day`, continuing from `prior_summary`.
    async fn generate_episode(&self, day: u64, prior_summary: &str)
    -> Result<String, CollaboratorError>;
}

/// Produces one NPC's reaction to a story.
#[async_trait]
pub trait DialogueGenerator: Send + Sync {
    /// Short name used in log records and failure reports.
    fn name(&self) -> &str;

    /// Generate what `npc` says in response to `story`.
    async fn generate_dialogue(
        &self,
        npc: &NpcProfile,
        story: &str,
    ) -> Result<String, CollaboratorError>;
}

/// Gathers player decisions for a story.
#[async_trait]
pub trait VoteCollector: Send + Sync {
    /// Short name used in log records and failure reports.
    fn name(&self) -> &str;

    /// Collect the ordered player decisions for `story`.
    async fn collect_votes(&self, story: &str) -> Result<Vec<String>, CollaboratorError>;
}

/// Derives the outcome and the content-generation prompts.
#[async_trait]
pub trait ContentComposer: Send + Sync {
    /// Short name used in log records and failure reports.
    fn name(&self) -> &str;

    /// Compose the outcome and one prompt per content kind.
    async fn compose(
        &self,
        story: &str,
        dialogues: &[NpcDialogue],
        decisions: &[String],
    ) -> Result<ComposedContent, CollaboratorError>;
}

/// Publishes the finished day and returns the teaser for the next one.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Short name used in log records and failure reports.
    fn name(&self) -> &str;

    /// Publish `snapshot` and return the teaser.
    async fn publish(&self, snapshot: &CycleSnapshot) -> Result<String, CollaboratorError>;
}

/// Emit the publication records the messaging front-end consumes.
pub fn log_publication(snapshot: &CycleSnapshot, teaser: &str) {
    let dialogues = serde_json::to_string(&snapshot.npc_dialogues).unwrap_or_default();
    let decisions = serde_json::to_string(&snapshot.player_decisions).unwrap_or_default();
    let content = serde_json::to_string(&snapshot.content_prompts).unwrap_or_default();
    info!(
        day = snapshot.day,
        story = %snapshot.story,
        npc_dialogues = %dialogues,
        player_decisions = %decisions,
        generated_content = %content,
        outcome = %snapshot.outcome,
        teaser,
        "Publishing day results"
    );
}

/// The collaborator slots wired into the sequencer.
pub struct Collaborators {
    /// Story generation.
    pub narrator: Box<dyn NarrativeGenerator>,
    /// NPC dialogue generation.
    pub dialogue: Box<dyn DialogueGenerator>,
    /// Player vote collection.
    pub votes: Box<dyn VoteCollector>,
    /// Outcome and prompt composition.
    pub composer: Box<dyn ContentComposer>,
    /// Result publication.
    pub publisher: Box<dyn Publisher>,
}

impl Collaborators {
    /// Every slot backed by its fallback implementation.
    pub fn degraded() -> Self {
        Self {
            narrator: Box::new(FallbackNarrator),
            dialogue: Box::new(IdleCast),
            votes: Box::new(SimulatedBallot),
            composer: Box::new(FallbackComposer),
            publisher: Box::new(FallbackPublisher),
        }
    }

    /// Replace the narrative generator.
    #[must_use]
    pub fn with_narrator(mut self, narrator: impl NarrativeGenerator + 'static) -> Self {
        self.narrator = Box::new(narrator);
        self
    }

    /// Replace the dialogue generator.
    #[must_use]
    pub fn with_dialogue(mut self, dialogue: impl DialogueGenerator + 'static) -> Self {
        self.dialogue = Box::new(dialogue);
        self
    }

    /// Replace the vote collector.
    #[must_use]
    pub fn with_votes(mut self, votes: impl VoteCollector + 'static) -> Self {
        self.votes = Box::new(votes);
        self
    }

    /// Replace the content composer.
    #[must_use]
    pub fn with_composer(mut self, composer: impl ContentComposer + 'static) -> Self {
        self.composer = Box::new(composer);
        self
    }

    /// Replace the publisher.
    #[must_use]
    pub fn with_publisher(mut self, publisher: impl Publisher + 'static) -> Self {
        self.publisher = Box::new(publisher);
        self
    }

    /// Names of the implementations currently installed, slot by slot.
    pub fn describe(&self) -> [(&'static str, &str); 5] {
        [
            ("narrator", self.narrator.name()),
            ("dialogue", self.dialogue.name()),
            ("votes", self.votes.name()),
            ("composer", self.composer.name()),
            ("publisher", self.publisher.name()),
        ]
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::degraded()
    }
}

impl core::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Collaborators")
            .field("narrator", &self.narrator.name())
            .field("dialogue", &self.dialogue.name())
            .field("votes", &self.votes.name())
            .field("composer", &self.composer.name())
            .field("publisher", &self.publisher.name())
            .finish()
    }
}
