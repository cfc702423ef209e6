//! Deterministic stand-ins for every collaborator.
//!
//! These are used in two ways: as the installed implementation of a slot
//! whose backend was unreachable at startup, and as the substitute result
//! when a live call fails with a recoverable error. Every function here
//! is pure; identical inputs always give identical text.

use std::collections::BTreeMap;

use async_trait::async_trait;
use gamemaster_types::{ComposedContent, ContentKind, CycleSnapshot, NpcDialogue, NpcProfile};

use crate::collaborator::{
    CollaboratorError, ContentComposer, DialogueGenerator, NarrativeGenerator, Publisher,
    VoteCollector, log_publication,
};

/// Teaser used when no teaser can be generated.
pub const FALLBACK_TEASER: &str =
    "Tomorrow, a new mystery unfolds as the alien artifact reveals its true purpose...";

/// Outcome used when no outcome can be composed.
pub const FALLBACK_OUTCOME: &str = "The crew's collective decision leads to a breakthrough in \
                                    understanding the alien technology.";

/// Decisions offered to players while vote collection is simulated.
pub const SAMPLE_VOTES: [&str; 3] = [
    "Choose the risky path through the asteroid field",
    "Trust the mysterious alien artifact",
    "Send a distress signal to the nearest station",
];

/// The templated story for `day`.
pub fn episode(day: u64) -> String {
    format!(
        "Day {day}: The crew discovers an ancient alien artifact floating in deep space. \
         Strange energy readings emanate from it, and the ship's systems begin acting \
         mysteriously. The crew must decide whether to investigate further or maintain a \
         safe distance."
    )
}

/// The fixed prompt for one content kind.
pub const fn prompt_for(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Image => {
            "A dramatic scene of the crew examining a glowing alien artifact on the bridge of \
             their spaceship"
        }
        ContentKind::Video => {
            "The alien artifact activates, projecting holographic star maps into the ship's bridge"
        }
        ContentKind::Scene3d => {
            "A detailed 3D model of the alien artifact with intricate geometric patterns"
        }
        ContentKind::Voiceover => {
            "Captain's log: We've made first contact with an intelligence beyond our comprehension"
        }
    }
}

/// The fixed outcome plus all four fixed prompts.
pub fn composed_content() -> ComposedContent {
    ComposedContent {
        outcome: FALLBACK_OUTCOME.to_owned(),
        prompts: ContentKind::ALL
            .into_iter()
            .map(|kind| (kind, prompt_for(kind).to_owned()))
            .collect::<BTreeMap<_, _>>(),
    }
}

/// The sample decisions as owned strings.
pub fn sample_votes() -> Vec<String> {
    SAMPLE_VOTES.iter().map(|v| (*v).to_owned()).collect()
}

/// Fallback reactions for a whole cast, in order.
pub fn idle_dialogues(cast: &[NpcProfile]) -> Vec<NpcDialogue> {
    cast.iter()
        .map(|npc| NpcDialogue::new(npc.name.clone(), npc.fallback_line()))
        .collect()
}

// ---------------------------------------------------------------------------
// Fallback implementations
// ---------------------------------------------------------------------------

/// Narrator that always returns the templated story.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackNarrator;

#[async_trait]
impl NarrativeGenerator for FallbackNarrator {
    fn name(&self) -> &str {
        "fallback-narrator"
    }

    async fn generate_episode(
        &self,
        day: u64,
        _prior_summary: &str,
    ) -> Result<String, CollaboratorError> {
        Ok(episode(day))
    }
}

/// Dialogue generator in which every NPC speaks its fallback line.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdleCast;

#[async_trait]
impl DialogueGenerator for IdleCast {
    fn name(&self) -> &str {
        "idle-cast"
    }

    async fn generate_dialogue(
        &self,
        npc: &NpcProfile,
        _story: &str,
    ) -> Result<String, CollaboratorError> {
        Ok(npc.fallback_line())
    }
}

/// Vote collector returning the sample decisions.
///
/// The real channel is the messaging front-end; until it reports back,
/// the voting window is simulated with a fixed set of decisions.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedBallot;

#[async_trait]
impl VoteCollector for SimulatedBallot {
    fn name(&self) -> &str {
        "simulated-ballot"
    }

    async fn collect_votes(&self, _story: &str) -> Result<Vec<String>, CollaboratorError> {
        Ok(sample_votes())
    }
}

/// Composer returning the fixed outcome and prompts.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackComposer;

#[async_trait]
impl ContentComposer for FallbackComposer {
    fn name(&self) -> &str {
        "fallback-composer"
    }

    async fn compose(
        &self,
        _story: &str,
        _dialogues: &[NpcDialogue],
        _decisions: &[String],
    ) -> Result<ComposedContent, CollaboratorError> {
        Ok(composed_content())
    }
}

/// Publisher logging the day's results with the generic teaser.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackPublisher;

#[async_trait]
impl Publisher for FallbackPublisher {
    fn name(&self) -> &str {
        "fallback-publisher"
    }

    async fn publish(&self, snapshot: &CycleSnapshot) -> Result<String, CollaboratorError> {
        log_publication(snapshot, FALLBACK_TEASER);
        Ok(FALLBACK_TEASER.to_owned())
    }
}
