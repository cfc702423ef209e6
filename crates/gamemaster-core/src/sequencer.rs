//! Phase sequencer: the six-phase state machine behind one daily cycle.
//!
//! Each cycle runs through these phases, strictly in order:
//!
//! 1. **Generate Episode** -- the narrator writes the day's story from the
//!    previous summary; each NPC in the cast reacts to it in turn.
//!
//! 2. **Collect Votes** -- the vote collector gathers the player decisions.
//!
//! 3. **Compose Content** -- the composer derives the outcome and one
//!    prompt per content kind; each prompt is dispatched to the discovered
//!    tool for its kind.
//!
//! 4. **Publish** -- the publisher receives the full snapshot and answers
//!    with the teaser for tomorrow.
//!
//! 5. **Advance** -- the day counter moves forward by one.
//!
//! 6. **Report** -- the [`CycleResult`] is assembled.
//!
//! A recoverable collaborator error is replaced by the slot's fallback
//! result at the call site. Anything else aborts the remaining phases and
//! yields a failed result carrying the pre-advance day.

use gamemaster_types::{
    CompletedCycle, ComposedContent, ContentKind, CycleId, CycleOutcome, CycleResult,
    CycleSnapshot, FailedCycle, NpcDialogue, NpcProfile, Phase, ToolCatalog, WorldState,
};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::collaborator::{CollaboratorError, Collaborators, log_publication};
use crate::fallback;
use crate::pacing::Pacing;

/// A failure that aborted a cycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cycle for day {day} failed in {phase}: {message}")]
pub struct PhaseFailure {
    /// The phase that was executing.
    pub phase: Phase,
    /// The collaborator involved, if any.
    pub adapter: Option<String>,
    /// The day the cycle was running for.
    pub day: u64,
    /// Human-readable cause.
    pub message: String,
}

impl PhaseFailure {
    fn collaborator(phase: Phase, adapter: &str, day: u64, err: &CollaboratorError) -> Self {
        Self {
            phase,
            adapter: Some(adapter.to_owned()),
            day,
            message: err.to_string(),
        }
    }
}

impl From<PhaseFailure> for FailedCycle {
    fn from(failure: PhaseFailure) -> Self {
        Self {
            phase: failure.phase,
            adapter: failure.adapter,
            error: failure.message,
        }
    }
}

/// Runs one cycle at a time against a borrowed [`WorldState`].
#[derive(Debug)]
pub struct PhaseSequencer {
    collaborators: Collaborators,
    cast: Vec<NpcProfile>,
}

impl PhaseSequencer {
    /// Create a sequencer over the given collaborators and cast.
    pub const fn new(collaborators: Collaborators, cast: Vec<NpcProfile>) -> Self {
        Self {
            collaborators,
            cast,
        }
    }

    /// The installed collaborators.
    pub const fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Replace every collaborator slot.
    pub fn install(&mut self, collaborators: Collaborators) {
        self.collaborators = collaborators;
    }

    /// The NPCs reacting to each episode, in speaking order.
    pub fn cast(&self) -> &[NpcProfile] {
        &self.cast
    }

    /// Execute one complete cycle.
    ///
    /// Never returns an error: a cycle that cannot complete is reported as
    /// a failed [`CycleResult`] and `state.day` is left untouched.
    pub async fn run_cycle(
        &self,
        state: &mut WorldState,
        pacing: &Pacing,
        catalog: &ToolCatalog,
    ) -> CycleResult {
        let started = Instant::now();
        let cycle_id = CycleId::new();
        info!(%cycle_id, day = state.day, "Cycle started");

        let outcome = match self.run_phases(state, pacing, catalog).await {
            Ok(completed) => CycleOutcome::Completed(Box::new(completed)),
            Err(failure) => {
                error!(
                    %cycle_id,
                    day = failure.day,
                    phase = %failure.phase,
                    adapter = failure.adapter.as_deref(),
                    error = %failure.message,
                    "Cycle failed"
                );
                CycleOutcome::Failed(failure.into())
            }
        };

        CycleResult {
            cycle_id,
            day: state.day,
            timestamp: chrono::Utc::now(),
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            outcome,
        }
    }

    async fn run_phases(
        &self,
        state: &mut WorldState,
        pacing: &Pacing,
        catalog: &ToolCatalog,
    ) -> Result<CompletedCycle, PhaseFailure> {
        let day = state.day;

        // --- Phase 1: Generate Episode ---
        state.story_summary = self.phase_episode(day, &state.story_summary).await?;
        state.npc_interactions = self.phase_dialogue(day, &state.story_summary).await?;
        pause(pacing, Phase::GenerateEpisode).await;

        // --- Phase 2: Collect Votes ---
        state.player_decisions = self.phase_votes(day, &state.story_summary).await?;
        pause(pacing, Phase::CollectVotes).await;

        // --- Phase 3: Compose Content ---
        let content = self.phase_compose(day, state).await?;
        state.generated_content.clone_from(&content.prompts);
        dispatch_prompts(day, &state.generated_content, catalog);
        pause(pacing, Phase::ComposeContent).await;

        // --- Phase 4: Publish ---
        let snapshot = CycleSnapshot {
            day,
            story: state.story_summary.clone(),
            npc_dialogues: state.npc_interactions.clone(),
            player_decisions: state.player_decisions.clone(),
            outcome: content.outcome,
            content_prompts: state.generated_content.clone(),
        };
        let teaser = self.phase_publish(day, &snapshot).await?;
        pause(pacing, Phase::Publish).await;

        // --- Phase 5: Advance ---
        let next_day = state.advance_day().map_err(|err| PhaseFailure {
            phase: Phase::Advance,
            adapter: None,
            day,
            message: err.to_string(),
        })?;

        // --- Phase 6: Report ---
        info!(day, next_day, "Cycle completed");
        Ok(CompletedCycle { snapshot, teaser })
    }

    async fn phase_episode(&self, day: u64, prior_summary: &str) -> Result<String, PhaseFailure> {
        let narrator = &self.collaborators.narrator;
        let result = narrator.generate_episode(day, prior_summary).await;
        let story = recover(Phase::GenerateEpisode, narrator.name(), day, result, || {
            fallback::episode(day)
        })?;
        info!(day, phase = %Phase::GenerateEpisode, chars = story.len(), "Episode generated");
        debug!(day, story = %story, "Episode text");
        Ok(story)
    }

    async fn phase_dialogue(&self, day: u64, story: &str) -> Result<Vec<NpcDialogue>, PhaseFailure> {
        let generator = &self.collaborators.dialogue;
        let mut dialogues = Vec::with_capacity(self.cast.len());
        for npc in &self.cast {
            let result = generator.generate_dialogue(npc, story).await;
            let line = recover(Phase::GenerateEpisode, generator.name(), day, result, || {
                npc.fallback_line()
            })?;
            debug!(day, npc = %npc.name, dialogue = %line, "NPC reacted");
            dialogues.push(NpcDialogue::new(npc.name.clone(), line));
        }
        Ok(dialogues)
    }

    async fn phase_votes(&self, day: u64, story: &str) -> Result<Vec<String>, PhaseFailure> {
        let collector = &self.collaborators.votes;
        let decisions = collector.collect_votes(story).await.map_err(|err| {
            PhaseFailure::collaborator(Phase::CollectVotes, collector.name(), day, &err)
        })?;
        info!(day, phase = %Phase::CollectVotes, decisions = decisions.len(), "Votes collected");
        Ok(decisions)
    }

    async fn phase_compose(
        &self,
        day: u64,
        state: &WorldState,
    ) -> Result<ComposedContent, PhaseFailure> {
        let composer = &self.collaborators.composer;
        let result = composer
            .compose(
                &state.story_summary,
                &state.npc_interactions,
                &state.player_decisions,
            )
            .await;
        let mut content = recover(
            Phase::ComposeContent,
            composer.name(),
            day,
            result,
            fallback::composed_content,
        )?;
        for kind in ContentKind::ALL {
            content
                .prompts
                .entry(kind)
                .or_insert_with(|| fallback::prompt_for(kind).to_owned());
        }
        info!(day, phase = %Phase::ComposeContent, "Outcome determined");
        debug!(day, outcome = %content.outcome, "Outcome text");
        Ok(content)
    }

    async fn phase_publish(&self, day: u64, snapshot: &CycleSnapshot) -> Result<String, PhaseFailure> {
        let publisher = &self.collaborators.publisher;
        let result = publisher.publish(snapshot).await;
        let teaser = recover(Phase::Publish, publisher.name(), day, result, || {
            log_publication(snapshot, fallback::FALLBACK_TEASER);
            fallback::FALLBACK_TEASER.to_owned()
        })?;
        info!(day, phase = %Phase::Publish, "Results published");
        Ok(teaser)
    }
}

/// Substitute the fallback for a recoverable error, fail the phase otherwise.
fn recover<T>(
    phase: Phase,
    adapter: &str,
    day: u64,
    result: Result<T, CollaboratorError>,
    fallback: impl FnOnce() -> T,
) -> Result<T, PhaseFailure> {
    match result {
        Ok(value) => Ok(value),
        Err(err) if err.is_recoverable() => {
            warn!(day, phase = %phase, adapter, error = %err, "Collaborator failed, using fallback");
            Ok(fallback())
        }
        Err(err) => Err(PhaseFailure::collaborator(phase, adapter, day, &err)),
    }
}

/// Log the hand-off of each prompt to its content tool.
fn dispatch_prompts(
    day: u64,
    prompts: &std::collections::BTreeMap<ContentKind, String>,
    catalog: &ToolCatalog,
) {
    for (kind, prompt) in prompts {
        match catalog.tool_for(*kind) {
            Some(tool) => {
                info!(day, kind = %kind, tool = %tool.name, "Content prompt dispatched");
            }
            None => {
                info!(
                    day,
                    kind = %kind,
                    family = kind.tool_family(),
                    "No tool discovered for content kind, prompt queued"
                );
            }
        }
        debug!(day, kind = %kind, prompt = %prompt, "Content prompt");
    }
}

async fn pause(pacing: &Pacing, phase: Phase) {
    let wait = pacing.after_phase(phase);
    if !wait.is_zero() {
        debug!(phase = %phase, wait_secs = wait.as_secs(), "Pacing wait");
        tokio::time::sleep(wait).await;
    }
}
