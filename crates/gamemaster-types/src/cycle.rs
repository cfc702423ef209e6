//! Cycle snapshots and result records.
//!
//! A [`CycleResult`] is produced at the end of every cycle attempt. It is
//! an immutable report: nothing reads it back into the world state, and it
//! is never persisted.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cast::NpcDialogue;
use crate::enums::{ContentKind, CycleStatus, Phase};
use crate::ids::CycleId;

/// Outcome narrative plus one generation prompt per content kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposedContent {
    /// Narrative conclusion of the day's events.
    pub outcome: String,
    /// Generation prompt for each content kind.
    pub prompts: BTreeMap<ContentKind, String>,
}

/// Everything the publisher needs to announce a finished day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSnapshot {
    /// The day being published (before the advance).
    pub day: u64,
    /// The day's story.
    pub story: String,
    /// NPC reactions to the story.
    pub npc_dialogues: Vec<NpcDialogue>,
    /// Player decisions for the day.
    pub player_decisions: Vec<String>,
    /// Outcome narrative from the composition phase.
    pub outcome: String,
    /// Content prompts dispatched to the generation tools.
    pub content_prompts: BTreeMap<ContentKind, String>,
}

/// Snapshots captured by a cycle that ran all six phases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedCycle {
    /// Pre-advance snapshot of the published day.
    pub snapshot: CycleSnapshot,
    /// Teaser for the next cycle.
    pub teaser: String,
}

/// Context for a cycle that stopped before the advance phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedCycle {
    /// The phase that failed.
    pub phase: Phase,
    /// The collaborator involved, if any.
    pub adapter: Option<String>,
    /// Human-readable error description.
    pub error: String,
}

/// What a cycle attempt produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// All phases ran.
    Completed(Box<CompletedCycle>),
    /// A phase failed.
    Failed(FailedCycle),
}

/// Report of one cycle attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleResult {
    /// Identifier of this attempt.
    pub cycle_id: CycleId,
    /// Day number when the attempt ended: the new day on success, the
    /// unchanged day on failure.
    pub day: u64,
    /// When the attempt ended.
    pub timestamp: DateTime<Utc>,
    /// Wall-clock duration of the attempt, including pacing waits.
    pub elapsed_ms: u64,
    /// Completed snapshots or failure context.
    pub outcome: CycleOutcome,
}

impl CycleResult {
    /// Terminal status of the attempt.
    pub const fn status(&self) -> CycleStatus {
        match self.outcome {
            CycleOutcome::Completed(_) => CycleStatus::Completed,
            CycleOutcome::Failed(_) => CycleStatus::Failed,
        }
    }

    /// Whether the attempt completed.
    pub const fn is_completed(&self) -> bool {
        matches!(self.outcome, CycleOutcome::Completed(_))
    }

    /// The completed snapshots, if the attempt completed.
    pub fn completed(&self) -> Option<&CompletedCycle> {
        match &self.outcome {
            CycleOutcome::Completed(done) => Some(done),
            CycleOutcome::Failed(_) => None,
        }
    }

    /// The failure context, if the attempt failed.
    pub const fn failure(&self) -> Option<&FailedCycle> {
        match &self.outcome {
            CycleOutcome::Completed(_) => None,
            CycleOutcome::Failed(failed) => Some(failed),
        }
    }
}
