//! The persistent world record.
//!
//! [`WorldState`] is the only long-lived mutable entity in the system.
//! `day` is the single field that accumulates across cycles; every other
//! field is overwritten by the phase that owns it and never merged with
//! the previous cycle's value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cast::NpcDialogue;
use crate::enums::ContentKind;

/// Errors raised by [`WorldState`] mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// The day counter would overflow.
    #[error("day counter overflow: cannot advance beyond day {day}")]
    DayOverflow {
        /// The day that could not be advanced.
        day: u64,
    },
}

/// Game progress carried from one cycle to the next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldState {
    /// Current day, starting at 1. Advanced once per completed cycle.
    pub day: u64,
    /// Story text produced by the most recent episode phase.
    pub story_summary: String,
    /// Player decisions collected in the most recent cycle.
    pub player_decisions: Vec<String>,
    /// NPC reactions from the most recent episode, in cast order.
    pub npc_interactions: Vec<NpcDialogue>,
    /// Content prompts from the most recent composition phase.
    pub generated_content: BTreeMap<ContentKind, String>,
}

impl WorldState {
    /// A fresh world on day 1 with no history.
    pub const fn new() -> Self {
        Self {
            day: 1,
            story_summary: String::new(),
            player_decisions: Vec::new(),
            npc_interactions: Vec::new(),
            generated_content: BTreeMap::new(),
        }
    }

    /// Advance to the next day and return it.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::DayOverflow`] if the counter is at `u64::MAX`.
    pub fn advance_day(&mut self) -> Result<u64, StateError> {
        self.day = self
            .day
            .checked_add(1)
            .ok_or(StateError::DayOverflow { day: self.day })?;
        Ok(self.day)
    }
}

impl Default for WorldState {
    fn default() -> Self {
        Self::new()
    }
}
