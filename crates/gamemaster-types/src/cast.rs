//! NPC personas and their dialogue lines.

use serde::{Deserialize, Serialize};

/// Identity and persona of a non-player character.
///
/// The `directive` is sent to the dialogue backend as the character's
/// standing instruction. `idle_line`, when present, is what the character
/// says whenever no generated dialogue is available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpcProfile {
    /// Display name, also used as the dialogue speaker label.
    pub name: String,
    /// Persona instruction for the dialogue backend.
    pub directive: String,
    /// Fixed line used in place of generated dialogue.
    #[serde(default)]
    pub idle_line: Option<String>,
}

impl NpcProfile {
    /// Create a profile without an idle line.
    pub fn new(name: impl Into<String>, directive: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            directive: directive.into(),
            idle_line: None,
        }
    }

    /// Set the idle line.
    #[must_use]
    pub fn with_idle_line(mut self, line: impl Into<String>) -> Self {
        self.idle_line = Some(line.into());
        self
    }

    /// The deterministic line this NPC speaks when its dialogue cannot be
    /// generated.
    pub fn fallback_line(&self) -> String {
        self.idle_line.clone().unwrap_or_else(|| {
            format!("{} remains silent, contemplating the situation.", self.name)
        })
    }
}

/// A single NPC reaction recorded during the episode phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpcDialogue {
    /// Name of the speaking NPC.
    pub npc: String,
    /// What the NPC said.
    pub dialogue: String,
}

impl NpcDialogue {
    /// Pair an NPC name with a line of dialogue.
    pub fn new(npc: impl Into<String>, dialogue: impl Into<String>) -> Self {
        Self {
            npc: npc.into(),
            dialogue: dialogue.into(),
        }
    }
}

/// The starting crew of the exploration vessel.
pub fn default_cast() -> Vec<NpcProfile> {
    vec![
        NpcProfile::new(
            "Captain Eva Rodriguez",
            "You are the captain of a deep space exploration vessel. You are decisive, \
             caring, and responsible for your crew's safety.",
        )
        .with_idle_line("We need to assess the situation carefully before proceeding."),
        NpcProfile::new(
            "Chief Engineer Marcus Chen",
            "You are the ship's chief engineer. You are brilliant, pragmatic, and \
             fascinated by alien technology.",
        )
        .with_idle_line(
            "The ship's systems are holding steady, but I'm detecting unusual energy patterns.",
        ),
    ]
}
