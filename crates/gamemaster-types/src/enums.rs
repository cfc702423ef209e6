//! Enumeration types for the daily cycle.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Content kinds
// ---------------------------------------------------------------------------

/// A kind of multimedia content generated at the end of each cycle.
///
/// Each kind maps to one external generation tool family. The serialized
/// names (`image`, `video`, `3d_scene`, `voiceover`) are the keys of
/// [`WorldState::generated_content`] on the wire.
///
/// [`WorldState::generated_content`]: crate::WorldState::generated_content
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ContentKind {
    /// A still image of the key scene.
    #[serde(rename = "image")]
    Image,
    /// A short video clip of the dynamic moment.
    #[serde(rename = "video")]
    Video,
    /// A 3D scene of the setting.
    #[serde(rename = "3d_scene")]
    Scene3d,
    /// A voiceover of an NPC speaking the key line.
    #[serde(rename = "voiceover")]
    Voiceover,
}

impl ContentKind {
    /// All content kinds, in dispatch order.
    pub const ALL: [Self; 4] = [Self::Image, Self::Video, Self::Scene3d, Self::Voiceover];

    /// The wire key for this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Scene3d => "3d_scene",
            Self::Voiceover => "voiceover",
        }
    }

    /// Parse a wire key back into a kind.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == key)
    }

    /// The external tool family that renders this kind of content.
    ///
    /// Used as a case-insensitive keyword when matching discovered tools.
    pub const fn tool_family(self) -> &'static str {
        match self {
            Self::Image => "nunchaku",
            Self::Video => "lightx2v",
            Self::Scene3d => "trellis",
            Self::Voiceover => "chatterbox",
        }
    }
}

impl core::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

/// One ordered step of the daily cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Generate the story segment and NPC reactions.
    GenerateEpisode,
    /// Notify players and collect their decisions.
    CollectVotes,
    /// Determine the outcome and compose content prompts.
    ComposeContent,
    /// Publish the result and a teaser for the next cycle.
    Publish,
    /// Advance the day counter.
    Advance,
    /// Build the cycle result.
    Report,
}

impl Phase {
    /// All phases, in execution order.
    pub const ALL: [Self; 6] = [
        Self::GenerateEpisode,
        Self::CollectVotes,
        Self::ComposeContent,
        Self::Publish,
        Self::Advance,
        Self::Report,
    ];

    /// Stable snake-case name used in log records.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GenerateEpisode => "generate_episode",
            Self::CollectVotes => "collect_votes",
            Self::ComposeContent => "compose_content",
            Self::Publish => "publish",
            Self::Advance => "advance",
            Self::Report => "report",
        }
    }
}

impl core::fmt::Display for Phase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Cycle status
// ---------------------------------------------------------------------------

/// Terminal status of a cycle attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    /// All six phases ran and the day advanced.
    Completed,
    /// A phase failed; the day did not advance.
    Failed,
}

impl CycleStatus {
    /// Lowercase name used in log records.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_kind_wire_names() {
        let json = serde_json::to_string(&ContentKind::Scene3d).unwrap_or_default();
        assert_eq!(json, "\"3d_scene\"");
        assert_eq!(ContentKind::from_key("voiceover"), Some(ContentKind::Voiceover));
        assert_eq!(ContentKind::from_key("hologram"), None);
    }

    #[test]
    fn phases_are_ordered() {
        let mut sorted = Phase::ALL;
        sorted.sort();
        assert_eq!(sorted, Phase::ALL);
        assert_eq!(Phase::ComposeContent.to_string(), "compose_content");
    }
}
