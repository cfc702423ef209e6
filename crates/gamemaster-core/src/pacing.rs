//! Wait-duration strategy shared by all operating modes.
//!
//! The phase sequencer suspends after each phase for however long the
//! active [`Pacing`] says. Single-shot and scheduled cycles run their
//! phases back to back; simulation mode substitutes short fixed waits for
//! the real-world gaps between phases (voting window, content rendering).

use std::time::Duration;

use gamemaster_types::Phase;

use crate::config::SimulationTimingConfig;

/// Supplies the suspension for every wait point of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// No waits between phases.
    Immediate,
    /// Compressed waits for end-to-end validation.
    Compressed(CompressedTiming),
}

impl Pacing {
    /// Suspension after `phase` completes, before the next phase starts.
    pub const fn after_phase(&self, phase: Phase) -> Duration {
        match self {
            Self::Immediate => Duration::ZERO,
            Self::Compressed(timing) => timing.after_phase(phase),
        }
    }

    /// Sum of all inter-phase waits in one nominal cycle.
    pub fn cycle_waits(&self) -> Duration {
        Phase::ALL
            .into_iter()
            .map(|phase| self.after_phase(phase))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

/// Fixed waits for compressed-time simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressedTiming {
    /// After the episode is generated.
    pub episode_pause: Duration,
    /// Stand-in for the voting window.
    pub voting: Duration,
    /// Stand-in for content rendering.
    pub content: Duration,
    /// After publication.
    pub publish_pause: Duration,
    /// Between two simulated days.
    pub inter_cycle: Duration,
    /// After a failed simulated day.
    pub retry: Duration,
}

impl CompressedTiming {
    /// Suspension after `phase`.
    pub const fn after_phase(&self, phase: Phase) -> Duration {
        match phase {
            Phase::GenerateEpisode => self.episode_pause,
            Phase::CollectVotes => self.voting,
            Phase::ComposeContent => self.content,
            Phase::Publish => self.publish_pause,
            Phase::Advance | Phase::Report => Duration::ZERO,
        }
    }
}

impl From<&SimulationTimingConfig> for CompressedTiming {
    fn from(config: &SimulationTimingConfig) -> Self {
        Self {
            episode_pause: Duration::from_secs(config.episode_pause_secs),
            voting: Duration::from_secs(config.voting_secs),
            content: Duration::from_secs(config.content_secs),
            publish_pause: Duration::from_secs(config.publish_pause_secs),
            inter_cycle: Duration::from_secs(config.inter_cycle_secs),
            retry: Duration::from_secs(config.retry_secs),
        }
    }
}

impl Default for CompressedTiming {
    fn default() -> Self {
        Self::from(&SimulationTimingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_pacing_never_waits() {
        assert!(Phase::ALL
            .iter()
            .all(|phase| Pacing::Immediate.after_phase(*phase).is_zero()));
        assert_eq!(Pacing::Immediate.cycle_waits(), Duration::ZERO);
    }

    #[test]
    fn default_compressed_waits() {
        let pacing = Pacing::Compressed(CompressedTiming::default());
        assert_eq!(pacing.after_phase(Phase::GenerateEpisode), Duration::from_secs(1));
        assert_eq!(pacing.after_phase(Phase::CollectVotes), Duration::from_secs(30));
        assert_eq!(pacing.after_phase(Phase::ComposeContent), Duration::from_secs(10));
        assert_eq!(pacing.after_phase(Phase::Publish), Duration::ZERO);
        assert_eq!(pacing.cycle_waits(), Duration::from_secs(41));
    }
}
