//! The orchestrator: one owned world state plus everything that drives it.

use std::sync::Arc;

use gamemaster_types::{CycleResult, ToolCatalog, WorldState};
use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::collaborator::Collaborators;
use crate::config::{ConfigError, GameMasterConfig, OperatingMode};
use crate::control::SchedulerControl;
use crate::scheduler::{self, CycleCallback, CycleScheduler, NoOpCallback, SchedulerExit};
use crate::sequencer::PhaseSequencer;

/// What a mode run produced.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// The single cycle's result.
    Single(CycleResult),
    /// How a continuous run ended.
    Continuous(SchedulerExit),
}

/// Owns the [`WorldState`] and runs cycles against it.
pub struct Orchestrator {
    state: WorldState,
    sequencer: PhaseSequencer,
    scheduler: CycleScheduler,
    catalog: ToolCatalog,
    degraded: Vec<String>,
    callback: Box<dyn CycleCallback>,
}

impl Orchestrator {
    /// Assemble an orchestrator from its parts, starting at day 1.
    pub fn new(sequencer: PhaseSequencer, scheduler: CycleScheduler, catalog: ToolCatalog) -> Self {
        Self {
            state: WorldState::new(),
            sequencer,
            scheduler,
            catalog,
            degraded: Vec::new(),
            callback: Box::new(NoOpCallback),
        }
    }

    /// Build an orchestrator from configuration using the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Schedule`] if the trigger time is malformed.
    pub fn from_config(
        config: &GameMasterConfig,
        collaborators: Collaborators,
        catalog: ToolCatalog,
    ) -> Result<Self, ConfigError> {
        Self::with_clock(config, collaborators, catalog, Arc::new(SystemClock))
    }

    /// Build an orchestrator from configuration with an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Schedule`] if the trigger time is malformed.
    pub fn with_clock(
        config: &GameMasterConfig,
        collaborators: Collaborators,
        catalog: ToolCatalog,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let scheduler = CycleScheduler::from_config(config, clock)?;
        let sequencer = PhaseSequencer::new(collaborators, config.cast.clone());
        Ok(Self::new(sequencer, scheduler, catalog))
    }

    /// Replace the per-cycle callback.
    #[must_use]
    pub fn with_callback(mut self, callback: impl CycleCallback + 'static) -> Self {
        self.callback = Box::new(callback);
        self
    }

    /// Run exactly one cycle.
    pub async fn run_once(&mut self) -> CycleResult {
        self.scheduler
            .run_single(
                &self.sequencer,
                &mut self.state,
                &self.catalog,
                self.callback.as_mut(),
            )
            .await
    }

    /// Run one cycle per day at the trigger time until stopped.
    pub async fn run_scheduled(&mut self) -> SchedulerExit {
        self.scheduler
            .run_scheduled(
                &self.sequencer,
                &mut self.state,
                &self.catalog,
                self.callback.as_mut(),
            )
            .await
    }

    /// Run compressed-time cycles back to back until stopped.
    pub async fn run_simulated(&mut self) -> SchedulerExit {
        self.scheduler
            .run_simulated(
                &self.sequencer,
                &mut self.state,
                &self.catalog,
                self.callback.as_mut(),
            )
            .await
    }

    /// Run in the given operating mode.
    pub async fn run(&mut self, mode: OperatingMode) -> RunOutcome {
        info!(mode = %mode, day = self.state.day, "Orchestrator running");
        match mode {
            OperatingMode::Single => RunOutcome::Single(self.run_once().await),
            OperatingMode::Scheduled => {
                let exit = self.run_scheduled().await;
                scheduler::log_scheduler_exit(&exit);
                RunOutcome::Continuous(exit)
            }
            OperatingMode::Simulation => {
                let exit = self.run_simulated().await;
                scheduler::log_scheduler_exit(&exit);
                RunOutcome::Continuous(exit)
            }
        }
    }

    /// The current world state.
    pub const fn world_state(&self) -> &WorldState {
        &self.state
    }

    /// The installed collaborators.
    pub const fn collaborators(&self) -> &Collaborators {
        self.sequencer.collaborators()
    }

    /// Replace every collaborator slot.
    pub fn install(&mut self, collaborators: Collaborators) {
        info!(slots = ?collaborators, "Installing collaborators");
        self.sequencer.install(collaborators);
    }

    /// The discovered content tools.
    pub const fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Replace the discovered content tools.
    pub fn set_catalog(&mut self, catalog: ToolCatalog) {
        self.catalog = catalog;
    }

    /// Names of the capabilities currently running on fallbacks.
    pub fn degraded(&self) -> &[String] {
        &self.degraded
    }

    /// Record which capabilities are running on fallbacks.
    pub fn set_degraded(&mut self, degraded: Vec<String>) {
        self.degraded = degraded;
    }

    /// The shared stop control, for signal handlers and operators.
    pub fn control(&self) -> Arc<SchedulerControl> {
        Arc::clone(self.scheduler.control())
    }
}

impl core::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("day", &self.state.day)
            .field("sequencer", &self.sequencer)
            .field("scheduler", &self.scheduler)
            .field("tools", &self.catalog.len())
            .field("degraded", &self.degraded)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gamemaster_types::CycleStatus;

    use super::*;

    #[tokio::test]
    async fn run_dispatches_single_mode() {
        let mut orchestrator = Orchestrator::from_config(
            &GameMasterConfig::default(),
            Collaborators::degraded(),
            ToolCatalog::empty(),
        )
        .unwrap();

        let outcome = orchestrator.run(OperatingMode::Single).await;
        assert!(matches!(
            outcome,
            RunOutcome::Single(ref result) if result.status() == CycleStatus::Completed
        ));
        assert_eq!(orchestrator.world_state().day, 2);
    }

    #[test]
    fn bad_trigger_time_is_a_config_error() {
        let mut config = GameMasterConfig::default();
        config.schedule.trigger_time = "noon".to_owned();
        let result = Orchestrator::from_config(&config, Collaborators::degraded(), ToolCatalog::empty());
        assert!(matches!(result, Err(ConfigError::Schedule { .. })));
    }
}
