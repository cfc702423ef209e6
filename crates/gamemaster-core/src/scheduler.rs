//! Cycle scheduler: the three operating modes.
//!
//! - **Single-shot**: run one cycle and return its result.
//! - **Scheduled**: wait for the daily trigger time, run a cycle, repeat.
//! - **Simulation**: run cycles back to back with compressed waits.
//!
//! Both continuous modes survive every per-cycle failure. They return only
//! when the shared [`SchedulerControl`] asks them to stop or its cycle
//! budget is used up.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveTime};
use gamemaster_types::{CycleResult, ToolCatalog, WorldState};
use tracing::{debug, error, info, warn};

use crate::clock::{self, Clock, ClockError};
use crate::config::GameMasterConfig;
use crate::control::{SchedulerControl, StopReason};
use crate::pacing::{CompressedTiming, Pacing};
use crate::sequencer::PhaseSequencer;

/// Errors raised by the scheduling loop itself, outside any cycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    /// The next trigger instant could not be computed.
    #[error("cannot compute next trigger: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },
}

/// Result of a continuous scheduling run.
#[derive(Debug, Clone)]
pub struct SchedulerExit {
    /// Why the loop returned.
    pub reason: StopReason,
    /// Cycles attempted during this run.
    pub cycles: u64,
    /// The last cycle result, if any cycle ran.
    pub last_result: Option<CycleResult>,
}

/// Callback invoked after every cycle, completed or failed.
///
/// Implementations can forward results to a front-end, collect them for
/// inspection, and so on.
pub trait CycleCallback: Send {
    /// Called with the cycle's result and the world state it left behind.
    fn on_cycle(&mut self, result: &CycleResult, state: &WorldState);
}

/// A no-op cycle callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCallback;

impl CycleCallback for NoOpCallback {
    fn on_cycle(&mut self, _result: &CycleResult, _state: &WorldState) {}
}

/// Drives the phase sequencer according to an operating mode.
pub struct CycleScheduler {
    clock: Arc<dyn Clock>,
    control: Arc<SchedulerControl>,
    trigger: NaiveTime,
    retry_backoff: Duration,
    timing: CompressedTiming,
}

impl CycleScheduler {
    /// Create a scheduler.
    pub fn new(
        clock: Arc<dyn Clock>,
        control: Arc<SchedulerControl>,
        trigger: NaiveTime,
        retry_backoff: Duration,
        timing: CompressedTiming,
    ) -> Self {
        Self {
            clock,
            control,
            trigger,
            retry_backoff,
            timing,
        }
    }

    /// Create a scheduler from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidTriggerTime`] if the trigger time is
    /// malformed.
    pub fn from_config(config: &GameMasterConfig, clock: Arc<dyn Clock>) -> Result<Self, ClockError> {
        Ok(Self::new(
            clock,
            Arc::new(SchedulerControl::new(config.bounds.max_cycles)),
            config.schedule.trigger()?,
            Duration::from_secs(config.schedule.retry_backoff_secs),
            CompressedTiming::from(&config.simulation),
        ))
    }

    /// The shared stop control.
    pub const fn control(&self) -> &Arc<SchedulerControl> {
        &self.control
    }

    /// The compressed waits used by simulation mode.
    pub const fn timing(&self) -> &CompressedTiming {
        &self.timing
    }

    /// The next scheduled trigger instant as seen from the clock.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::Clock`] at the end of the calendar range.
    pub fn next_run(&self) -> Result<DateTime<FixedOffset>, ScheduleError> {
        let now = self.clock.now();
        Ok(clock::next_trigger_in(&*self.clock, &now, self.trigger)?)
    }

    /// Run exactly one cycle with no waits.
    pub async fn run_single(
        &self,
        sequencer: &PhaseSequencer,
        state: &mut WorldState,
        catalog: &ToolCatalog,
        callback: &mut dyn CycleCallback,
    ) -> CycleResult {
        let result = sequencer.run_cycle(state, &Pacing::Immediate, catalog).await;
        log_cycle_result(&result);
        callback.on_cycle(&result, state);
        result
    }

    /// Run one cycle per day at the trigger time until stopped.
    ///
    /// Each trigger is strictly later than the one before it, so a clock
    /// that lags behind the timer never fires the same day twice.
    pub async fn run_scheduled(
        &self,
        sequencer: &PhaseSequencer,
        state: &mut WorldState,
        catalog: &ToolCatalog,
        callback: &mut dyn CycleCallback,
    ) -> SchedulerExit {
        info!(
            trigger = %self.trigger,
            max_cycles = self.control.max_cycles(),
            "Scheduled mode starting"
        );

        let mut cycles: u64 = 0;
        let mut last_result = None;
        let mut last_trigger: Option<DateTime<FixedOffset>> = None;

        loop {
            if let Some(reason) = self.control.stop_reason() {
                return SchedulerExit {
                    reason,
                    cycles,
                    last_result,
                };
            }

            let now = self.clock.now();
            let from = match last_trigger {
                Some(fired) if fired > now => fired,
                _ => now,
            };
            let next = match clock::next_trigger_in(&*self.clock, &from, self.trigger)
                .map_err(ScheduleError::from)
            {
                Ok(next) => next,
                Err(err) => {
                    error!(
                        error = %err,
                        backoff_secs = self.retry_backoff.as_secs(),
                        "Scheduling loop failure, backing off"
                    );
                    let _ = self.control.wait(self.retry_backoff).await;
                    continue;
                }
            };

            let wait = clock::duration_until(&now, &next);
            info!(next_run = %next, wait_secs = wait.as_secs(), "Waiting for next trigger");
            if !self.control.wait(wait).await {
                continue;
            }
            last_trigger = Some(next);

            let result = sequencer.run_cycle(state, &Pacing::Immediate, catalog).await;
            cycles = cycles.saturating_add(1);
            let _ = self.control.record_cycle();
            log_cycle_result(&result);
            callback.on_cycle(&result, state);
            last_result = Some(result);
        }
    }

    /// Run compressed-time cycles back to back until stopped.
    pub async fn run_simulated(
        &self,
        sequencer: &PhaseSequencer,
        state: &mut WorldState,
        catalog: &ToolCatalog,
        callback: &mut dyn CycleCallback,
    ) -> SchedulerExit {
        let pacing = Pacing::Compressed(self.timing);
        info!(
            cycle_waits_secs = pacing.cycle_waits().as_secs(),
            inter_cycle_secs = self.timing.inter_cycle.as_secs(),
            max_cycles = self.control.max_cycles(),
            "Simulation mode starting"
        );

        let mut cycles: u64 = 0;
        let mut last_result = None;

        loop {
            if let Some(reason) = self.control.stop_reason() {
                return SchedulerExit {
                    reason,
                    cycles,
                    last_result,
                };
            }

            let result = sequencer.run_cycle(state, &pacing, catalog).await;
            cycles = cycles.saturating_add(1);
            let _ = self.control.record_cycle();
            log_cycle_result(&result);
            callback.on_cycle(&result, state);

            let wait = if result.is_completed() {
                self.timing.inter_cycle
            } else {
                warn!(
                    day = result.day,
                    retry_secs = self.timing.retry.as_secs(),
                    "Simulated day failed, retrying"
                );
                self.timing.retry
            };
            last_result = Some(result);
            let _ = self.control.wait(wait).await;
        }
    }
}

impl core::fmt::Debug for CycleScheduler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CycleScheduler")
            .field("trigger", &self.trigger)
            .field("retry_backoff", &self.retry_backoff)
            .field("timing", &self.timing)
            .field("control", &self.control)
            .finish_non_exhaustive()
    }
}

/// Emit the per-cycle log record.
pub fn log_cycle_result(result: &CycleResult) {
    match result.failure() {
        None => info!(
            cycle_id = %result.cycle_id,
            status = result.status().as_str(),
            day = result.day,
            elapsed_ms = result.elapsed_ms,
            "Cycle finished"
        ),
        Some(failure) => error!(
            cycle_id = %result.cycle_id,
            status = result.status().as_str(),
            day = result.day,
            phase = %failure.phase,
            adapter = failure.adapter.as_deref(),
            elapsed_ms = result.elapsed_ms,
            "Cycle finished"
        ),
    }

    match serde_json::to_string(result) {
        Ok(json) => debug!(result = %json, "Cycle result"),
        Err(err) => warn!(error = %err, "Failed to serialize cycle result"),
    }
}

/// Log the end of a continuous run.
pub fn log_scheduler_exit(exit: &SchedulerExit) {
    info!(
        reason = ?exit.reason,
        cycles = exit.cycles,
        final_day = exit.last_result.as_ref().map(|r| r.day),
        "Scheduler stopped"
    );

    if exit.last_result.is_none() {
        warn!("Scheduler stopped with no cycles executed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
    use gamemaster_types::default_cast;
    use tokio::time::Instant;

    use super::*;
    use crate::clock::FixedClock;
    use crate::collaborator::{CollaboratorError, Collaborators, VoteCollector};

    struct CountCallback {
        completed: u64,
        failed: u64,
    }

    impl CycleCallback for CountCallback {
        fn on_cycle(&mut self, result: &CycleResult, _state: &WorldState) {
            if result.is_completed() {
                self.completed = self.completed.saturating_add(1);
            } else {
                self.failed = self.failed.saturating_add(1);
            }
        }
    }

    struct BrokenBallot;

    #[async_trait]
    impl VoteCollector for BrokenBallot {
        fn name(&self) -> &str {
            "broken-ballot"
        }

        async fn collect_votes(&self, _story: &str) -> Result<Vec<String>, CollaboratorError> {
            Err(CollaboratorError::Unavailable("front-end offline".to_owned()))
        }
    }

    fn nine_am() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2026, 3, 10, 9, 0, 0)
            .unwrap()
    }

    fn scheduler(max_cycles: u64) -> CycleScheduler {
        let mut config = GameMasterConfig::default();
        config.bounds.max_cycles = max_cycles;
        CycleScheduler::from_config(&config, Arc::new(FixedClock(nine_am()))).unwrap()
    }

    /// Wall clock that moves with tokio's timer and leaves summer time
    /// (+02:00) for winter time (+01:00) at 01:00 UTC on 25 October 2026.
    struct AutumnClock {
        base: DateTime<Utc>,
        start: Instant,
    }

    impl AutumnClock {
        fn new() -> Self {
            Self {
                base: Utc.with_ymd_and_hms(2026, 10, 24, 7, 0, 0).unwrap(),
                start: Instant::now(),
            }
        }

        fn offset_at(instant: DateTime<Utc>) -> FixedOffset {
            let change = Utc.with_ymd_and_hms(2026, 10, 25, 1, 0, 0).unwrap();
            let secs = if instant < change { 7200 } else { 3600 };
            FixedOffset::east_opt(secs).unwrap()
        }
    }

    impl Clock for AutumnClock {
        fn now(&self) -> DateTime<FixedOffset> {
            let elapsed = TimeDelta::from_std(self.start.elapsed()).unwrap();
            let utc = self.base.checked_add_signed(elapsed).unwrap();
            utc.with_timezone(&Self::offset_at(utc))
        }

        fn resolve_local(&self, local: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
            [7200, 3600]
                .into_iter()
                .filter_map(FixedOffset::east_opt)
                .filter_map(|offset| local.and_local_timezone(offset).single())
                .filter(|t| *t.offset() == Self::offset_at(t.with_timezone(&Utc)))
                .min()
        }
    }

    /// A fixed clock that counts how often it is read.
    struct CountingClock {
        at: DateTime<FixedOffset>,
        reads: AtomicU64,
    }

    impl Clock for CountingClock {
        fn now(&self) -> DateTime<FixedOffset> {
            self.reads.fetch_add(1, Ordering::Relaxed);
            self.at
        }

        fn resolve_local(&self, local: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
            local.and_local_timezone(*self.at.offset()).single()
        }
    }

    fn sequencer(collaborators: Collaborators) -> PhaseSequencer {
        PhaseSequencer::new(collaborators, default_cast())
    }

    #[tokio::test]
    async fn single_runs_one_cycle() {
        let sched = scheduler(0);
        let seq = sequencer(Collaborators::degraded());
        let mut state = WorldState::new();
        let mut cb = CountCallback { completed: 0, failed: 0 };

        let result = sched
            .run_single(&seq, &mut state, &ToolCatalog::empty(), &mut cb)
            .await;

        assert!(result.is_completed());
        assert_eq!(state.day, 2);
        assert_eq!(cb.completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn single_cycles_leave_the_budget_untouched() {
        let sched = scheduler(1);
        let seq = sequencer(Collaborators::degraded());
        let mut state = WorldState::new();

        let _ = sched
            .run_single(&seq, &mut state, &ToolCatalog::empty(), &mut NoOpCallback)
            .await;
        assert_eq!(sched.control().cycles_run(), 0);

        let exit = sched
            .run_simulated(&seq, &mut state, &ToolCatalog::empty(), &mut NoOpCallback)
            .await;
        assert_eq!(exit.reason, StopReason::CycleLimitReached);
        assert_eq!(exit.cycles, 1);
        assert_eq!(state.day, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_cycle_takes_phase_waits_plus_inter_cycle() {
        let sched = scheduler(1);
        let seq = sequencer(Collaborators::degraded());
        let mut state = WorldState::new();

        let started = Instant::now();
        let exit = sched
            .run_simulated(&seq, &mut state, &ToolCatalog::empty(), &mut NoOpCallback)
            .await;

        assert_eq!(exit.reason, StopReason::CycleLimitReached);
        assert_eq!(exit.cycles, 1);
        assert_eq!(started.elapsed(), Duration::from_secs(1 + 30 + 10 + 60));
        assert_eq!(state.day, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn simulation_survives_failed_cycles() {
        let sched = scheduler(3);
        let seq = sequencer(Collaborators::degraded().with_votes(BrokenBallot));
        let mut state = WorldState::new();
        let mut cb = CountCallback { completed: 0, failed: 0 };

        let started = Instant::now();
        let exit = sched
            .run_simulated(&seq, &mut state, &ToolCatalog::empty(), &mut cb)
            .await;

        assert_eq!(exit.cycles, 3);
        assert_eq!(cb.failed, 3);
        assert_eq!(state.day, 1);
        // Each failed attempt: 1 s episode pause, then the 10 s retry wait.
        assert_eq!(started.elapsed(), Duration::from_secs(3 * (1 + 10)));
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_waits_for_next_trigger() {
        let sched = scheduler(1);
        let seq = sequencer(Collaborators::degraded());
        let mut state = WorldState::new();

        let started = Instant::now();
        let exit = sched
            .run_scheduled(&seq, &mut state, &ToolCatalog::empty(), &mut NoOpCallback)
            .await;

        assert_eq!(started.elapsed(), Duration::from_secs(23 * 3600));
        assert_eq!(exit.reason, StopReason::CycleLimitReached);
        assert_eq!(exit.last_result.map(|r| r.day), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_fires_once_per_day_across_clock_change() {
        let mut config = GameMasterConfig::default();
        config.bounds.max_cycles = 2;
        let sched = CycleScheduler::from_config(&config, Arc::new(AutumnClock::new())).unwrap();
        let seq = sequencer(Collaborators::degraded());
        let mut state = WorldState::new();

        let started = Instant::now();
        let exit = sched
            .run_scheduled(&seq, &mut state, &ToolCatalog::empty(), &mut NoOpCallback)
            .await;

        // 08:00 +01:00 on the 25th, then 08:00 +01:00 on the 26th.
        assert_eq!(started.elapsed(), Duration::from_secs(2 * 24 * 3600));
        assert_eq!(exit.cycles, 2);
        assert_eq!(state.day, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn scheduling_failure_backs_off_until_stopped() {
        let at = NaiveDate::MAX
            .and_hms_opt(9, 0, 0)
            .unwrap()
            .and_local_timezone(FixedOffset::east_opt(0).unwrap())
            .unwrap();
        let clock = Arc::new(CountingClock {
            at,
            reads: AtomicU64::new(0),
        });
        let config = GameMasterConfig::default();
        let sched = CycleScheduler::from_config(&config, Arc::clone(&clock) as Arc<dyn Clock>).unwrap();
        let control = Arc::clone(sched.control());
        let seq = sequencer(Collaborators::degraded());
        let mut state = WorldState::new();

        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2 * 3600 + 100)).await;
            control.request_stop();
        });

        let started = Instant::now();
        let exit = sched
            .run_scheduled(&seq, &mut state, &ToolCatalog::empty(), &mut NoOpCallback)
            .await;
        stopper.await.unwrap();

        assert_eq!(exit.reason, StopReason::Requested);
        assert_eq!(exit.cycles, 0);
        assert_eq!(state.day, 1);
        assert_eq!(started.elapsed(), Duration::from_secs(2 * 3600 + 100));
        // One attempt at start and one after each full hour of backoff.
        assert_eq!(clock.reads.load(Ordering::Relaxed), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_request_ends_scheduled_wait() {
        let sched = scheduler(0);
        let control = Arc::clone(sched.control());
        let seq = sequencer(Collaborators::degraded());
        let mut state = WorldState::new();

        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            control.request_stop();
        });

        let exit = sched
            .run_scheduled(&seq, &mut state, &ToolCatalog::empty(), &mut NoOpCallback)
            .await;
        stopper.await.unwrap();

        assert_eq!(exit.reason, StopReason::Requested);
        assert_eq!(exit.cycles, 0);
        assert_eq!(state.day, 1);
    }

    #[test]
    fn next_run_is_tomorrow_morning() {
        let sched = scheduler(0);
        let next = sched.next_run().unwrap();
        assert_eq!(next.date_naive().to_string(), "2026-03-11");
        assert_eq!(next.time().to_string(), "08:00:00");
    }
}
