//! Shared stop control for the continuous scheduling loops.
//!
//! A [`SchedulerControl`] is wrapped in [`Arc`](std::sync::Arc) and shared
//! between the scheduler task and whoever may ask it to stop (a signal
//! handler, an operator endpoint, a test). The stop flag is observed only
//! between cycles and during scheduler waits; a cycle that has started
//! always runs to completion or failure.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

/// Why a continuous loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// A stop was requested through the control.
    Requested,
    /// The configured cycle budget was used up.
    CycleLimitReached,
}

/// Shared scheduler control state.
#[derive(Debug)]
pub struct SchedulerControl {
    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Wakes any scheduler wait when a stop is requested.
    stop_notify: Notify,

    /// Maximum number of cycle attempts (0 = unlimited).
    max_cycles: u64,

    /// Cycle attempts so far.
    cycles_run: AtomicU64,
}

impl SchedulerControl {
    /// Create a control with the given cycle budget (0 = unlimited).
    pub fn new(max_cycles: u64) -> Self {
        Self {
            stop_requested: AtomicBool::new(false),
            stop_notify: Notify::new(),
            max_cycles,
            cycles_run: AtomicU64::new(0),
        }
    }

    /// A control with no cycle budget.
    pub fn unbounded() -> Self {
        Self::new(0)
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Request a clean stop and wake any pending scheduler wait.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.stop_notify.notify_waiters();
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Sleep for `duration` unless a stop is requested first.
    ///
    /// Returns `true` if the full duration elapsed, `false` if the wait was
    /// cut short by a stop request.
    pub async fn wait(&self, duration: Duration) -> bool {
        let notified = self.stop_notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.is_stop_requested() {
            return false;
        }

        tokio::select! {
            () = tokio::time::sleep(duration) => true,
            () = notified => false,
        }
    }

    // -----------------------------------------------------------------------
    // Cycle budget
    // -----------------------------------------------------------------------

    /// Maximum number of cycle attempts (0 = unlimited).
    pub const fn max_cycles(&self) -> u64 {
        self.max_cycles
    }

    /// Number of cycle attempts recorded so far.
    pub fn cycles_run(&self) -> u64 {
        self.cycles_run.load(Ordering::Acquire)
    }

    /// Record one cycle attempt and return the new total.
    pub fn record_cycle(&self) -> u64 {
        let previous = self
            .cycles_run
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_add(1))
            .unwrap_or(u64::MAX);
        previous.saturating_add(1)
    }

    /// Whether the cycle budget has been used up.
    pub fn cycle_limit_reached(&self) -> bool {
        self.max_cycles > 0 && self.cycles_run() >= self.max_cycles
    }

    /// The reason the loop should stop now, if any.
    pub fn stop_reason(&self) -> Option<StopReason> {
        if self.is_stop_requested() {
            Some(StopReason::Requested)
        } else if self.cycle_limit_reached() {
            Some(StopReason::CycleLimitReached)
        } else {
            None
        }
    }
}

impl Default for SchedulerControl {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn stop_flag() {
        let control = SchedulerControl::unbounded();
        assert!(!control.is_stop_requested());
        assert_eq!(control.stop_reason(), None);
        control.request_stop();
        assert!(control.is_stop_requested());
        assert_eq!(control.stop_reason(), Some(StopReason::Requested));
    }

    #[test]
    fn cycle_budget() {
        let control = SchedulerControl::new(2);
        assert!(!control.cycle_limit_reached());
        assert_eq!(control.record_cycle(), 1);
        assert!(!control.cycle_limit_reached());
        assert_eq!(control.record_cycle(), 2);
        assert_eq!(control.stop_reason(), Some(StopReason::CycleLimitReached));
    }

    #[test]
    fn zero_budget_is_unlimited() {
        let control = SchedulerControl::unbounded();
        for _ in 0..100 {
            let _ = control.record_cycle();
        }
        assert!(!control.cycle_limit_reached());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_runs_to_completion() {
        let control = SchedulerControl::unbounded();
        let started = tokio::time::Instant::now();
        assert!(control.wait(Duration::from_secs(60)).await);
        assert_eq!(started.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_interrupts_wait() {
        let control = Arc::new(SchedulerControl::unbounded());
        let stopper = Arc::clone(&control);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            stopper.request_stop();
        });

        let started = tokio::time::Instant::now();
        assert!(!control.wait(Duration::from_secs(3600)).await);
        assert_eq!(started.elapsed(), Duration::from_secs(5));
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn wait_returns_immediately_once_stopped() {
        let control = SchedulerControl::unbounded();
        control.request_stop();
        assert!(!control.wait(Duration::from_secs(3600)).await);
    }
}
