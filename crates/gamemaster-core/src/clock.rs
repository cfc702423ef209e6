//! Wall-clock access and daily trigger computation.
//!
//! The scheduler never reads the system time directly. It asks a
//! [`Clock`] for the current instant so tests can pin time with
//! [`FixedClock`].
//!
//! # Design Principles
//!
//! - Times carry an explicit UTC offset. The trigger time is resolved
//!   through the clock's own time zone, so a trigger on the far side of a
//!   daylight-saving change gets that day's offset.
//! - Moving to the next calendar day uses checked date arithmetic, so
//!   month and year boundaries (and leap days) are handled by the
//!   calendar, never by incrementing a day-of-month field.

use std::time::Duration;

use chrono::{DateTime, Days, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

/// Errors that can occur while computing trigger instants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    /// The configured trigger time could not be parsed.
    #[error("invalid trigger time {value:?}: expected HH:MM or HH:MM:SS")]
    InvalidTriggerTime {
        /// The rejected value.
        value: String,
    },

    /// The next calendar day is outside the representable range.
    #[error("cannot advance past {date}: date out of range")]
    DateOverflow {
        /// The last representable date that was reached.
        date: NaiveDate,
    },

    /// The local trigger instant does not map to a single point in time.
    #[error("trigger time {time} on {date} has no unique instant")]
    AmbiguousInstant {
        /// The date of the candidate trigger.
        date: NaiveDate,
        /// The trigger time of day.
        time: NaiveTime,
    },
}

/// Abstraction over the wall clock.
pub trait Clock: Send + Sync {
    /// The current instant, with the offset triggers are evaluated in.
    fn now(&self) -> DateTime<FixedOffset>;

    /// Map a local wall-clock reading to an instant in this clock's zone.
    ///
    /// Returns `None` when the reading has no instant. The default reads it
    /// in the offset of [`Clock::now`].
    fn resolve_local(&self, local: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        local.and_local_timezone(*self.now().offset()).single()
    }
}

/// Production clock reading the host's local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }

    /// Repeated readings take the earlier instant. Skipped readings move
    /// forward by an hour.
    fn resolve_local(&self, local: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        local
            .and_local_timezone(Local)
            .earliest()
            .or_else(|| {
                local
                    .checked_add_signed(TimeDelta::hours(1))?
                    .and_local_timezone(Local)
                    .earliest()
            })
            .map(|instant| instant.fixed_offset())
    }
}

/// A clock that always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

/// Parse a daily trigger time such as `08:00` or `20:30:15`.
///
/// # Errors
///
/// Returns [`ClockError::InvalidTriggerTime`] for anything else.
pub fn parse_trigger_time(value: &str) -> Result<NaiveTime, ClockError> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_err| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_err| ClockError::InvalidTriggerTime {
            value: value.to_owned(),
        })
}

/// The next instant strictly after `now` whose time of day is `at`, in
/// the fixed offset of `now`.
///
/// If `at` has already passed today (or is exactly now), the result is
/// `at` on the following calendar day.
///
/// # Errors
///
/// Returns [`ClockError::DateOverflow`] at the end of the calendar range.
pub fn next_trigger(
    now: &DateTime<FixedOffset>,
    at: NaiveTime,
) -> Result<DateTime<FixedOffset>, ClockError> {
    next_trigger_in(&FixedClock(*now), now, at)
}

/// The first instant strictly after `after` whose local time of day in
/// `clock`'s zone is `at`.
///
/// # Errors
///
/// Returns [`ClockError::DateOverflow`] at the end of the calendar range
/// and [`ClockError::AmbiguousInstant`] when the zone cannot place `at`.
pub fn next_trigger_in(
    clock: &dyn Clock,
    after: &DateTime<FixedOffset>,
    at: NaiveTime,
) -> Result<DateTime<FixedOffset>, ClockError> {
    let today = after.date_naive();
    let candidate = resolve_on(clock, today, at)?;
    if candidate > *after {
        return Ok(candidate);
    }

    let tomorrow = today
        .checked_add_days(Days::new(1))
        .ok_or(ClockError::DateOverflow { date: today })?;
    let candidate = resolve_on(clock, tomorrow, at)?;
    if candidate > *after {
        Ok(candidate)
    } else {
        Err(ClockError::AmbiguousInstant {
            date: tomorrow,
            time: at,
        })
    }
}

fn resolve_on(
    clock: &dyn Clock,
    date: NaiveDate,
    at: NaiveTime,
) -> Result<DateTime<FixedOffset>, ClockError> {
    clock
        .resolve_local(date.and_time(at))
        .ok_or(ClockError::AmbiguousInstant { date, time: at })
}

/// Time remaining from `now` until `target`, zero if `target` has passed.
pub fn duration_until(now: &DateTime<FixedOffset>, target: &DateTime<FixedOffset>) -> Duration {
    target
        .signed_duration_since(*now)
        .to_std()
        .unwrap_or(Duration::ZERO)
}
