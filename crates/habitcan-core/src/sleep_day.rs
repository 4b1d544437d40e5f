//! Sleep-day resolution.
//!
//! A sleep-day runs from the boundary hour (07:00 by default) until just
//! before the boundary hour on the next calendar date. Anything that happens
//! in the small hours belongs to the previous calendar date. Every date the
//! engine derives from a timestamp goes through [`DayBoundary::resolve`].

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::RuleError;

/// Hour at which a new sleep-day begins.
pub const DEFAULT_BOUNDARY_HOUR: u32 = 7;

/// The hour that splits one sleep-day from the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayBoundary {
    hour: u32,
}

impl Default for DayBoundary {
    fn default() -> Self {
        Self {
            hour: DEFAULT_BOUNDARY_HOUR,
        }
    }
}

impl DayBoundary {
    /// Create a boundary at `hour`, clamped to `0..=23`.
    pub fn new(hour: u32) -> Self {
        Self { hour: hour.min(23) }
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    /// Whether a clock hour lies in the `[0, boundary)` carry-over window.
    pub fn is_small_hours(&self, hour: u32) -> bool {
        hour < self.hour
    }

    /// The sleep-day that owns `ts`.
    pub fn resolve(&self, ts: NaiveDateTime) -> NaiveDate {
        if self.is_small_hours(ts.hour()) {
            ts.date() - Duration::days(1)
        } else {
            ts.date()
        }
    }

    /// Wall-clock instant of `time` inside sleep-day `day`.
    ///
    /// Times before the boundary land on the following calendar date.
    pub fn instant(&self, day: NaiveDate, time: NaiveTime) -> NaiveDateTime {
        if self.is_small_hours(time.hour()) {
            (day + Duration::days(1)).and_time(time)
        } else {
            day.and_time(time)
        }
    }

    /// First instant after sleep-day `day` has closed.
    pub fn close_of(&self, day: NaiveDate) -> NaiveDateTime {
        let start = NaiveTime::from_hms_opt(self.hour, 0, 0).unwrap_or(NaiveTime::MIN);
        (day + Duration::days(1)).and_time(start)
    }

    /// Minutes elapsed since the boundary for a clock time, in `0..1440`.
    ///
    /// Orders clock times the way they occur within a sleep-day, so that
    /// 23:30 sorts before 01:00.
    pub fn offset_minutes(&self, time: NaiveTime) -> u32 {
        let minutes = time.hour() * 60 + time.minute();
        (minutes + 24 * 60 - self.hour * 60) % (24 * 60)
    }
}

/// Sleep-day of `ts` under the default 07:00 boundary.
pub fn sleep_day(ts: NaiveDateTime) -> NaiveDate {
    DayBoundary::default().resolve(ts)
}

/// Parse an `HH:MM` clock time.
pub fn parse_clock(value: &str) -> Result<NaiveTime, RuleError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| RuleError::InvalidClockTime(value.to_string()))
}

/// Format the clock part of a timestamp as `HH:MM`.
pub fn clock_label(ts: NaiveDateTime) -> String {
    ts.format("%H:%M").to_string()
}

/// Truncate a timestamp's clock time to whole minutes.
pub fn clock_minutes(ts: NaiveDateTime) -> NaiveTime {
    NaiveTime::from_hms_opt(ts.hour(), ts.minute(), 0).unwrap_or(NaiveTime::MIN)
}
