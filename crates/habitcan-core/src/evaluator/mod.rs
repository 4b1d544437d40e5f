//! Rule evaluator.
//!
//! Given a habit's rule, an evaluation scope and the tasks of one sleep-day,
//! decides how many new occurrences to emit. Dedupe state lives in
//! [`Watermarks`] and is updated in the same call, so the caller must hold
//! whatever lock guards both the watermarks and the ledger it records into.
//!
//! Evaluation never fails outward: disabled rules, malformed definitions,
//! rule kinds that the scope does not run and an unreadable timeline all
//! yield zero increments and leave the watermarks alone.

mod keyword;
mod task_status;
mod time_threshold;

pub use time_threshold::is_violation;

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::habit::{HabitRule, RuleKind};
use crate::ledger::{OccurrenceDetail, Watermarks};
use crate::sleep_day::DayBoundary;
use crate::timeline::{Task, TaskWindow, TimeoutCounters};

/// When and over which day a rule is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum Scope {
    /// The current, still open sleep-day as seen at `now`.
    Realtime { now: NaiveDateTime },
    /// A past sleep-day, re-evaluated in full.
    ///
    /// With `as_of` set, only what had happened by then is judged, so a
    /// window still open at that instant is left for a later run.
    Settlement {
        day: NaiveDate,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        as_of: Option<NaiveDateTime>,
    },
}

impl Scope {
    /// Settle `day` as fully closed.
    pub fn settlement(day: NaiveDate) -> Self {
        Scope::Settlement { day, as_of: None }
    }

    /// Settle `day` as seen at `as_of`.
    pub fn settlement_as_of(day: NaiveDate, as_of: NaiveDateTime) -> Self {
        Scope::Settlement {
            day,
            as_of: Some(as_of),
        }
    }

    pub fn day(&self, boundary: DayBoundary) -> NaiveDate {
        match self {
            Scope::Realtime { now } => boundary.resolve(*now),
            Scope::Settlement { day, .. } => *day,
        }
    }

    /// Instant up to which events count, `None` for a closed day.
    pub fn now(&self) -> Option<NaiveDateTime> {
        match self {
            Scope::Realtime { now } => Some(*now),
            Scope::Settlement { as_of, .. } => *as_of,
        }
    }

    /// Whether this scope evaluates rules of `kind` at all.
    ///
    /// Manual rules are never evaluated. Task-status rules are watermark
    /// driven in realtime and are not re-run at settlement.
    pub fn evaluates(&self, kind: RuleKind) -> bool {
        match (self, kind) {
            (_, RuleKind::Manual) => false,
            (Scope::Settlement { .. }, RuleKind::TaskStatus) => false,
            _ => true,
        }
    }
}

/// One occurrence to be appended to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Increment {
    pub habit_id: String,
    pub date: NaiveDate,
    pub detail: OccurrenceDetail,
}

/// Per-call view handed to the individual rule evaluators.
pub(crate) struct DayContext<'a> {
    pub habit_id: &'a str,
    pub day: NaiveDate,
    pub now: Option<NaiveDateTime>,
    pub boundary: DayBoundary,
    pub tasks: Vec<&'a Task>,
    pub counters: &'a HashMap<String, TimeoutCounters>,
}

impl DayContext<'_> {
    fn increment(&self, detail: OccurrenceDetail) -> Increment {
        Increment {
            habit_id: self.habit_id.to_string(),
            date: self.day,
            detail,
        }
    }
}

/// Evaluates rule definitions against a day of tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleEvaluator {
    boundary: DayBoundary,
}

impl RuleEvaluator {
    pub fn new(boundary: DayBoundary) -> Self {
        Self { boundary }
    }

    pub fn boundary(&self) -> DayBoundary {
        self.boundary
    }

    /// Evaluate one rule. Never fails; problems are logged and yield nothing.
    pub fn evaluate(
        &self,
        habit_id: &str,
        rule: &HabitRule,
        scope: Scope,
        window: &TaskWindow,
        marks: &mut Watermarks,
    ) -> Vec<Increment> {
        if !rule.enabled() || !scope.evaluates(rule.kind()) {
            return Vec::new();
        }
        if let Err(e) = rule.validate() {
            tracing::warn!(habit_id, error = %e, "skipping malformed rule");
            return Vec::new();
        }

        let day = scope.day(self.boundary);
        if !window.available {
            tracing::debug!(habit_id, date = %day, "no task timeline, rule not evaluated");
            return Vec::new();
        }
        let ctx = DayContext {
            habit_id,
            day,
            now: scope.now(),
            boundary: self.boundary,
            tasks: window
                .tasks
                .iter()
                .filter(|t| t.sleep_day(self.boundary) == Some(day))
                .collect(),
            counters: &window.counters,
        };

        let result = match rule {
            HabitRule::TimeThreshold(r) => time_threshold::evaluate(r, &ctx, marks),
            HabitRule::Keyword(r) => keyword::evaluate(r, &ctx, marks),
            HabitRule::TaskStatus(r) => task_status::evaluate(r, &ctx, marks),
            HabitRule::Manual { .. } => Ok(Vec::new()),
        };

        match result {
            Ok(increments) => {
                if !increments.is_empty() {
                    tracing::debug!(habit_id, date = %day, count = increments.len(), "rule fired");
                }
                increments
            }
            Err(e) => {
                tracing::warn!(habit_id, date = %day, error = %e, "rule evaluation failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{NaiveDate, NaiveDateTime};

    use crate::sleep_day::DayBoundary;
    use crate::timeline::{Task, TaskWindow, TimelineSnapshot};

    pub fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    pub fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    pub fn task(id: &str, title: &str, start: &str, end: &str) -> Task {
        Task::new(id, title).scheduled(at(start), at(end))
    }

    pub fn window(snapshot: &TimelineSnapshot, date: &str) -> TaskWindow {
        TaskWindow::collect(snapshot, snapshot, DayBoundary::default(), day(date))
    }
}
