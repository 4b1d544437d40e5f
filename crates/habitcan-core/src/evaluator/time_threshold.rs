use chrono::{NaiveDateTime, NaiveTime, Timelike};

use super::{DayContext, Increment};
use crate::error::RuleError;
use crate::habit::{CheckType, Comparison, TimeThresholdRule};
use crate::ledger::{OccurrenceDetail, WatermarkKey, Watermarks};
use crate::sleep_day::{clock_label, clock_minutes, parse_clock, DayBoundary};
use crate::timeline::Task;

pub(super) fn evaluate(
    rule: &TimeThresholdRule,
    ctx: &DayContext<'_>,
    marks: &mut Watermarks,
) -> Result<Vec<Increment>, RuleError> {
    let threshold = parse_clock(&rule.time)?;

    let Some((task, ts)) = select_event(rule.check_type, &ctx.tasks) else {
        return Ok(Vec::new());
    };

    // An open day only judges events that have already happened.
    if ctx.now.is_some_and(|now| ts > now) {
        return Ok(Vec::new());
    }

    if !is_violation(rule.comparison, ts, threshold, ctx.boundary) {
        return Ok(Vec::new());
    }

    if !marks.mark_once(WatermarkKey::day(ctx.habit_id, ctx.day)) {
        return Ok(Vec::new());
    }

    let clock = clock_label(ts);
    let event = match rule.check_type {
        CheckType::FirstEvent => "first task starts",
        CheckType::LastEvent => "last task ends",
    };
    let side = match rule.comparison {
        Comparison::After => "after",
        Comparison::Before => "before",
    };
    let reason = format!("{event} at {clock}, {side} {}", rule.time);

    Ok(vec![ctx.increment(
        OccurrenceDetail::new(clock, reason).for_task(&task.id),
    )])
}

/// Earliest start or latest end among the day's tasks.
fn select_event<'a>(check: CheckType, tasks: &[&'a Task]) -> Option<(&'a Task, NaiveDateTime)> {
    match check {
        CheckType::FirstEvent => tasks
            .iter()
            .filter_map(|t| t.scheduled_start.map(|ts| (*t, ts)))
            .min_by_key(|(_, ts)| *ts),
        CheckType::LastEvent => tasks
            .iter()
            .filter_map(|t| t.scheduled_end.map(|ts| (*t, ts)))
            .max_by_key(|(_, ts)| *ts),
    }
}

/// Threshold check with small-hours handling.
///
/// Past midnight is always "after" an evening threshold and never "before"
/// a morning one: those hours are carry-over from the previous sleep-day.
pub fn is_violation(
    comparison: Comparison,
    ts: NaiveDateTime,
    threshold: NaiveTime,
    boundary: DayBoundary,
) -> bool {
    let small_hours = boundary.is_small_hours(ts.hour());
    let clock = clock_minutes(ts);
    match comparison {
        Comparison::After => small_hours || clock > threshold,
        Comparison::Before => !small_hours && clock < threshold,
    }
}
