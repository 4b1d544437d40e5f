use chrono::NaiveTime;

use super::{DayContext, Increment};
use crate::error::RuleError;
use crate::habit::KeywordRule;
use crate::ledger::{OccurrenceDetail, WatermarkKey, Watermarks};
use crate::sleep_day::{clock_label, clock_minutes, DayBoundary};
use crate::timeline::Task;

pub(super) fn evaluate(
    rule: &KeywordRule,
    ctx: &DayContext<'_>,
    marks: &mut Watermarks,
) -> Result<Vec<Increment>, RuleError> {
    let range = rule.time_range.as_ref().map(|r| r.parse()).transpose()?;

    let matched: Vec<&Task> = ctx
        .tasks
        .iter()
        .copied()
        .filter(|t| match range {
            None => true,
            Some((start, end)) => t
                .scheduled_start
                .is_some_and(|s| within(ctx.boundary, clock_minutes(s), start, end)),
        })
        .filter(|t| rule.matches(&t.haystack()))
        .collect();

    let keywords = rule.keywords.join(", ");

    if rule.should_exist {
        let mut increments = Vec::new();
        for task in matched {
            if !marks.mark_once(WatermarkKey::task(ctx.habit_id, &task.id, ctx.day)) {
                continue;
            }
            let time = task
                .scheduled_start
                .map(clock_label)
                .unwrap_or_else(|| "00:00".to_string());
            let reason = format!("task \"{}\" matches keywords: {keywords}", task.title);
            increments.push(ctx.increment(OccurrenceDetail::new(time, reason).for_task(&task.id)));
        }
        return Ok(increments);
    }

    if !matched.is_empty() {
        return Ok(Vec::new());
    }

    // Absence is only known once the window has closed.
    let deadline = match range {
        Some((_, end)) => ctx.boundary.instant(ctx.day, end),
        None => ctx.boundary.close_of(ctx.day),
    };
    if ctx.now.is_some_and(|now| now < deadline) {
        return Ok(Vec::new());
    }

    if !marks.mark_once(WatermarkKey::day(ctx.habit_id, ctx.day)) {
        return Ok(Vec::new());
    }

    let (time, window) = match &rule.time_range {
        Some(r) => (r.start.clone(), format!("between {}-{}", r.start, r.end)),
        None => ("12:00".to_string(), "all day".to_string()),
    };
    let reason = format!("no task matching keywords ({keywords}) {window}");
    Ok(vec![ctx.increment(OccurrenceDetail::new(time, reason))])
}

/// Inclusive window check in sleep-day order; handles ranges that wrap midnight.
fn within(boundary: DayBoundary, t: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    let (t, start, end) = (
        boundary.offset_minutes(t),
        boundary.offset_minutes(start),
        boundary.offset_minutes(end),
    );
    if start <= end {
        start <= t && t <= end
    } else {
        t >= start || t <= end
    }
}
