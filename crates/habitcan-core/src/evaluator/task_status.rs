use super::{DayContext, Increment};
use crate::error::RuleError;
use crate::habit::{StatusType, TaskStatusRule};
use crate::ledger::{OccurrenceDetail, WatermarkKey, Watermarks};
use crate::sleep_day::clock_label;

/// Emit increments for counter growth since the last poll.
///
/// A counter that went backwards means the task was reset; the watermark
/// follows it down without emitting anything.
pub(super) fn evaluate(
    rule: &TaskStatusRule,
    ctx: &DayContext<'_>,
    marks: &mut Watermarks,
) -> Result<Vec<Increment>, RuleError> {
    if rule.count_per_occurrence == 0 {
        return Err(RuleError::ZeroCountPerOccurrence);
    }

    let label = match rule.status_type {
        StatusType::StartTimeout => "start timeout",
        StatusType::CompletionTimeout => "completion timeout",
    };
    let time = ctx.now.map(clock_label).unwrap_or_else(|| "00:00".to_string());

    let mut increments = Vec::new();
    for task in &ctx.tasks {
        let Some(counters) = ctx.counters.get(&task.id) else {
            continue;
        };
        let current = match rule.status_type {
            StatusType::StartTimeout => counters.start_timeout_count,
            StatusType::CompletionTimeout => counters.complete_timeout_count,
        };

        let key = WatermarkKey::task(ctx.habit_id, &task.id, ctx.day);
        let last = marks.get(&key).unwrap_or(0);
        if current == last {
            continue;
        }
        marks.advance(key, current);
        if current < last {
            tracing::debug!(task_id = %task.id, last, current, "timeout counter reset");
            continue;
        }

        for n in last + 1..=current {
            let reason = format!("task \"{}\" {label} #{n}", task.title);
            for _ in 0..rule.count_per_occurrence {
                increments.push(ctx.increment(
                    OccurrenceDetail::new(time.clone(), reason.clone()).for_task(&task.id),
                ));
            }
        }
    }
    Ok(increments)
}
