use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use super::{local_clock, Clock};
use crate::engine::{EvaluationSummary, HabitEngine};
use crate::events::Event;
use crate::habit::RuleKind;

/// Rule kinds re-run when the timeline changes.
const TIMELINE_KINDS: [RuleKind; 2] = [RuleKind::TimeThreshold, RuleKind::Keyword];

/// Polls the open sleep-day at a fixed interval.
pub struct RealtimeMonitor {
    engine: Arc<HabitEngine>,
    interval: Duration,
    clock: Clock,
}

impl RealtimeMonitor {
    pub fn new(engine: Arc<HabitEngine>, interval: Duration) -> Self {
        Self {
            engine,
            interval,
            clock: local_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Evaluate every active rule against the sleep-day open now.
    pub fn poll(&self) -> EvaluationSummary {
        let now = (self.clock)();
        let summary = self.engine.run_realtime(now);
        if summary.increments > 0 {
            tracing::info!(
                now = %now,
                increments = summary.increments,
                "realtime poll recorded occurrences"
            );
        } else {
            tracing::debug!(now = %now, evaluated = summary.evaluated, "realtime poll");
        }
        summary
    }

    /// React to a timeline event.
    ///
    /// Evaluation runs at the time the event carries. Ticks evaluate every
    /// rule; task completions and timeline edits re-run only the threshold
    /// and keyword rules.
    pub fn handle_event(&self, event: &Event) -> EvaluationSummary {
        if event.is_tick() {
            return self.engine.run_realtime(event.at());
        }
        if let Event::TaskCompleted { task_id, .. } = event {
            tracing::debug!(task_id = %task_id, "task completed");
        }
        self.engine.run_realtime_for(event.at(), &TIMELINE_KINDS)
    }

    /// Run until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// Returns the number of evaluation passes performed.
    pub async fn run(
        self,
        mut events: mpsc::Receiver<Event>,
        mut shutdown: watch::Receiver<bool>,
    ) -> usize {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut events_open = true;
        let mut passes = 0;

        tracing::info!(interval_secs = self.interval.as_secs(), "realtime monitor started");
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.poll();
                    passes += 1;
                }
                event = events.recv(), if events_open => match event {
                    Some(event) => {
                        self.handle_event(&event);
                        passes += 1;
                    }
                    None => events_open = false,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!(passes, "realtime monitor stopped");
        passes
    }
}
