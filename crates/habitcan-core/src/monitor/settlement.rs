use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, NaiveDateTime, NaiveTime};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use super::{local_clock, Clock};
use crate::engine::{EvaluationSummary, HabitEngine};

/// Calendar days before today re-settled on every run.
const SETTLED_DAYS: u64 = 2;

/// Time until the next occurrence of `at`, strictly after `now`.
pub fn delay_until_next(now: NaiveDateTime, at: NaiveTime) -> Duration {
    let today = now.date().and_time(at);
    let next = if today > now {
        today
    } else {
        now.date()
            .checked_add_days(Days::new(1))
            .map_or(today, |d| d.and_time(at))
    };
    (next - now).to_std().unwrap_or(Duration::ZERO)
}

/// Settles the previous days once shortly after midnight, then every period.
pub struct SettlementScheduler {
    engine: Arc<HabitEngine>,
    at: NaiveTime,
    period: Duration,
    clock: Clock,
}

impl SettlementScheduler {
    pub fn new(engine: Arc<HabitEngine>, at: NaiveTime, period: Duration) -> Self {
        Self {
            engine,
            at,
            period,
            clock: local_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Settle the two calendar days before the clock's current date, as
    /// of now, oldest first.
    ///
    /// At the default 00:01 run time yesterday's small hours are still
    /// running, so windows that close later (an absence rule without a
    /// range closes at the day boundary) are picked up by the next run.
    pub fn run_once(&self) -> Vec<EvaluationSummary> {
        let now = (self.clock)();
        let summaries: Vec<EvaluationSummary> = (1..=SETTLED_DAYS)
            .rev()
            .filter_map(|back| now.date().checked_sub_days(Days::new(back)))
            .map(|day| self.engine.settle_date_as_of(day, now))
            .collect();
        if summaries.is_empty() {
            tracing::warn!(now = %now, "no previous day to settle");
        }
        summaries
    }

    /// Wait for the first run time, then settle once per period until
    /// `shutdown` flips to `true` or its sender is dropped.
    ///
    /// Returns the number of settlements performed.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> usize {
        let delay = delay_until_next((self.clock)(), self.at);
        tracing::info!(
            at = %self.at.format("%H:%M"),
            delay_secs = delay.as_secs(),
            "daily settlement scheduled"
        );

        let start = tokio::time::Instant::now() + delay;
        let mut interval = tokio::time::interval_at(start, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut runs = 0;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let summaries = self.run_once();
                    runs += 1;
                    tracing::debug!(
                        date = ?summaries.last().and_then(|s| s.date),
                        next_in_secs = self.period.as_secs(),
                        "next settlement scheduled"
                    );
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!(runs, "daily settlement stopped");
        runs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::engine::EngineSettings;
    use crate::habit::{presets, HabitDraft, HabitRule, KeywordRule, MatchType};
    use crate::monitor::fixed_clock;
    use crate::storage::MemoryStateStore;
    use crate::timeline::{Task, TimelineSnapshot};

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn one_past_midnight() -> NaiveTime {
        NaiveTime::from_hms_opt(0, 1, 0).unwrap()
    }

    fn engine() -> Arc<HabitEngine> {
        let snapshot = TimelineSnapshot::new(vec![
            Task::new("t1", "Order 外卖").scheduled(at("2026-03-01 12:00"), at("2026-03-01 12:30")),
            Task::new("t2", "Slides").scheduled(at("2026-03-01 20:00"), at("2026-03-01 23:40")),
        ]);
        let engine = HabitEngine::open(Box::new(MemoryStateStore::new()), EngineSettings::default())
            .unwrap()
            .with_provider(Arc::new(snapshot));
        Arc::new(engine)
    }

    #[test]
    fn delay_targets_same_day_when_still_ahead() {
        let delay = delay_until_next(at("2026-03-01 00:00"), one_past_midnight());
        assert_eq!(delay, Duration::from_secs(60));
    }

    #[test]
    fn delay_rolls_over_to_tomorrow() {
        let delay = delay_until_next(at("2026-03-01 00:01"), one_past_midnight());
        assert_eq!(delay, Duration::from_secs(24 * 3600));

        let delay = delay_until_next(at("2026-03-01 18:00"), one_past_midnight());
        assert_eq!(delay, Duration::from_secs(6 * 3600 + 60));
    }

    #[test]
    fn run_once_settles_yesterday() {
        let engine = engine();
        let scheduler = SettlementScheduler::new(engine.clone(), one_past_midnight(), Duration::from_secs(86_400))
            .with_clock(fixed_clock(at("2026-03-02 00:01")));

        let summaries = scheduler.run_once();
        let dates: Vec<_> = summaries.iter().map(|s| s.date).collect();
        assert_eq!(dates, vec![Some(day("2026-02-28")), Some(day("2026-03-01"))]);
        let yesterday = &summaries[1];
        assert_eq!(yesterday.per_habit.get(presets::STAY_UP_LATE), Some(&1));
        assert_eq!(yesterday.per_habit.get(presets::ORDER_TAKEOUT), Some(&1));

        assert!(scheduler.run_once().iter().all(|s| s.increments == 0));
    }

    #[test]
    fn absence_without_range_waits_for_day_boundary() {
        let engine = engine();
        let habit = engine
            .create_habit(HabitDraft {
                name: "No workout".into(),
                emoji: "🏋".into(),
                enabled: true,
                rule: HabitRule::Keyword(KeywordRule {
                    keywords: vec!["workout".into()],
                    match_type: MatchType::Any,
                    time_range: None,
                    should_exist: false,
                    enabled: true,
                }),
            })
            .unwrap();
        let count = |date: &str| {
            engine
                .occurrences_by_date(day(date))
                .iter()
                .find(|o| o.habit_id == habit.id)
                .map_or(0, |o| o.count)
        };

        // 03-01 is still open until 07:00 on 03-02
        SettlementScheduler::new(engine.clone(), one_past_midnight(), Duration::from_secs(86_400))
            .with_clock(fixed_clock(at("2026-03-02 00:01")))
            .run_once();
        assert_eq!(count("2026-03-01"), 0);
        assert_eq!(count("2026-02-28"), 1);

        SettlementScheduler::new(engine.clone(), one_past_midnight(), Duration::from_secs(86_400))
            .with_clock(fixed_clock(at("2026-03-03 00:01")))
            .run_once();
        assert_eq!(count("2026-03-01"), 1);
        assert_eq!(count("2026-02-28"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn run_waits_for_first_slot() {
        let engine = engine();
        let scheduler = SettlementScheduler::new(engine.clone(), one_past_midnight(), Duration::from_secs(3600))
            .with_clock(fixed_clock(at("2026-03-01 23:59")));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(scheduler.run(shutdown_rx));

        // first slot is two minutes out, then one per hour
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(engine.can_data(day("2026-02-28")).total_count, 0);

        tokio::time::sleep(Duration::from_secs(3 * 3600)).await;
        shutdown_tx.send(true).unwrap();

        assert_eq!(handle.await.unwrap(), 3);
        // an empty day misses lunch exactly once, however often it is settled
        assert_eq!(engine.can_data(day("2026-02-28")).total_count, 1);
    }
}
