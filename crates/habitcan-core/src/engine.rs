//! Habit engine façade.
//!
//! Owns the persisted state behind a single mutex. Tasks and counters are
//! gathered from the providers before the lock is taken; evaluation and
//! recording then happen in one critical section so the two drivers can
//! interleave freely without losing or duplicating increments.
//!
//! Persistence is optimistic: every mutation is applied in memory first,
//! then the whole state document is written. A failed write is logged and
//! the in-memory state is kept.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{Local, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::achievements::{Achievement, AchievementDraft, AchievementLog};
use crate::analytics::{
    compile_report, Analytics, CanData, FrequentHabit, HeatmapData, MonthlyReport, Palette,
    ReportArchive, ReportSettings, TrendPoint, WeekDay,
};
use crate::error::{RuleError, StorageError};
use crate::evaluator::{RuleEvaluator, Scope};
use crate::habit::{DeleteOutcome, Habit, HabitCatalog, HabitDraft, HabitPatch, HabitRule, RuleKind};
use crate::ledger::{HabitOccurrence, OccurrenceDetail, OccurrenceLedger, Watermarks};
use crate::sleep_day::{clock_label, DayBoundary};
use crate::storage::{decode_state, encode_state, Config, StateStore};
use crate::timeline::{Detached, TaskTimelineProvider, TaskWindow, TimeoutCounterProvider};

/// Largest count accepted by a single manual record.
pub const MAX_MANUAL_COUNT: u32 = 1000;

/// Everything the engine persists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    #[serde(default)]
    pub habits: HabitCatalog,
    #[serde(default)]
    pub occurrences: OccurrenceLedger,
    #[serde(default)]
    pub watermarks: Watermarks,
    #[serde(default)]
    pub achievements: AchievementLog,
    #[serde(default)]
    pub monthly_reports: ReportArchive,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub boundary: DayBoundary,
    pub palette: Palette,
    pub trend_days: u32,
    pub report: ReportSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            boundary: DayBoundary::default(),
            palette: Palette::default(),
            trend_days: 30,
            report: ReportSettings::default(),
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            boundary: config.boundary(),
            palette: config.palette(),
            trend_days: config.analytics.trend_days,
            report: config.report.clone(),
        }
    }
}

/// Outcome of one realtime poll or settlement run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub date: Option<NaiveDate>,
    /// Rules evaluated.
    pub evaluated: usize,
    /// Occurrences recorded, in total.
    pub increments: usize,
    /// Occurrences recorded per habit id.
    pub per_habit: BTreeMap<String, usize>,
}

pub struct HabitEngine {
    state: Mutex<EngineState>,
    store: Box<dyn StateStore>,
    timeline: Arc<dyn TaskTimelineProvider>,
    counters: Arc<dyn TimeoutCounterProvider>,
    evaluator: RuleEvaluator,
    settings: EngineSettings,
}

impl HabitEngine {
    /// Load state from `store` and (re-)attempt preset seeding.
    ///
    /// Starts without a task timeline, so rule evaluation yields nothing
    /// until one is attached with [`with_provider`](Self::with_provider) or
    /// [`with_timeline`](Self::with_timeline).
    ///
    /// # Errors
    /// Fails if the stored document cannot be read or decoded. Nothing is
    /// overwritten in that case.
    pub fn open(store: Box<dyn StateStore>, settings: EngineSettings) -> Result<Self, StorageError> {
        let mut state = match store.load()? {
            Some(raw) => decode_state(&raw)?,
            None => EngineState::default(),
        };
        tracing::info!(
            habits = state.habits.len(),
            occurrences = state.occurrences.len(),
            "habit state loaded"
        );
        let seeded = state.habits.initialize_presets(Utc::now());

        let engine = Self {
            state: Mutex::new(state),
            store,
            timeline: Arc::new(Detached),
            counters: Arc::new(Detached),
            evaluator: RuleEvaluator::new(settings.boundary),
            settings,
        };
        if seeded {
            engine.persist(&engine.lock());
        }
        Ok(engine)
    }

    /// Use one object as both task timeline and counter source.
    pub fn with_provider<P>(self, provider: Arc<P>) -> Self
    where
        P: TaskTimelineProvider + TimeoutCounterProvider + 'static,
    {
        let timeline: Arc<dyn TaskTimelineProvider> = provider.clone();
        let counters: Arc<dyn TimeoutCounterProvider> = provider;
        self.with_timeline(timeline, counters)
    }

    pub fn with_timeline(
        mut self,
        timeline: Arc<dyn TaskTimelineProvider>,
        counters: Arc<dyn TimeoutCounterProvider>,
    ) -> Self {
        self.timeline = timeline;
        self.counters = counters;
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn boundary(&self) -> DayBoundary {
        self.settings.boundary
    }

    /// Current sleep-day by local wall clock.
    pub fn today(&self) -> NaiveDate {
        self.settings.boundary.resolve(Local::now().naive_local())
    }

    /// Copy of the full state, for inspection and export.
    pub fn snapshot(&self) -> EngineState {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, state: &EngineState) {
        let result = encode_state(state).and_then(|doc| self.store.save(&doc));
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to persist habit state, keeping in-memory changes");
        }
    }

    // Habits

    pub fn list_habits(&self) -> Vec<Habit> {
        self.lock().habits.iter().cloned().collect()
    }

    pub fn get_habit(&self, id: &str) -> Option<Habit> {
        self.lock().habits.get(id).cloned()
    }

    /// # Errors
    /// Rejects a malformed rule definition.
    pub fn create_habit(&self, draft: HabitDraft) -> Result<Habit, RuleError> {
        draft.rule.validate()?;
        let mut state = self.lock();
        let habit = state.habits.create(draft, Utc::now());
        tracing::info!(habit_id = %habit.id, name = %habit.name, "habit created");
        self.persist(&state);
        Ok(habit)
    }

    /// `Ok(None)` if no habit has that id.
    pub fn update_habit(&self, id: &str, patch: HabitPatch) -> Result<Option<Habit>, RuleError> {
        if let Some(rule) = &patch.rule {
            rule.validate()?;
        }
        let mut state = self.lock();
        let updated = state.habits.update(id, patch, Utc::now());
        match &updated {
            Some(_) => {
                tracing::info!(habit_id = id, "habit updated");
                self.persist(&state);
            }
            None => tracing::warn!(habit_id = id, "update of unknown habit ignored"),
        }
        Ok(updated)
    }

    /// Delete a user habit together with its occurrences and watermarks.
    ///
    /// Presets are rejected with a warning and left untouched.
    pub fn delete_habit(&self, id: &str) -> DeleteOutcome {
        let mut guard = self.lock();
        let state = &mut *guard;
        let outcome = state.habits.delete(id);
        match outcome {
            DeleteOutcome::Deleted => {
                let occurrences = state.occurrences.remove_habit(id);
                state.watermarks.remove_habit(id);
                tracing::info!(habit_id = id, occurrences, "habit deleted");
                self.persist(state);
            }
            DeleteOutcome::RejectedPreset => {
                tracing::warn!(habit_id = id, "preset habits cannot be deleted, only disabled");
            }
            DeleteOutcome::NotFound => {
                tracing::warn!(habit_id = id, "delete of unknown habit ignored");
            }
        }
        outcome
    }

    pub fn toggle_habit(&self, id: &str, enabled: bool) -> Option<Habit> {
        let mut state = self.lock();
        let patch = HabitPatch {
            enabled: Some(enabled),
            ..HabitPatch::default()
        };
        let updated = state.habits.update(id, patch, Utc::now());
        if updated.is_some() {
            tracing::info!(habit_id = id, enabled, "habit toggled");
            self.persist(&state);
        }
        updated
    }

    // Occurrences

    /// Append one automatically detected occurrence.
    pub fn record_occurrence(
        &self,
        habit_id: &str,
        date: NaiveDate,
        detail: OccurrenceDetail,
    ) -> Option<HabitOccurrence> {
        let mut state = self.lock();
        if !state.habits.contains(habit_id) {
            tracing::warn!(habit_id, date = %date, "occurrence for unknown habit ignored");
            return None;
        }
        let occ = state.occurrences.record(habit_id, date, detail).clone();
        tracing::info!(habit_id, date = %date, count = occ.count, "occurrence recorded");
        self.persist(&state);
        Some(occ)
    }

    /// Record `count` manual occurrences with a free-text reason.
    ///
    /// `count` must be between 1 and [`MAX_MANUAL_COUNT`].
    pub fn record_manual_occurrence(
        &self,
        habit_id: &str,
        date: NaiveDate,
        count: u32,
        reason: &str,
    ) -> Option<HabitOccurrence> {
        if count == 0 {
            tracing::warn!(habit_id, "manual occurrence with zero count ignored");
            return None;
        }
        if count > MAX_MANUAL_COUNT {
            tracing::warn!(habit_id, count, max = MAX_MANUAL_COUNT, "manual occurrence count too large, ignored");
            return None;
        }
        let mut state = self.lock();
        if !state.habits.contains(habit_id) {
            tracing::warn!(habit_id, date = %date, "manual occurrence for unknown habit ignored");
            return None;
        }
        let detail = OccurrenceDetail::new(clock_label(Local::now().naive_local()), reason);
        let details = vec![detail; count as usize];
        let occ = state.occurrences.record_many(habit_id, date, details, true).clone();
        tracing::info!(habit_id, date = %date, added = count, count = occ.count, "manual occurrence recorded");
        self.persist(&state);
        Some(occ)
    }

    pub fn delete_occurrence(&self, habit_id: &str, date: NaiveDate) -> bool {
        let mut state = self.lock();
        let removed = state.occurrences.delete(habit_id, date);
        if removed {
            tracing::info!(habit_id, date = %date, "occurrence deleted");
            self.persist(&state);
        }
        removed
    }

    pub fn occurrences_by_date(&self, date: NaiveDate) -> Vec<HabitOccurrence> {
        self.lock().occurrences.by_date(date).into_iter().cloned().collect()
    }

    pub fn occurrences_by_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<HabitOccurrence> {
        self.lock()
            .occurrences
            .by_range(start, end)
            .into_iter()
            .cloned()
            .collect()
    }

    // Analytics

    fn with_analytics<T>(&self, f: impl FnOnce(&Analytics<'_>) -> T) -> T {
        let state = self.lock();
        f(&Analytics::new(&state.habits, &state.occurrences))
    }

    pub fn can_data(&self, date: NaiveDate) -> CanData {
        self.with_analytics(|a| a.can_data(date))
    }

    pub fn month_can_data(&self, year: i32, month: u32) -> Vec<CanData> {
        self.with_analytics(|a| a.month_can_data(year, month))
    }

    pub fn most_frequent_habit(&self, start: NaiveDate, end: NaiveDate) -> Option<FrequentHabit> {
        self.with_analytics(|a| a.most_frequent(start, end))
    }

    pub fn week_view(&self, end: NaiveDate) -> Vec<WeekDay> {
        self.with_analytics(|a| a.week_view(end))
    }

    /// Trend ending at `end`, over `days` or the configured window, capped
    /// at [`MAX_TREND_DAYS`](crate::analytics::MAX_TREND_DAYS).
    pub fn trend(&self, end: NaiveDate, days: Option<u32>) -> Vec<TrendPoint> {
        let days = days.unwrap_or(self.settings.trend_days);
        self.with_analytics(|a| a.trend(end, days, &self.settings.palette))
    }

    pub fn heatmap(&self, habit_id: &str, year: i32, month: u32) -> Option<HeatmapData> {
        self.with_analytics(|a| a.heatmap(habit_id, year, month))
    }

    // Reports and achievements

    /// Build, store and return the report for `(year, month)`.
    ///
    /// Unlocks qualifying achievements; regenerating a report does not
    /// unlock the same achievement twice.
    pub fn generate_monthly_report(&self, year: i32, month: u32) -> Option<MonthlyReport> {
        let now = Utc::now();
        let mut guard = self.lock();
        let state = &mut *guard;

        let compiled = compile_report(
            &Analytics::new(&state.habits, &state.occurrences),
            year,
            month,
            &self.settings.report,
            now,
        );
        let Some(compiled) = compiled else {
            tracing::warn!(year, month, "invalid report month");
            return None;
        };

        for draft in compiled.unlocks {
            state.achievements.unlock_once(draft, now);
        }
        let mut report = compiled.report;
        report.achievements = state.achievements.in_month(year, month);
        state.monthly_reports.replace(report.clone());

        tracing::info!(year, month, total = report.total_count, "monthly report generated");
        self.persist(state);
        Some(report)
    }

    pub fn monthly_report(&self, year: i32, month: u32) -> Option<MonthlyReport> {
        self.lock().monthly_reports.get(year, month).cloned()
    }

    pub fn unlock_achievement(&self, draft: AchievementDraft) -> Achievement {
        let mut state = self.lock();
        let achievement = state.achievements.unlock(draft, Utc::now());
        self.persist(&state);
        achievement
    }

    pub fn achievements_by_date(&self, date: NaiveDate) -> Vec<Achievement> {
        self.lock().achievements.by_date(date).into_iter().cloned().collect()
    }

    pub fn achievements(&self) -> Vec<Achievement> {
        self.lock().achievements.iter().cloned().collect()
    }

    // Drivers

    /// Evaluate every active rule against the open sleep-day at `now`.
    pub fn run_realtime(&self, now: NaiveDateTime) -> EvaluationSummary {
        self.evaluate(Scope::Realtime { now }, |_| true)
    }

    /// Evaluate only rules of the given kinds against the open sleep-day.
    pub fn run_realtime_for(&self, now: NaiveDateTime, kinds: &[RuleKind]) -> EvaluationSummary {
        self.evaluate(Scope::Realtime { now }, |k| kinds.contains(&k))
    }

    /// Re-evaluate threshold and keyword rules over a closed sleep-day.
    ///
    /// Safe to repeat for any past date: already-recorded violations are
    /// not emitted again.
    pub fn settle_date(&self, day: NaiveDate) -> EvaluationSummary {
        self.settle(Scope::settlement(day))
    }

    /// Like [`settle_date`](Self::settle_date), but only judges what had
    /// happened by `now`. Absence windows still open are left alone.
    pub fn settle_date_as_of(&self, day: NaiveDate, now: NaiveDateTime) -> EvaluationSummary {
        self.settle(Scope::settlement_as_of(day, now))
    }

    fn settle(&self, scope: Scope) -> EvaluationSummary {
        let day = scope.day(self.settings.boundary);
        tracing::info!(date = %day, as_of = ?scope.now(), "settlement started");
        let summary = self.evaluate(scope, |_| true);
        tracing::info!(date = %day, increments = summary.increments, "settlement finished");
        summary
    }

    fn evaluate(&self, scope: Scope, include: impl Fn(RuleKind) -> bool) -> EvaluationSummary {
        let day = scope.day(self.settings.boundary);
        let window = TaskWindow::collect(
            self.timeline.as_ref(),
            self.counters.as_ref(),
            self.settings.boundary,
            day,
        );

        let mut guard = self.lock();
        let state = &mut *guard;
        let rules: Vec<(String, HabitRule)> = state
            .habits
            .active()
            .filter(|h| include(h.rule.kind()) && scope.evaluates(h.rule.kind()))
            .map(|h| (h.id.clone(), h.rule.clone()))
            .collect();

        let mut summary = EvaluationSummary {
            date: Some(day),
            ..EvaluationSummary::default()
        };
        let revision = state.watermarks.revision();

        for (habit_id, rule) in &rules {
            let increments =
                self.evaluator
                    .evaluate(habit_id, rule, scope, &window, &mut state.watermarks);
            summary.evaluated += 1;

            for inc in increments {
                let occ = state.occurrences.record(&inc.habit_id, inc.date, inc.detail);
                tracing::info!(habit_id = %inc.habit_id, date = %inc.date, count = occ.count, "occurrence recorded");
                summary.increments += 1;
                *summary.per_habit.entry(inc.habit_id).or_insert(0) += 1;
            }
        }

        if summary.increments > 0 || state.watermarks.revision() != revision {
            self.persist(state);
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::presets;
    use crate::storage::MemoryStateStore;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn engine() -> HabitEngine {
        HabitEngine::open(Box::new(MemoryStateStore::new()), EngineSettings::default()).unwrap()
    }

    #[test]
    fn open_seeds_presets_once() {
        let e = engine();
        assert_eq!(e.list_habits().len(), 6);
        assert!(e.list_habits().iter().all(|h| h.is_preset));
    }

    #[test]
    fn deleting_preset_is_rejected() {
        let e = engine();
        assert_eq!(e.delete_habit(presets::STAY_UP_LATE), DeleteOutcome::RejectedPreset);
        assert!(e.get_habit(presets::STAY_UP_LATE).is_some());
        assert_eq!(e.delete_habit("nope"), DeleteOutcome::NotFound);
    }

    #[test]
    fn deleting_user_habit_drops_its_occurrences() {
        let e = engine();
        let habit = e
            .create_habit(HabitDraft {
                name: "Doomscrolling".into(),
                emoji: "📱".into(),
                enabled: true,
                rule: HabitRule::Manual { enabled: true },
            })
            .unwrap();
        e.record_manual_occurrence(&habit.id, day("2026-03-01"), 2, "phone in bed").unwrap();
        assert_eq!(e.delete_habit(&habit.id), DeleteOutcome::Deleted);
        assert!(e.occurrences_by_date(day("2026-03-01")).is_empty());
    }

    #[test]
    fn create_rejects_malformed_rule() {
        let e = engine();
        let draft = HabitDraft {
            name: "Broken".into(),
            emoji: "💥".into(),
            enabled: true,
            rule: HabitRule::TimeThreshold(crate::habit::TimeThresholdRule {
                time: "25:99".into(),
                comparison: crate::habit::Comparison::After,
                check_type: crate::habit::CheckType::LastEvent,
                enabled: true,
            }),
        };
        assert!(e.create_habit(draft).is_err());
        assert_eq!(e.list_habits().len(), 6);
    }

    #[test]
    fn manual_occurrence_appends_count_details() {
        let e = engine();
        let occ = e
            .record_manual_occurrence(presets::ORDER_TAKEOUT, day("2026-03-01"), 3, "noodles")
            .unwrap();
        assert_eq!(occ.count, 3);
        assert_eq!(occ.details.len(), 3);
        assert!(occ.is_manual);
        assert!(e.record_manual_occurrence(presets::ORDER_TAKEOUT, day("2026-03-01"), 0, "x").is_none());
        assert!(e.record_manual_occurrence("ghost", day("2026-03-01"), 1, "x").is_none());
    }

    #[test]
    fn manual_count_above_limit_is_ignored() {
        let e = engine();
        let date = day("2026-03-01");
        assert!(e.record_manual_occurrence(presets::ORDER_TAKEOUT, date, MAX_MANUAL_COUNT + 1, "x").is_none());
        assert!(e.record_manual_occurrence(presets::ORDER_TAKEOUT, date, 4_000_000_000, "x").is_none());
        assert_eq!(e.can_data(date).total_count, 0);

        let occ = e
            .record_manual_occurrence(presets::ORDER_TAKEOUT, date, MAX_MANUAL_COUNT, "x")
            .unwrap();
        assert_eq!(occ.count, MAX_MANUAL_COUNT);
    }

    #[test]
    fn oversized_trend_is_capped() {
        let e = engine();
        let trend = e.trend(day("2026-03-01"), Some(200_000_000));
        assert_eq!(trend.len(), crate::analytics::MAX_TREND_DAYS as usize);
        assert_eq!(e.trend(day("2026-03-01"), None).len(), 30);
    }

    #[test]
    fn engine_without_timeline_evaluates_nothing() {
        let e = engine();
        let settled = e.settle_date(day("2026-03-01"));
        assert_eq!(settled.increments, 0);
        let live = e.run_realtime(chrono::NaiveDate::from_ymd_opt(2026, 3, 2).unwrap().and_hms_opt(14, 0, 0).unwrap());
        assert_eq!(live.increments, 0);
        assert!(e.lock().watermarks.is_empty());
    }

    #[test]
    fn toggle_persists_through_store() {
        let store = Arc::new(MemoryStateStore::new());
        struct Shared(Arc<MemoryStateStore>);
        impl StateStore for Shared {
            fn load(&self) -> Result<Option<String>, StorageError> {
                self.0.load()
            }
            fn save(&self, document: &str) -> Result<(), StorageError> {
                self.0.save(document)
            }
        }

        let e = HabitEngine::open(Box::new(Shared(store.clone())), EngineSettings::default()).unwrap();
        e.toggle_habit(presets::SKIP_LUNCH, false).unwrap();

        let reopened = HabitEngine::open(Box::new(Shared(store)), EngineSettings::default()).unwrap();
        assert!(!reopened.get_habit(presets::SKIP_LUNCH).unwrap().enabled);
        assert_eq!(reopened.list_habits().len(), 6);
    }

    #[test]
    fn failed_persistence_keeps_memory_state() {
        let e = HabitEngine::open(Box::new(MemoryStateStore::read_only()), EngineSettings::default()).unwrap();
        e.record_manual_occurrence(presets::SKIP_LUNCH, day("2026-03-01"), 1, "busy").unwrap();
        assert_eq!(e.can_data(day("2026-03-01")).total_count, 1);
    }

    #[test]
    fn corrupt_document_is_not_overwritten() {
        let store = MemoryStateStore::with_document("{broken");
        assert!(HabitEngine::open(Box::new(store), EngineSettings::default()).is_err());
    }
}
