//! Monthly report generation.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{days_between, month_bounds, previous_month, Analytics};
use crate::achievements::{Achievement, AchievementDraft, AchievementKind};
use crate::habit::{presets, HabitRule};

/// Thresholds used while compiling a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Shortest run of zero-occurrence days reported as a clean streak.
    pub streak_min_days: u32,
    /// Streak length that unlocks a clean-streak achievement.
    pub achievement_streak_days: u32,
    /// Month-over-month change (percent) below which an improvement
    /// achievement unlocks.
    pub improvement_achievement_percent: f64,
    /// Band (percent) inside which a change is described as flat.
    pub change_threshold_percent: f64,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            streak_min_days: 3,
            achievement_streak_days: 7,
            improvement_achievement_percent: -50.0,
            change_threshold_percent: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopHabit {
    pub habit_id: String,
    pub habit_name: String,
    pub emoji: String,
    pub count: u32,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Improvement {
    pub habit_id: String,
    pub habit_name: String,
    pub emoji: String,
    pub change_percentage: f64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanStreak {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReport {
    pub year: i32,
    pub month: u32,
    pub generated_at: DateTime<Utc>,
    pub total_count: u32,
    pub top_habits: Vec<TopHabit>,
    pub improvements: Vec<Improvement>,
    pub clean_streaks: Vec<CleanStreak>,
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub achievements: Vec<Achievement>,
}

/// A report plus the achievements its numbers qualify for.
///
/// The report's `achievements` list is left empty; the caller fills it in
/// after unlocking.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledReport {
    pub report: MonthlyReport,
    pub unlocks: Vec<AchievementDraft>,
}

/// Maximal runs of zero-total days, oldest first.
pub fn find_clean_streaks(days: &[(NaiveDate, u32)], min_days: u32) -> Vec<CleanStreak> {
    let mut streaks = Vec::new();
    let mut current: Option<(NaiveDate, NaiveDate, u32)> = None;

    for &(date, total) in days {
        if total == 0 {
            current = match current {
                Some((start, _, n)) => Some((start, date, n + 1)),
                None => Some((date, date, 1)),
            };
            continue;
        }
        if let Some((start_date, end_date, days)) = current.take() {
            if days >= min_days {
                streaks.push(CleanStreak { start_date, end_date, days });
            }
        }
    }
    if let Some((start_date, end_date, days)) = current {
        if days >= min_days {
            streaks.push(CleanStreak { start_date, end_date, days });
        }
    }
    streaks
}

/// Percent change from `previous` to `current`.
///
/// A habit absent last month counts as +100% if it shows up now, else 0%.
pub fn change_percentage(current: u32, previous: u32) -> f64 {
    if previous > 0 {
        (f64::from(current) - f64::from(previous)) / f64::from(previous) * 100.0
    } else if current > 0 {
        100.0
    } else {
        0.0
    }
}

fn describe_change(change: f64, threshold: f64) -> String {
    if change < -threshold {
        format!("down {:.0}% from last month, clear progress", change.abs())
    } else if change > threshold {
        format!("up {change:.0}% from last month, needs attention")
    } else {
        "flat compared to last month".to_string()
    }
}

fn suggestions(analytics: &Analytics<'_>, top: &[TopHabit]) -> Vec<String> {
    let mut out = Vec::new();
    for entry in top {
        let Some(habit) = analytics.habits().get(&entry.habit_id) else {
            continue;
        };
        let text = match habit.id.as_str() {
            presets::PROCRASTINATION if entry.count > 10 => {
                "Break big tasks into 25-minute units to lower the start barrier".to_string()
            }
            presets::STAY_UP_LATE if entry.count > 5 => {
                let time = match &habit.rule {
                    HabitRule::TimeThreshold(r) => r.time.as_str(),
                    _ => "23:00",
                };
                format!("Hold the late-night threshold at {time} and set a bedtime reminder")
            }
            presets::WAKE_UP_LATE if entry.count > 5 => {
                "Set a morning alarm and schedule an early task to get going".to_string()
            }
            presets::LOW_EFFICIENCY if entry.count > 8 => {
                "Work in pomodoros: 25 minutes on, 5 minutes off".to_string()
            }
            _ => continue,
        };
        out.push(text);
    }
    if out.is_empty() {
        out.push("Keep up the good habits!".to_string());
    }
    out
}

/// Build the report for `(year, month)`. `None` for an invalid month.
pub fn compile_report(
    analytics: &Analytics<'_>,
    year: i32,
    month: u32,
    settings: &ReportSettings,
    now: DateTime<Utc>,
) -> Option<CompiledReport> {
    let (first, last) = month_bounds(year, month)?;
    let ledger = analytics.ledger();
    let habits = analytics.habits();

    let totals = ledger.totals_by_habit(first, last);
    let total_count: u32 = totals.values().sum();

    let mut ranked: Vec<(&String, u32)> = totals.iter().map(|(id, c)| (id, *c)).collect();
    ranked.sort_by(|(a_id, a), (b_id, b)| {
        b.cmp(a)
            .then_with(|| match (habits.position(a_id), habits.position(b_id)) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
            .then_with(|| a_id.cmp(b_id))
    });

    let top_habits: Vec<TopHabit> = ranked
        .into_iter()
        .take(3)
        .map(|(habit_id, count)| {
            let (habit_name, emoji) = analytics.label(habit_id);
            TopHabit {
                habit_id: habit_id.clone(),
                habit_name,
                emoji,
                count,
                percentage: if total_count > 0 {
                    f64::from(count) / f64::from(total_count) * 100.0
                } else {
                    0.0
                },
            }
        })
        .collect();

    let (prev_year, prev_month) = previous_month(year, month);
    let prev_totals = month_bounds(prev_year, prev_month)
        .map(|(s, e)| ledger.totals_by_habit(s, e))
        .unwrap_or_default();

    let improvements: Vec<Improvement> = top_habits
        .iter()
        .map(|top| {
            let previous = prev_totals.get(&top.habit_id).copied().unwrap_or(0);
            let change = change_percentage(top.count, previous);
            Improvement {
                habit_id: top.habit_id.clone(),
                habit_name: top.habit_name.clone(),
                emoji: top.emoji.clone(),
                change_percentage: change,
                description: describe_change(change, settings.change_threshold_percent),
            }
        })
        .collect();

    let daily: Vec<(NaiveDate, u32)> = days_between(first, last)
        .map(|d| (d, ledger.day_total(d)))
        .collect();
    let clean_streaks = find_clean_streaks(&daily, settings.streak_min_days);

    let mut unlocks = Vec::new();
    for streak in &clean_streaks {
        if streak.days >= settings.achievement_streak_days {
            unlocks.push(AchievementDraft {
                kind: AchievementKind::CleanStreak,
                title: format!("{} days without bad habits", streak.days),
                description: format!("from {} to {}", streak.start_date, streak.end_date),
                emoji: "🏆".to_string(),
                date: Some(streak.end_date),
            });
        }
    }
    for imp in &improvements {
        if imp.change_percentage < settings.improvement_achievement_percent {
            unlocks.push(AchievementDraft {
                kind: AchievementKind::Improvement,
                title: format!("{} improved significantly", imp.habit_name),
                description: format!("{} down {:.0}%", imp.emoji, imp.change_percentage.abs()),
                emoji: "🎉".to_string(),
                date: Some(last),
            });
        }
    }

    let suggestions = suggestions(analytics, &top_habits);

    Some(CompiledReport {
        report: MonthlyReport {
            year,
            month,
            generated_at: now,
            total_count,
            top_habits,
            improvements,
            clean_streaks,
            suggestions,
            achievements: Vec::new(),
        },
        unlocks,
    })
}

/// Stored reports, one per `(year, month)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportArchive {
    reports: Vec<MonthlyReport>,
}

impl ReportArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `report`, replacing any earlier one for the same month.
    pub fn replace(&mut self, report: MonthlyReport) {
        self.reports
            .retain(|r| !(r.year == report.year && r.month == report.month));
        self.reports.push(report);
    }

    pub fn get(&self, year: i32, month: u32) -> Option<&MonthlyReport> {
        self.reports.iter().find(|r| r.year == year && r.month == month)
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::HabitCatalog;
    use crate::ledger::{OccurrenceDetail, OccurrenceLedger};

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn record(ledger: &mut OccurrenceLedger, habit_id: &str, date: &str, n: usize) {
        ledger.record_many(habit_id, day(date), vec![OccurrenceDetail::new("10:00", "t"); n], true);
    }

    fn catalog() -> HabitCatalog {
        let mut habits = HabitCatalog::new();
        habits.initialize_presets(Utc::now());
        habits
    }

    #[test]
    fn clean_streak_scenario() {
        let totals = [0, 0, 0, 5, 0, 0, 0, 0, 2];
        let days: Vec<(NaiveDate, u32)> = totals
            .iter()
            .enumerate()
            .map(|(i, t)| (NaiveDate::from_ymd_opt(2026, 3, i as u32 + 1).unwrap(), *t))
            .collect();

        let streaks = find_clean_streaks(&days, 3);
        assert_eq!(
            streaks[0],
            CleanStreak { start_date: day("2026-03-01"), end_date: day("2026-03-03"), days: 3 }
        );
        // Day 4 breaks the run; days 5-8 are a separate maximal run.
        assert_eq!(streaks.len(), 2);
        assert_eq!(streaks[1].start_date, day("2026-03-05"));
        assert_eq!(streaks[1].days, 4);

        let short = [(day("2026-03-01"), 0), (day("2026-03-02"), 0), (day("2026-03-03"), 4)];
        assert!(find_clean_streaks(&short, 3).is_empty());
    }

    #[test]
    fn trailing_streak_is_closed_at_month_end() {
        let days: Vec<(NaiveDate, u32)> = (1..=5)
            .map(|d| (NaiveDate::from_ymd_opt(2026, 3, d).unwrap(), if d == 1 { 2 } else { 0 }))
            .collect();
        let streaks = find_clean_streaks(&days, 3);
        assert_eq!(streaks.len(), 1);
        assert_eq!(streaks[0].start_date, day("2026-03-02"));
        assert_eq!(streaks[0].end_date, day("2026-03-05"));
        assert_eq!(streaks[0].days, 4);
    }

    #[test]
    fn change_percentage_cases() {
        assert_eq!(change_percentage(5, 10), -50.0);
        assert_eq!(change_percentage(15, 10), 50.0);
        assert_eq!(change_percentage(3, 0), 100.0);
        assert_eq!(change_percentage(0, 0), 0.0);
        assert_eq!(describe_change(-20.0, 10.0), "down 20% from last month, clear progress");
        assert_eq!(describe_change(10.0, 10.0), "flat compared to last month");
    }

    #[test]
    fn top_habits_and_percentages() {
        let habits = catalog();
        let mut ledger = OccurrenceLedger::new();
        record(&mut ledger, "preset-procrastination", "2026-03-02", 6);
        record(&mut ledger, "preset-procrastination", "2026-03-10", 6);
        record(&mut ledger, "preset-stay-up-late", "2026-03-03", 6);
        record(&mut ledger, "preset-wake-up-late", "2026-03-04", 2);
        record(&mut ledger, "preset-skip-lunch", "2026-03-05", 2);
        record(&mut ledger, "preset-procrastination", "2026-02-10", 24);

        let analytics = Analytics::new(&habits, &ledger);
        let compiled = compile_report(&analytics, 2026, 3, &ReportSettings::default(), Utc::now()).unwrap();
        let report = &compiled.report;

        assert_eq!(report.total_count, 22);
        let ids: Vec<_> = report.top_habits.iter().map(|t| t.habit_id.as_str()).collect();
        // Tie on 2 broken by catalog order: wake-up-late precedes skip-lunch.
        assert_eq!(ids, vec!["preset-procrastination", "preset-stay-up-late", "preset-wake-up-late"]);
        assert!((report.top_habits[0].percentage - 12.0 / 22.0 * 100.0).abs() < 1e-9);

        assert_eq!(report.improvements[0].change_percentage, -50.0);
        assert_eq!(report.improvements[1].change_percentage, 100.0);

        assert!(report.suggestions.iter().any(|s| s.contains("25-minute")));
        assert!(report.suggestions.iter().any(|s| s.contains("23:00")));
        // -50% sits exactly on the threshold and does not qualify.
        assert!(compiled.unlocks.iter().all(|u| u.kind == AchievementKind::CleanStreak));
    }

    #[test]
    fn quiet_month_unlocks_streak_and_suggests_encouragement() {
        let habits = catalog();
        let mut ledger = OccurrenceLedger::new();
        record(&mut ledger, "preset-skip-lunch", "2026-03-01", 1);
        record(&mut ledger, "preset-skip-lunch", "2026-02-01", 10);

        let analytics = Analytics::new(&habits, &ledger);
        let compiled = compile_report(&analytics, 2026, 3, &ReportSettings::default(), Utc::now()).unwrap();

        assert_eq!(compiled.report.clean_streaks.len(), 1);
        assert_eq!(compiled.report.clean_streaks[0].days, 30);
        assert_eq!(compiled.report.suggestions, vec!["Keep up the good habits!".to_string()]);

        let kinds: Vec<_> = compiled.unlocks.iter().map(|u| u.kind).collect();
        assert_eq!(kinds, vec![AchievementKind::CleanStreak, AchievementKind::Improvement]);
        assert_eq!(compiled.unlocks[0].date, Some(day("2026-03-31")));
        assert_eq!(compiled.unlocks[1].date, Some(day("2026-03-31")));
    }

    #[test]
    fn report_is_deterministic() {
        let habits = catalog();
        let mut ledger = OccurrenceLedger::new();
        for (i, id) in ["preset-stay-up-late", "preset-wake-up-late", "preset-skip-lunch", "preset-order-takeout"]
            .iter()
            .enumerate()
        {
            record(&mut ledger, id, "2026-03-15", 3);
            record(&mut ledger, id, "2026-02-15", i + 1);
        }
        let analytics = Analytics::new(&habits, &ledger);
        let settings = ReportSettings::default();
        let a = compile_report(&analytics, 2026, 3, &settings, Utc::now()).unwrap().report;
        let b = compile_report(&analytics, 2026, 3, &settings, Utc::now()).unwrap().report;
        assert_eq!(serde_json::to_string(&a.top_habits).unwrap(), serde_json::to_string(&b.top_habits).unwrap());
        assert_eq!(serde_json::to_string(&a.improvements).unwrap(), serde_json::to_string(&b.improvements).unwrap());
        assert_eq!(a.clean_streaks, b.clean_streaks);
    }

    #[test]
    fn archive_replaces_same_month() {
        let habits = catalog();
        let ledger = OccurrenceLedger::new();
        let analytics = Analytics::new(&habits, &ledger);
        let settings = ReportSettings::default();
        let mut archive = ReportArchive::new();

        archive.replace(compile_report(&analytics, 2026, 3, &settings, Utc::now()).unwrap().report);
        archive.replace(compile_report(&analytics, 2026, 3, &settings, Utc::now()).unwrap().report);
        archive.replace(compile_report(&analytics, 2026, 4, &settings, Utc::now()).unwrap().report);
        assert_eq!(archive.len(), 2);
        assert!(archive.get(2026, 3).is_some());
        assert!(archive.get(2026, 5).is_none());
    }
}
