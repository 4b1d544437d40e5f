//! Analytics engine.
//!
//! Read-only views derived from the habit catalog and the occurrence
//! ledger: day aggregates ("cans"), week views, trends, per-habit heatmaps
//! and the monthly report.

mod report;

pub use report::{
    compile_report, find_clean_streaks, CleanStreak, CompiledReport, Improvement, MonthlyReport,
    ReportArchive, ReportSettings, TopHabit,
};

use chrono::{Days, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::habit::{Habit, HabitCatalog};
use crate::ledger::OccurrenceLedger;

/// Longest trend window served.
pub const MAX_TREND_DAYS: u32 = 366;

const UNKNOWN_NAME: &str = "Unknown";
const UNKNOWN_EMOJI: &str = "❓";

/// Colour band for a day's total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorLevel {
    Green,
    Yellow,
    Orange,
    Red,
}

impl ColorLevel {
    pub fn from_total(total: u32) -> Self {
        match total {
            0 => ColorLevel::Green,
            1..=10 => ColorLevel::Yellow,
            11..=20 => ColorLevel::Orange,
            _ => ColorLevel::Red,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitCount {
    pub habit_id: String,
    pub habit_name: String,
    pub emoji: String,
    pub count: u32,
}

/// Day aggregate across all habits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanData {
    pub date: NaiveDate,
    pub total_count: u32,
    pub habits: Vec<HabitCount>,
    pub color_level: ColorLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekDay {
    pub date: NaiveDate,
    pub total_count: u32,
    /// Total minus the previous day's total.
    pub change: i64,
    pub top_habits: Vec<HabitCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendHabitCount {
    pub habit_id: String,
    pub habit_name: String,
    pub emoji: String,
    pub count: u32,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub habit_counts: Vec<TrendHabitCount>,
    pub total_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapDay {
    pub date: NaiveDate,
    pub count: u32,
    /// `count / max_count_in_month`, 0 for an empty month.
    pub intensity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapData {
    pub habit_id: String,
    pub habit_name: String,
    pub emoji: String,
    pub daily_data: Vec<HeatmapDay>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequentHabit {
    pub habit: Habit,
    pub count: u32,
}

/// Colour assignment for trend series, by catalog position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub colors: Vec<String>,
    pub fallback: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: ["#ef4444", "#f59e0b", "#10b981", "#3b82f6", "#8b5cf6", "#ec4899"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            fallback: "#6b7280".to_string(),
        }
    }
}

impl Palette {
    pub fn color_at(&self, position: Option<usize>) -> &str {
        match position {
            Some(i) if !self.colors.is_empty() => &self.colors[i % self.colors.len()],
            _ => &self.fallback,
        }
    }
}

/// First and last day of a calendar month, `None` for an invalid month.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next - Duration::days(1)))
}

pub fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month <= 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

pub(crate) fn days_between(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

/// Borrowed view over catalog and ledger.
pub struct Analytics<'a> {
    habits: &'a HabitCatalog,
    ledger: &'a OccurrenceLedger,
}

impl<'a> Analytics<'a> {
    pub fn new(habits: &'a HabitCatalog, ledger: &'a OccurrenceLedger) -> Self {
        Self { habits, ledger }
    }

    pub fn habits(&self) -> &'a HabitCatalog {
        self.habits
    }

    pub fn ledger(&self) -> &'a OccurrenceLedger {
        self.ledger
    }

    pub(crate) fn label(&self, habit_id: &str) -> (String, String) {
        match self.habits.get(habit_id) {
            Some(h) => (h.name.clone(), h.emoji.clone()),
            None => (UNKNOWN_NAME.to_string(), UNKNOWN_EMOJI.to_string()),
        }
    }

    pub fn can_data(&self, date: NaiveDate) -> CanData {
        let habits: Vec<HabitCount> = self
            .ledger
            .by_date(date)
            .into_iter()
            .map(|occ| {
                let (habit_name, emoji) = self.label(&occ.habit_id);
                HabitCount {
                    habit_id: occ.habit_id.clone(),
                    habit_name,
                    emoji,
                    count: occ.count,
                }
            })
            .collect();
        let total_count = habits.iter().map(|h| h.count).sum();
        CanData {
            date,
            total_count,
            habits,
            color_level: ColorLevel::from_total(total_count),
        }
    }

    pub fn month_can_data(&self, year: i32, month: u32) -> Vec<CanData> {
        let Some((first, last)) = month_bounds(year, month) else {
            return Vec::new();
        };
        days_between(first, last).map(|d| self.can_data(d)).collect()
    }

    /// Seven days ending at `end`, oldest first.
    pub fn week_view(&self, end: NaiveDate) -> Vec<WeekDay> {
        (0..7)
            .rev()
            .map(|offset| {
                let date = end - Duration::days(offset);
                let can = self.can_data(date);
                let previous = self.ledger.day_total(date - Duration::days(1));

                let mut top_habits = can.habits;
                top_habits.sort_by(|a, b| b.count.cmp(&a.count));
                top_habits.truncate(3);

                WeekDay {
                    date,
                    total_count: can.total_count,
                    change: i64::from(can.total_count) - i64::from(previous),
                    top_habits,
                }
            })
            .collect()
    }

    /// `days` days ending at `end`, oldest first.
    ///
    /// The window is capped at [`MAX_TREND_DAYS`] and stops at the start
    /// of the calendar.
    pub fn trend(&self, end: NaiveDate, days: u32, palette: &Palette) -> Vec<TrendPoint> {
        let days = if days > MAX_TREND_DAYS {
            tracing::warn!(requested = days, max = MAX_TREND_DAYS, "trend window capped");
            MAX_TREND_DAYS
        } else {
            days
        };
        (0..u64::from(days))
            .rev()
            .filter_map(|offset| end.checked_sub_days(Days::new(offset)))
            .map(|date| {
                let habit_counts: Vec<TrendHabitCount> = self
                    .ledger
                    .by_date(date)
                    .into_iter()
                    .map(|occ| {
                        let (habit_name, emoji) = self.label(&occ.habit_id);
                        TrendHabitCount {
                            habit_id: occ.habit_id.clone(),
                            habit_name,
                            emoji,
                            count: occ.count,
                            color: palette.color_at(self.habits.position(&occ.habit_id)).to_string(),
                        }
                    })
                    .collect();
                TrendPoint {
                    date,
                    total_count: habit_counts.iter().map(|h| h.count).sum(),
                    habit_counts,
                }
            })
            .collect()
    }

    /// Per-day counts of one habit over a calendar month.
    ///
    /// `None` for an unknown habit or an invalid month.
    pub fn heatmap(&self, habit_id: &str, year: i32, month: u32) -> Option<HeatmapData> {
        let habit = self.habits.get(habit_id)?;
        let (first, last) = month_bounds(year, month)?;

        let counts: Vec<(NaiveDate, u32)> = days_between(first, last)
            .map(|d| (d, self.ledger.count(habit_id, d)))
            .collect();
        let max = counts.iter().map(|(_, c)| *c).max().unwrap_or(0);

        let daily_data = counts
            .into_iter()
            .map(|(date, count)| HeatmapDay {
                date,
                count,
                intensity: if max > 0 {
                    f64::from(count) / f64::from(max)
                } else {
                    0.0
                },
            })
            .collect();

        Some(HeatmapData {
            habit_id: habit.id.clone(),
            habit_name: habit.name.clone(),
            emoji: habit.emoji.clone(),
            daily_data,
        })
    }

    /// Habit with the highest total over `[start, end]`; ties go to catalog order.
    pub fn most_frequent(&self, start: NaiveDate, end: NaiveDate) -> Option<FrequentHabit> {
        let totals = self.ledger.totals_by_habit(start, end);
        let mut best: Option<(&Habit, u32)> = None;
        for habit in self.habits.iter() {
            let count = totals.get(&habit.id).copied().unwrap_or(0);
            if count > 0 && best.map_or(true, |(_, c)| count > c) {
                best = Some((habit, count));
            }
        }
        best.map(|(habit, count)| FrequentHabit {
            habit: habit.clone(),
            count,
        })
    }
}
