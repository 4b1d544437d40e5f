//! Occurrence ledger.
//!
//! One [`HabitOccurrence`] per `(habit_id, sleep-day)`. Every record keeps
//! `count == details.len()`; recording is a single find-or-create-then-append
//! step on `&mut self`, so callers holding the engine lock cannot interleave
//! a read and a write.

mod watermark;

pub use watermark::{WatermarkKey, Watermarks};

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One detected instance of a habit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccurrenceDetail {
    /// `HH:MM`
    pub time: String,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_task_id: Option<String>,
}

impl OccurrenceDetail {
    pub fn new(time: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            reason: reason.into(),
            related_task_id: None,
        }
    }

    pub fn for_task(mut self, task_id: impl Into<String>) -> Self {
        self.related_task_id = Some(task_id.into());
        self
    }
}

/// Accumulated occurrences of one habit on one sleep-day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitOccurrence {
    pub id: String,
    pub habit_id: String,
    pub date: NaiveDate,
    pub count: u32,
    pub details: Vec<OccurrenceDetail>,
    /// Set once any increment on this record came from manual entry.
    pub is_manual: bool,
}

type LedgerKey = (String, NaiveDate);

/// Append/merge store of dated occurrence records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<HabitOccurrence>", into = "Vec<HabitOccurrence>")]
pub struct OccurrenceLedger {
    records: BTreeMap<LedgerKey, HabitOccurrence>,
}

impl From<Vec<HabitOccurrence>> for OccurrenceLedger {
    fn from(list: Vec<HabitOccurrence>) -> Self {
        let mut ledger = Self::default();
        for mut occ in list {
            // Older snapshots may carry a count that disagrees with details.
            occ.count = occ.details.len() as u32;
            if occ.count == 0 {
                continue;
            }
            let key = (occ.habit_id.clone(), occ.date);
            match ledger.records.get_mut(&key) {
                Some(existing) => {
                    existing.details.extend(occ.details);
                    existing.count = existing.details.len() as u32;
                    existing.is_manual |= occ.is_manual;
                }
                None => {
                    ledger.records.insert(key, occ);
                }
            }
        }
        ledger
    }
}

impl From<OccurrenceLedger> for Vec<HabitOccurrence> {
    fn from(ledger: OccurrenceLedger) -> Self {
        ledger.records.into_values().collect()
    }
}

impl OccurrenceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one detail to the `(habit_id, date)` record, creating it if needed.
    pub fn record(
        &mut self,
        habit_id: &str,
        date: NaiveDate,
        detail: OccurrenceDetail,
    ) -> &HabitOccurrence {
        self.record_many(habit_id, date, vec![detail], false)
    }

    /// Append several details at once.
    ///
    /// `manual` marks the record as touched by manual entry; it never clears
    /// the flag.
    pub fn record_many(
        &mut self,
        habit_id: &str,
        date: NaiveDate,
        details: Vec<OccurrenceDetail>,
        manual: bool,
    ) -> &HabitOccurrence {
        let occ = self
            .records
            .entry((habit_id.to_string(), date))
            .or_insert_with(|| HabitOccurrence {
                id: format!("occ-{}", Uuid::new_v4()),
                habit_id: habit_id.to_string(),
                date,
                count: 0,
                details: Vec::new(),
                is_manual: false,
            });
        occ.details.extend(details);
        occ.count = occ.details.len() as u32;
        occ.is_manual |= manual;
        occ
    }

    /// Remove the exact `(habit_id, date)` record.
    pub fn delete(&mut self, habit_id: &str, date: NaiveDate) -> bool {
        self.records.remove(&(habit_id.to_string(), date)).is_some()
    }

    /// Remove every record of a habit. Returns how many were dropped.
    pub fn remove_habit(&mut self, habit_id: &str) -> usize {
        let before = self.records.len();
        self.records.retain(|(id, _), _| id != habit_id);
        before - self.records.len()
    }

    pub fn get(&self, habit_id: &str, date: NaiveDate) -> Option<&HabitOccurrence> {
        self.records.get(&(habit_id.to_string(), date))
    }

    pub fn count(&self, habit_id: &str, date: NaiveDate) -> u32 {
        self.get(habit_id, date).map_or(0, |o| o.count)
    }

    pub fn by_date(&self, date: NaiveDate) -> Vec<&HabitOccurrence> {
        self.records.values().filter(|o| o.date == date).collect()
    }

    /// Records with `start <= date <= end`.
    pub fn by_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<&HabitOccurrence> {
        self.records
            .values()
            .filter(|o| o.date >= start && o.date <= end)
            .collect()
    }

    /// Sum of counts across all habits for a date.
    pub fn day_total(&self, date: NaiveDate) -> u32 {
        self.by_date(date).iter().map(|o| o.count).sum()
    }

    /// Total count per habit over a date range.
    pub fn totals_by_habit(&self, start: NaiveDate, end: NaiveDate) -> HashMap<String, u32> {
        let mut totals = HashMap::new();
        for occ in self.by_range(start, end) {
            *totals.entry(occ.habit_id.clone()).or_insert(0) += occ.count;
        }
        totals
    }

    pub fn iter(&self) -> impl Iterator<Item = &HabitOccurrence> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
