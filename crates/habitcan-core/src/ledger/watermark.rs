//! Dedupe markers and counter watermarks.
//!
//! Keyed explicitly by `(habit_id, task_id?, date)` so the realtime monitor
//! and the daily settlement share one namespace without talking to each
//! other. A marker is just a watermark whose value is 1.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WatermarkKey {
    pub habit_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub date: NaiveDate,
}

impl WatermarkKey {
    /// Day-level key, for rules that fire at most once per day.
    pub fn day(habit_id: &str, date: NaiveDate) -> Self {
        Self {
            habit_id: habit_id.to_string(),
            task_id: None,
            date,
        }
    }

    /// Task-level key.
    pub fn task(habit_id: &str, task_id: &str, date: NaiveDate) -> Self {
        Self {
            habit_id: habit_id.to_string(),
            task_id: Some(task_id.to_string()),
            date,
        }
    }
}

/// Serialized form of one watermark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatermarkEntry {
    #[serde(flatten)]
    key: WatermarkKey,
    value: u32,
}

/// Last-seen values per key.
///
/// `revision` counts in-memory changes and is not persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<WatermarkEntry>", into = "Vec<WatermarkEntry>")]
pub struct Watermarks {
    marks: BTreeMap<WatermarkKey, u32>,
    revision: u64,
}

impl PartialEq for Watermarks {
    fn eq(&self, other: &Self) -> bool {
        self.marks == other.marks
    }
}

impl From<Vec<WatermarkEntry>> for Watermarks {
    fn from(entries: Vec<WatermarkEntry>) -> Self {
        Self {
            marks: entries.into_iter().map(|e| (e.key, e.value)).collect(),
            revision: 0,
        }
    }
}

impl From<Watermarks> for Vec<WatermarkEntry> {
    fn from(w: Watermarks) -> Self {
        w.marks
            .into_iter()
            .map(|(key, value)| WatermarkEntry { key, value })
            .collect()
    }
}

impl Watermarks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &WatermarkKey) -> Option<u32> {
        self.marks.get(key).copied()
    }

    /// Store `value` and return the previous one.
    pub fn advance(&mut self, key: WatermarkKey, value: u32) -> Option<u32> {
        let previous = self.marks.insert(key, value);
        if previous != Some(value) {
            self.revision += 1;
        }
        previous
    }

    /// Set a one-shot marker. Returns `true` if it was not set before.
    pub fn mark_once(&mut self, key: WatermarkKey) -> bool {
        if self.marks.contains_key(&key) {
            return false;
        }
        self.marks.insert(key, 1);
        self.revision += 1;
        true
    }

    /// Changes since this value was created or loaded.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_marked(&self, key: &WatermarkKey) -> bool {
        self.marks.contains_key(key)
    }

    pub fn remove_habit(&mut self, habit_id: &str) -> usize {
        let before = self.marks.len();
        self.marks.retain(|k, _| k.habit_id != habit_id);
        let removed = before - self.marks.len();
        if removed > 0 {
            self.revision += 1;
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }
}
