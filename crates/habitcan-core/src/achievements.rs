//! Achievement log.
//!
//! Append-only: achievements are unlocked, never edited or removed.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementKind {
    CleanStreak,
    Improvement,
}

/// An unlocked achievement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AchievementKind,
    pub title: String,
    pub description: String,
    pub emoji: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub unlocked_at: DateTime<Utc>,
}

impl Achievement {
    /// Whether the achievement belongs to `(year, month)`.
    ///
    /// Dated achievements go by their date, undated ones by unlock time.
    pub fn falls_in(&self, year: i32, month: u32) -> bool {
        match self.date {
            Some(date) => date.year() == year && date.month() == month,
            None => self.unlocked_at.year() == year && self.unlocked_at.month() == month,
        }
    }
}

/// Everything but the generated id and unlock time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementDraft {
    #[serde(rename = "type")]
    pub kind: AchievementKind,
    pub title: String,
    pub description: String,
    pub emoji: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AchievementLog {
    entries: Vec<Achievement>,
}

impl AchievementLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unlock(&mut self, draft: AchievementDraft, now: DateTime<Utc>) -> Achievement {
        let achievement = Achievement {
            id: format!("achievement-{}", Uuid::new_v4()),
            kind: draft.kind,
            title: draft.title,
            description: draft.description,
            emoji: draft.emoji,
            date: draft.date,
            unlocked_at: now,
        };
        tracing::info!(title = %achievement.title, date = ?achievement.date, "achievement unlocked");
        self.entries.push(achievement.clone());
        achievement
    }

    /// Unlock unless an achievement with the same kind, title and date exists.
    pub fn unlock_once(&mut self, draft: AchievementDraft, now: DateTime<Utc>) -> Option<Achievement> {
        if self.contains(draft.kind, &draft.title, draft.date) {
            tracing::debug!(title = %draft.title, "achievement already unlocked");
            return None;
        }
        Some(self.unlock(draft, now))
    }

    pub fn contains(&self, kind: AchievementKind, title: &str, date: Option<NaiveDate>) -> bool {
        self.entries
            .iter()
            .any(|a| a.kind == kind && a.title == title && a.date == date)
    }

    pub fn by_date(&self, date: NaiveDate) -> Vec<&Achievement> {
        self.entries.iter().filter(|a| a.date == Some(date)).collect()
    }

    pub fn in_month(&self, year: i32, month: u32) -> Vec<Achievement> {
        self.entries
            .iter()
            .filter(|a| a.falls_in(year, month))
            .cloned()
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Achievement> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
