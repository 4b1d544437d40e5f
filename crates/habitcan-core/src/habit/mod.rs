//! Habit definition store.
//!
//! Holds the catalog of trackable habits: the seeded presets plus anything
//! the user defines. Presets can be disabled but never deleted.

pub mod presets;
pub mod rule;

pub use presets::{preset_habits, PresetHabit};
pub use rule::{
    CheckType, Comparison, HabitRule, KeywordRule, MatchType, RuleKind, StatusType,
    TaskStatusRule, TimeRange, TimeThresholdRule,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A trackable negative behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    pub name: String,
    pub emoji: String,
    pub enabled: bool,
    pub is_preset: bool,
    pub rule: HabitRule,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Habit {
    /// Enabled both as a habit and at rule level.
    pub fn is_active(&self) -> bool {
        self.enabled && self.rule.enabled()
    }
}

/// Fields needed to create a user habit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitDraft {
    pub name: String,
    pub emoji: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub rule: HabitRule,
}

fn default_enabled() -> bool {
    true
}

/// Partial update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HabitPatch {
    pub name: Option<String>,
    pub emoji: Option<String>,
    pub enabled: Option<bool>,
    pub rule: Option<HabitRule>,
}

/// Result of a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    /// Presets can only be disabled.
    RejectedPreset,
}

/// Ordered habit catalog. Order is stable and drives trend colors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HabitCatalog {
    habits: Vec<Habit>,
}

impl HabitCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the preset catalog. Does nothing if any habit already exists.
    ///
    /// Returns `true` when presets were written.
    pub fn initialize_presets(&mut self, now: DateTime<Utc>) -> bool {
        if !self.habits.is_empty() {
            tracing::debug!(existing = self.habits.len(), "habits already present, skipping preset seeding");
            return false;
        }

        self.habits = preset_habits()
            .into_iter()
            .map(|p| Habit {
                id: p.id.to_string(),
                name: p.name.to_string(),
                emoji: p.emoji.to_string(),
                enabled: true,
                is_preset: true,
                rule: p.rule,
                created_at: now,
                updated_at: now,
            })
            .collect();

        tracing::info!(count = self.habits.len(), "preset habits seeded");
        true
    }

    pub fn create(&mut self, draft: HabitDraft, now: DateTime<Utc>) -> Habit {
        let habit = Habit {
            id: format!("habit-{}", Uuid::new_v4()),
            name: draft.name,
            emoji: draft.emoji,
            enabled: draft.enabled,
            is_preset: false,
            rule: draft.rule,
            created_at: now,
            updated_at: now,
        };
        self.habits.push(habit.clone());
        habit
    }

    pub fn update(&mut self, id: &str, patch: HabitPatch, now: DateTime<Utc>) -> Option<Habit> {
        let habit = self.habits.iter_mut().find(|h| h.id == id)?;
        if let Some(name) = patch.name {
            habit.name = name;
        }
        if let Some(emoji) = patch.emoji {
            habit.emoji = emoji;
        }
        if let Some(enabled) = patch.enabled {
            habit.enabled = enabled;
        }
        if let Some(rule) = patch.rule {
            habit.rule = rule;
        }
        habit.updated_at = now;
        Some(habit.clone())
    }

    pub fn delete(&mut self, id: &str) -> DeleteOutcome {
        match self.habits.iter().position(|h| h.id == id) {
            None => DeleteOutcome::NotFound,
            Some(idx) if self.habits[idx].is_preset => DeleteOutcome::RejectedPreset,
            Some(idx) => {
                self.habits.remove(idx);
                DeleteOutcome::Deleted
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Habit> {
        self.habits.iter().find(|h| h.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Position in catalog order.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.habits.iter().position(|h| h.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Habit> {
        self.habits.iter()
    }

    /// Habits whose rule is switched on at both levels.
    pub fn active(&self) -> impl Iterator<Item = &Habit> {
        self.habits.iter().filter(|h| h.is_active())
    }

    pub fn len(&self) -> usize {
        self.habits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.habits.is_empty()
    }
}
