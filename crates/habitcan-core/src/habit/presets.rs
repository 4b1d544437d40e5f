//! Built-in habit catalog seeded on first run.
//!
//! Preset ids are fixed so that seeding stays idempotent across restarts and
//! so the monthly report can key its suggestions off them.

use super::rule::{
    CheckType, Comparison, HabitRule, KeywordRule, MatchType, StatusType, TaskStatusRule,
    TimeRange, TimeThresholdRule,
};

pub const STAY_UP_LATE: &str = "preset-stay-up-late";
pub const WAKE_UP_LATE: &str = "preset-wake-up-late";
pub const PROCRASTINATION: &str = "preset-procrastination";
pub const LOW_EFFICIENCY: &str = "preset-low-efficiency";
pub const ORDER_TAKEOUT: &str = "preset-order-takeout";
pub const SKIP_LUNCH: &str = "preset-skip-lunch";

/// A preset before it is stamped with creation times.
#[derive(Debug, Clone)]
pub struct PresetHabit {
    pub id: &'static str,
    pub name: &'static str,
    pub emoji: &'static str,
    pub rule: HabitRule,
}

fn keywords(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

/// The preset catalog, in display order.
pub fn preset_habits() -> Vec<PresetHabit> {
    vec![
        PresetHabit {
            id: STAY_UP_LATE,
            name: "Stay up late",
            emoji: "🌙",
            rule: HabitRule::TimeThreshold(TimeThresholdRule {
                time: "23:00".into(),
                comparison: Comparison::After,
                check_type: CheckType::LastEvent,
                enabled: true,
            }),
        },
        PresetHabit {
            id: WAKE_UP_LATE,
            name: "Wake up late",
            emoji: "🛌",
            rule: HabitRule::TimeThreshold(TimeThresholdRule {
                time: "10:30".into(),
                comparison: Comparison::After,
                check_type: CheckType::FirstEvent,
                enabled: true,
            }),
        },
        PresetHabit {
            id: PROCRASTINATION,
            name: "Procrastination",
            emoji: "🕒",
            rule: HabitRule::TaskStatus(TaskStatusRule {
                status_type: StatusType::StartTimeout,
                count_per_occurrence: 1,
                enabled: true,
            }),
        },
        PresetHabit {
            id: LOW_EFFICIENCY,
            name: "Low efficiency",
            emoji: "🐢",
            rule: HabitRule::TaskStatus(TaskStatusRule {
                status_type: StatusType::CompletionTimeout,
                count_per_occurrence: 1,
                enabled: true,
            }),
        },
        PresetHabit {
            id: ORDER_TAKEOUT,
            name: "Order takeout",
            emoji: "🍱",
            rule: HabitRule::Keyword(KeywordRule {
                keywords: keywords(&["外卖", "美团", "饿了么", "点餐", "takeout", "delivery"]),
                match_type: MatchType::Any,
                time_range: None,
                should_exist: true,
                enabled: true,
            }),
        },
        PresetHabit {
            id: SKIP_LUNCH,
            name: "Skip lunch",
            emoji: "🥣",
            rule: HabitRule::Keyword(KeywordRule {
                keywords: keywords(&["午饭", "午餐", "就餐", "吃饭", "lunch"]),
                match_type: MatchType::Any,
                time_range: Some(TimeRange::new("11:30", "13:00")),
                should_exist: false,
                enabled: true,
            }),
        },
    ]
}
