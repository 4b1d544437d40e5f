//! Declarative rule definitions.
//!
//! Each habit carries exactly one [`HabitRule`]. The `type` tag selects the
//! variant; the evaluator matches on it exhaustively.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::RuleError;
use crate::sleep_day::parse_clock;

/// Which side of the threshold counts as a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    After,
    Before,
}

/// Which event of the day a time-threshold rule inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckType {
    /// Earliest scheduled start
    FirstEvent,
    /// Latest scheduled end
    LastEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Any,
    All,
}

/// Which timer counter a task-status rule follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusType {
    StartTimeout,
    CompletionTimeout,
}

/// `HH:MM` window inside a sleep-day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

impl TimeRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    pub fn parse(&self) -> Result<(NaiveTime, NaiveTime), RuleError> {
        Ok((parse_clock(&self.start)?, parse_clock(&self.end)?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeThresholdRule {
    pub time: String,
    pub comparison: Comparison,
    pub check_type: CheckType,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub keywords: Vec<String>,
    pub match_type: MatchType,
    #[serde(default)]
    pub time_range: Option<TimeRange>,
    pub should_exist: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl KeywordRule {
    /// Lower-cased, non-empty keywords.
    pub fn needles(&self) -> Vec<String> {
        self.keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect()
    }

    /// Whether `haystack` (already lower-cased) satisfies the match type.
    pub fn matches(&self, haystack: &str) -> bool {
        let needles = self.needles();
        if needles.is_empty() {
            return false;
        }
        match self.match_type {
            MatchType::Any => needles.iter().any(|k| haystack.contains(k.as_str())),
            MatchType::All => needles.iter().all(|k| haystack.contains(k.as_str())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatusRule {
    pub status_type: StatusType,
    #[serde(default = "default_count_per_occurrence")]
    pub count_per_occurrence: u32,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Rule variant tag, used for driver filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    TimeThreshold,
    Keyword,
    TaskStatus,
    Manual,
}

/// A habit's detection rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HabitRule {
    TimeThreshold(TimeThresholdRule),
    Keyword(KeywordRule),
    TaskStatus(TaskStatusRule),
    /// Never auto-evaluated; only fed by manual entries.
    Manual {
        #[serde(default = "default_true")]
        enabled: bool,
    },
}

impl HabitRule {
    pub fn kind(&self) -> RuleKind {
        match self {
            HabitRule::TimeThreshold(_) => RuleKind::TimeThreshold,
            HabitRule::Keyword(_) => RuleKind::Keyword,
            HabitRule::TaskStatus(_) => RuleKind::TaskStatus,
            HabitRule::Manual { .. } => RuleKind::Manual,
        }
    }

    pub fn enabled(&self) -> bool {
        match self {
            HabitRule::TimeThreshold(r) => r.enabled,
            HabitRule::Keyword(r) => r.enabled,
            HabitRule::TaskStatus(r) => r.enabled,
            HabitRule::Manual { enabled } => *enabled,
        }
    }

    /// Check the definition without evaluating it.
    pub fn validate(&self) -> Result<(), RuleError> {
        match self {
            HabitRule::TimeThreshold(r) => parse_clock(&r.time).map(|_| ()),
            HabitRule::Keyword(r) => {
                if r.needles().is_empty() {
                    return Err(RuleError::EmptyKeywords);
                }
                if let Some(range) = &r.time_range {
                    range.parse()?;
                }
                Ok(())
            }
            HabitRule::TaskStatus(r) => {
                if r.count_per_occurrence == 0 {
                    Err(RuleError::ZeroCountPerOccurrence)
                } else {
                    Ok(())
                }
            }
            HabitRule::Manual { .. } => Ok(()),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_count_per_occurrence() -> u32 {
    1
}
