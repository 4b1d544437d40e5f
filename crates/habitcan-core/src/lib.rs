//! # Habitcan Core Library
//!
//! This library provides the core logic of habitcan, a tracker for negative
//! daily habits. Habits are detected automatically from a task timeline and
//! a timer's timeout counters, recorded per "sleep-day", and summarized as
//! week views, trends, heatmaps and monthly reports. A standalone CLI binary
//! exposes every operation.
//!
//! ## Architecture
//!
//! - **Rule Evaluator**: turns a habit rule plus one sleep-day of tasks into
//!   occurrence increments, deduplicated through watermarks
//! - **Occurrence Ledger**: append-only per `(habit, date)` counts
//! - **Drivers**: a realtime monitor and a daily settlement scheduler that
//!   run the evaluator on their own cadence
//! - **Analytics**: read-only views and monthly reports with streak and
//!   achievement detection
//! - **Storage**: SQLite-backed versioned state document and TOML
//!   configuration
//!
//! ## Key Components
//!
//! - [`HabitEngine`]: façade over all of the above
//! - [`RealtimeMonitor`] and [`SettlementScheduler`]: the two drivers
//! - [`TaskTimelineProvider`]: read-only access to scheduled tasks
//! - [`Config`]: application configuration management

pub mod achievements;
pub mod analytics;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod habit;
pub mod ledger;
pub mod monitor;
pub mod sleep_day;
pub mod storage;
pub mod timeline;

pub use achievements::{Achievement, AchievementDraft, AchievementKind, AchievementLog};
pub use analytics::{
    CanData, ColorLevel, FrequentHabit, HeatmapData, MonthlyReport, Palette, ReportSettings,
    TrendPoint, WeekDay, MAX_TREND_DAYS,
};
pub use engine::{EngineSettings, EngineState, EvaluationSummary, HabitEngine, MAX_MANUAL_COUNT};
pub use error::{ConfigError, CoreError, ProviderError, RuleError, StorageError};
pub use evaluator::{RuleEvaluator, Scope};
pub use events::Event;
pub use habit::{DeleteOutcome, Habit, HabitCatalog, HabitDraft, HabitPatch, HabitRule, RuleKind};
pub use ledger::{HabitOccurrence, OccurrenceDetail, OccurrenceLedger};
pub use monitor::{RealtimeMonitor, SettlementScheduler};
pub use sleep_day::{sleep_day, DayBoundary};
pub use storage::{Config, Database, MemoryStateStore, SqliteStateStore, StateStore};
pub use timeline::{
    FileTimeline, Task, TaskStatus, TaskTimelineProvider, TimelineSnapshot, TimeoutCounterProvider,
    TimeoutCounters,
};
