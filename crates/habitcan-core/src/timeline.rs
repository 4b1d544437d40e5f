//! Read-only view of the task timeline and the timer countdown counters.
//!
//! The engine never owns tasks. It consumes them through
//! [`TaskTimelineProvider`] and the free-running timeout counters through
//! [`TimeoutCounterProvider`].

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::sleep_day::DayBoundary;

/// Lifecycle status of a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Scheduled,
    WaitingStart,
    VerifyingStart,
    InProgress,
    VerifyingComplete,
    Completed,
    Failed,
    Cancelled,
}

/// A scheduled task as seen by the habit engine.
///
/// Timestamps are local wall-clock times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub scheduled_start: Option<NaiveDateTime>,
    #[serde(default)]
    pub scheduled_end: Option<NaiveDateTime>,
    #[serde(default)]
    pub status: TaskStatus,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            tags: Vec::new(),
            scheduled_start: None,
            scheduled_end: None,
            status: TaskStatus::Pending,
        }
    }

    pub fn scheduled(mut self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        self.scheduled_start = Some(start);
        self.scheduled_end = Some(end);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Sleep-day the task belongs to, keyed on its start (or end if unstarted).
    pub fn sleep_day(&self, boundary: DayBoundary) -> Option<NaiveDate> {
        self.scheduled_start
            .or(self.scheduled_end)
            .map(|ts| boundary.resolve(ts))
    }

    /// Lower-cased title, description and tags joined for keyword search.
    pub fn haystack(&self) -> String {
        let mut text = self.title.clone();
        if let Some(description) = &self.description {
            text.push(' ');
            text.push_str(description);
        }
        for tag in &self.tags {
            text.push(' ');
            text.push_str(tag);
        }
        text.to_lowercase()
    }
}

/// Free-running timeout counters the timer subsystem keeps per task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutCounters {
    #[serde(default)]
    pub start_timeout_count: u32,
    #[serde(default)]
    pub complete_timeout_count: u32,
}

/// Source of the canonical task list.
pub trait TaskTimelineProvider: Send + Sync {
    fn tasks(&self) -> Result<Vec<Task>, ProviderError>;
}

/// Source of per-task timeout counters.
pub trait TimeoutCounterProvider: Send + Sync {
    /// Counters for `task_id`, or `None` if the timer never tracked it.
    fn counters(&self, task_id: &str) -> Option<TimeoutCounters>;
}

/// Tasks and counters captured together, as a JSON document or in memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimelineSnapshot {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub counters: HashMap<String, TimeoutCounters>,
}

impl TimelineSnapshot {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            counters: HashMap::new(),
        }
    }

    pub fn set_counters(&mut self, task_id: impl Into<String>, counters: TimeoutCounters) {
        self.counters.insert(task_id.into(), counters);
    }
}

impl TaskTimelineProvider for TimelineSnapshot {
    fn tasks(&self) -> Result<Vec<Task>, ProviderError> {
        Ok(self.tasks.clone())
    }
}

impl TimeoutCounterProvider for TimelineSnapshot {
    fn counters(&self, task_id: &str) -> Option<TimeoutCounters> {
        self.counters.get(task_id).copied()
    }
}

/// A [`TimelineSnapshot`] re-read from disk on every call.
///
/// Lets the monitor daemon follow a timeline that another process keeps
/// rewriting.
#[derive(Debug, Clone)]
pub struct FileTimeline {
    path: PathBuf,
}

impl FileTimeline {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn read(&self) -> Result<TimelineSnapshot, ProviderError> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| ProviderError::Unavailable(format!("{}: {e}", self.path.display())))?;
        serde_json::from_str(&content).map_err(|e| ProviderError::Malformed(e.to_string()))
    }
}

impl TaskTimelineProvider for FileTimeline {
    fn tasks(&self) -> Result<Vec<Task>, ProviderError> {
        Ok(self.read()?.tasks)
    }
}

impl TimeoutCounterProvider for FileTimeline {
    fn counters(&self, task_id: &str) -> Option<TimeoutCounters> {
        match self.read() {
            Ok(snapshot) => snapshot.counters.get(task_id).copied(),
            Err(e) => {
                tracing::debug!(task_id, error = %e, "timeout counters unavailable");
                None
            }
        }
    }
}

/// Tasks of one sleep-day plus their counters, gathered before any lock is taken.
///
/// `available` is false when the timeline could not be read. Such a window
/// says nothing about the day, so rules must not read it as an empty one.
#[derive(Debug, Clone, Default)]
pub struct TaskWindow {
    pub day: Option<NaiveDate>,
    pub available: bool,
    pub tasks: Vec<Task>,
    pub counters: HashMap<String, TimeoutCounters>,
}

impl TaskWindow {
    /// Collect the tasks of sleep-day `day`.
    ///
    /// A provider error yields an unavailable window.
    pub fn collect(
        timeline: &dyn TaskTimelineProvider,
        counters: &dyn TimeoutCounterProvider,
        boundary: DayBoundary,
        day: NaiveDate,
    ) -> Self {
        let tasks = match timeline.tasks() {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::warn!(date = %day, error = %e, "task timeline unavailable, skipping evaluation");
                return Self::unavailable(day);
            }
        };

        let tasks: Vec<Task> = tasks
            .into_iter()
            .filter(|t| t.sleep_day(boundary) == Some(day))
            .collect();

        let counters = tasks
            .iter()
            .filter_map(|t| counters.counters(&t.id).map(|c| (t.id.clone(), c)))
            .collect();

        Self {
            day: Some(day),
            available: true,
            tasks,
            counters,
        }
    }

    pub fn unavailable(day: NaiveDate) -> Self {
        Self {
            day: Some(day),
            ..Self::default()
        }
    }
}

/// Stand-in provider for an engine with no timeline attached.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Detached;

impl TaskTimelineProvider for Detached {
    fn tasks(&self) -> Result<Vec<Task>, ProviderError> {
        Err(ProviderError::Unavailable("no task timeline attached".into()))
    }
}

impl TimeoutCounterProvider for Detached {
    fn counters(&self, _task_id: &str) -> Option<TimeoutCounters> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    struct Offline;

    impl TaskTimelineProvider for Offline {
        fn tasks(&self) -> Result<Vec<Task>, ProviderError> {
            Err(ProviderError::Unavailable("offline".into()))
        }
    }

    #[test]
    fn haystack_joins_and_lowercases() {
        let task = Task::new("t1", "Order LUNCH")
            .with_description("Via App")
            .with_tags(["Food"]);
        assert_eq!(task.haystack(), "order lunch via app food");
    }

    #[test]
    fn window_keeps_only_the_requested_sleep_day() {
        let mut snapshot = TimelineSnapshot::new(vec![
            Task::new("a", "late work").scheduled(at("2026-03-02 00:30"), at("2026-03-02 01:15")),
            Task::new("b", "morning").scheduled(at("2026-03-02 09:00"), at("2026-03-02 10:00")),
            Task::new("c", "evening").scheduled(at("2026-03-01 20:00"), at("2026-03-01 21:00")),
        ]);
        snapshot.set_counters("a", TimeoutCounters { start_timeout_count: 2, complete_timeout_count: 0 });

        let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let window = TaskWindow::collect(&snapshot, &snapshot, DayBoundary::default(), day);
        let ids: Vec<_> = window.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(window.counters["a"].start_timeout_count, 2);
        assert!(!window.counters.contains_key("c"));
    }

    #[test]
    fn unavailable_timeline_is_flagged() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let window = TaskWindow::collect(&Offline, &TimelineSnapshot::default(), DayBoundary::default(), day);
        assert!(!window.available);
        assert!(window.tasks.is_empty());

        let window = TaskWindow::collect(&Detached, &Detached, DayBoundary::default(), day);
        assert!(!window.available);

        let empty = TimelineSnapshot::default();
        assert!(TaskWindow::collect(&empty, &empty, DayBoundary::default(), day).available);
    }

    #[test]
    fn missing_timeline_file_is_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let timeline = FileTimeline::new(dir.path().join("absent.json"));
        let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let window = TaskWindow::collect(&timeline, &timeline, DayBoundary::default(), day);
        assert!(!window.available);
    }

    #[test]
    fn file_timeline_reads_snapshot_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timeline.json");
        std::fs::write(
            &path,
            r#"{"tasks":[{"id":"t1","title":"点外卖吃饭","scheduled_start":"2026-03-01T12:00:00","status":"completed"}],
                "counters":{"t1":{"start_timeout_count":1}}}"#,
        )
        .unwrap();

        let timeline = FileTimeline::new(&path);
        let tasks = timeline.tasks().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].status, TaskStatus::Completed);
        assert_eq!(timeline.counters("t1").unwrap().start_timeout_count, 1);
        assert!(timeline.counters("missing").is_none());
    }

    #[test]
    fn missing_file_is_unavailable() {
        let timeline = FileTimeline::new("/nonexistent/habitcan/timeline.json");
        assert!(matches!(timeline.tasks(), Err(ProviderError::Unavailable(_))));
    }
}
