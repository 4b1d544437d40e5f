//! Integration tests for SQLite-backed persistence.
//!
//! Each test opens an engine on a temporary database, mutates it, drops it
//! and reopens from the same file.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use habitcan_core::habit::presets;
use habitcan_core::storage::{Database, STATE_KEY};
use habitcan_core::{
    EngineSettings, HabitEngine, SqliteStateStore, StorageError, Task, TimelineSnapshot,
    TimeoutCounters,
};
use tempfile::TempDir;

fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
}

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn open(dir: &TempDir) -> HabitEngine {
    let store = SqliteStateStore::open_at(&dir.path().join("habitcan.db")).unwrap();
    HabitEngine::open(Box::new(store), EngineSettings::default()).unwrap()
}

fn timeline(start_timeouts: u32) -> Arc<TimelineSnapshot> {
    let mut snapshot = TimelineSnapshot::new(vec![
        Task::new("t1", "Refactor").scheduled(at("2026-03-01 14:00"), at("2026-03-01 16:00")),
    ]);
    snapshot.set_counters(
        "t1",
        TimeoutCounters {
            start_timeout_count: start_timeouts,
            complete_timeout_count: 0,
        },
    );
    Arc::new(snapshot)
}

#[test]
fn state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let engine = open(&dir);
    engine
        .record_manual_occurrence(presets::ORDER_TAKEOUT, day("2026-03-01"), 2, "pizza")
        .unwrap();
    engine.toggle_habit(presets::WAKE_UP_LATE, false).unwrap();
    drop(engine);

    let reopened = open(&dir);
    assert_eq!(reopened.list_habits().len(), 6);
    assert!(!reopened.get_habit(presets::WAKE_UP_LATE).unwrap().enabled);

    let occurrences = reopened.occurrences_by_date(day("2026-03-01"));
    assert_eq!(occurrences.len(), 1);
    assert_eq!(occurrences[0].count, 2);
    assert_eq!(occurrences[0].date, day("2026-03-01"));
    assert!(occurrences[0].is_manual);
}

#[test]
fn watermarks_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let engine = open(&dir).with_provider(timeline(2));
    let first = engine.run_realtime(at("2026-03-01 17:00"));
    assert_eq!(first.per_habit.get(presets::PROCRASTINATION), Some(&2));
    drop(engine);

    // counter moved from 2 to 3 while the engine was down
    let engine = open(&dir).with_provider(timeline(3));
    let second = engine.run_realtime(at("2026-03-01 18:00"));
    assert_eq!(second.per_habit.get(presets::PROCRASTINATION), Some(&1));
    let data = engine.can_data(day("2026-03-01"));
    let procrastination = data
        .habits
        .iter()
        .find(|h| h.habit_id == presets::PROCRASTINATION)
        .unwrap();
    assert_eq!(procrastination.count, 3);
}

#[test]
fn stored_document_is_versioned() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("habitcan.db");
    drop(open(&dir));

    let db = Database::open_at(&path).unwrap();
    let raw = db.kv_get(STATE_KEY).unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["version"], 2);
    assert_eq!(value["habits"].as_array().unwrap().len(), 6);
    assert!(db.kv_updated_at(STATE_KEY).unwrap().is_some());
}

#[test]
fn document_from_newer_build_is_left_alone() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("habitcan.db");
    let future = r#"{"version": 99, "habits": []}"#;
    Database::open_at(&path).unwrap().kv_set(STATE_KEY, future).unwrap();

    let store = SqliteStateStore::open_at(&path).unwrap();
    match HabitEngine::open(Box::new(store), EngineSettings::default()) {
        Err(StorageError::UnsupportedVersion { found: 99, .. }) => {}
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("newer document should be refused"),
    }

    let raw = Database::open_at(&path).unwrap().kv_get(STATE_KEY).unwrap();
    assert_eq!(raw.as_deref(), Some(future));
}
