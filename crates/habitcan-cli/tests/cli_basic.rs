//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary with HOME pointed at a temporary directory
//! so every run starts from an empty data directory.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_habitcan"))
        .args(args)
        .env("HOME", home)
        .env_remove("HABITCAN_ENV")
        .env("HABITCAN_LOG", "warn")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_json(home: &Path, args: &[&str]) -> serde_json::Value {
    let (stdout, stderr, code) = run_cli(home, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout).expect("Failed to parse JSON output")
}

fn home() -> TempDir {
    tempfile::tempdir().unwrap()
}

#[test]
fn test_habit_list_has_presets() {
    let home = home();
    let habits = run_json(home.path(), &["habit", "list"]);
    let habits = habits.as_array().unwrap();
    assert_eq!(habits.len(), 6);
    assert!(habits.iter().all(|h| h["is_preset"] == true));
}

#[test]
fn test_habit_create_and_delete() {
    let home = home();
    let habit = run_json(
        home.path(),
        &["habit", "create", "--name", "Doomscrolling", "--emoji", "📱", "--rule", r#"{"type":"manual"}"#],
    );
    let id = habit["id"].as_str().unwrap().to_string();
    assert_eq!(habit["rule"]["type"], "manual");

    let (stdout, _, code) = run_cli(home.path(), &["habit", "delete", &id]);
    assert_eq!(code, 0);
    assert!(stdout.contains("deleted"));

    let (_, stderr, code) = run_cli(home.path(), &["habit", "delete", "preset-stay-up-late"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("preset"));
}

#[test]
fn test_habit_create_rejects_bad_rule() {
    let home = home();
    let (_, stderr, code) = run_cli(
        home.path(),
        &["habit", "create", "--name", "Broken", "--rule", r#"{"type":"nope"}"#],
    );
    assert_ne!(code, 0);
    assert!(stderr.contains("invalid rule JSON"));
}

#[test]
fn test_occurrence_record_and_view() {
    let home = home();
    let occ = run_json(
        home.path(),
        &[
            "occurrence", "record", "preset-order-takeout", "--date", "2026-03-01", "--count", "2", "--reason", "pizza",
        ],
    );
    assert_eq!(occ["count"], 2);
    assert_eq!(occ["details"].as_array().unwrap().len(), 2);

    let can = run_json(home.path(), &["view", "can", "2026-03-01"]);
    assert_eq!(can["total_count"], 2);
    assert_eq!(can["color_level"], "yellow");

    let list = run_json(home.path(), &["occurrence", "list", "--date", "2026-03-01"]);
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[test]
fn test_settle_with_timeline_is_idempotent() {
    let home = home();
    let timeline = home.path().join("timeline.json");
    std::fs::write(
        &timeline,
        r#"{
            "tasks": [
                {"id": "t1", "title": "点外卖吃饭",
                 "scheduled_start": "2026-03-01T12:00:00", "scheduled_end": "2026-03-01T12:30:00"}
            ]
        }"#,
    )
    .unwrap();
    let timeline = timeline.to_str().unwrap();

    let first = run_json(home.path(), &["settle", "2026-03-01", "--timeline", timeline]);
    assert_eq!(first["per_habit"]["preset-order-takeout"], 1);

    let second = run_json(home.path(), &["settle", "2026-03-01", "--timeline", timeline]);
    assert_eq!(second["increments"], 0);
}

#[test]
fn test_oversized_arguments_are_rejected() {
    let home = home();
    let (_, stderr, code) = run_cli(
        home.path(),
        &["occurrence", "record", "preset-order-takeout", "--date", "2026-03-01", "--count", "4000000000"],
    );
    assert_ne!(code, 0);
    assert!(stderr.contains("--count"));

    let (_, stderr, code) = run_cli(home.path(), &["view", "trend", "--end", "2026-03-01", "--days", "200000000"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("--days"));

    let trend = run_json(home.path(), &["view", "trend", "--end", "2026-03-01", "--days", "366"]);
    assert_eq!(trend.as_array().unwrap().len(), 366);
}

#[test]
fn test_settle_without_timeline_records_nothing() {
    let home = home();
    let summary = run_json(home.path(), &["settle", "2026-03-01"]);
    assert_eq!(summary["increments"], 0);
}

#[test]
fn test_report_generate_and_show() {
    let home = home();
    run_json(
        home.path(),
        &["occurrence", "record", "preset-skip-lunch", "--date", "2026-04-01"],
    );
    let report = run_json(home.path(), &["report", "generate", "2026", "4"]);
    assert_eq!(report["total_count"], 1);

    let shown = run_json(home.path(), &["report", "show", "2026", "4"]);
    assert_eq!(shown["top_habits"], report["top_habits"]);

    let (_, _, code) = run_cli(home.path(), &["report", "show", "2026", "5"]);
    assert_ne!(code, 0);
}

#[test]
fn test_config_get_set() {
    let home = home();
    let (stdout, _, code) = run_cli(home.path(), &["config", "get", "monitor.interval_secs"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "60");

    let (_, _, code) = run_cli(home.path(), &["config", "set", "sleep_day.boundary_hour", "6"]);
    assert_eq!(code, 0);
    let (stdout, _, _) = run_cli(home.path(), &["config", "get", "sleep_day.boundary_hour"]);
    assert_eq!(stdout.trim(), "6");

    let (_, _, code) = run_cli(home.path(), &["config", "get", "no.such.key"]);
    assert_ne!(code, 0);
}
