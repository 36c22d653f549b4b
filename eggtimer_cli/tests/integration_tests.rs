//! Integration tests for the eggtimer binary.
//!
//! These tests verify end-to-end behavior including:
//! - Logging flow events and reading statistics back
//! - JSON output shapes
//! - Notices and cycle references
//! - CSV import and export

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a test data directory with a UTC config file
fn setup_test_dir() -> TempDir {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    fs::write(
        temp_dir.path().join("config.toml"),
        "[user]\nid = \"jessamyn\"\nluteal_phase_length = 14\nutc_offset_minutes = 0\n",
    )
    .expect("Failed to write config");
    temp_dir
}

/// Helper to get the CLI binary pointed at the test directory
fn cli(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("eggtimer"));
    cmd.arg("--config")
        .arg(dir.join("config.toml"))
        .arg("--data-dir")
        .arg(dir.join("data"));
    cmd
}

fn log_first_day(dir: &Path, date: &str) {
    cli(dir)
        .args(["log", "--at", date, "--first-day"])
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Flow event logged!"));
}

fn stats_json(dir: &Path, now: &str) -> serde_json::Value {
    let output = cli(dir)
        .args(["stats", "--now", now, "--json"])
        .output()
        .expect("Failed to run stats");
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).expect("stats output is not JSON")
}

#[test]
fn test_cli_help() {
    Command::new(assert_cmd::cargo::cargo_bin!("eggtimer"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Period tracking with cycle statistics and predictions",
        ));
}

#[test]
fn test_log_creates_event_log() {
    let temp_dir = setup_test_dir();
    log_first_day(temp_dir.path(), "2014-01-31");

    let log_path = temp_dir.path().join("data/events.jsonl");
    let contents = fs::read_to_string(&log_path).expect("Failed to read event log");
    assert_eq!(contents.lines().count(), 1);
    assert!(contents.contains("\"first_day\":true"));
    assert!(temp_dir.path().join("data/statistics.json").exists());
}

#[test]
fn test_stats_with_no_events() {
    let temp_dir = setup_test_dir();
    let stats = stats_json(temp_dir.path(), "2014-03-01");

    assert_eq!(stats["average_cycle_length"], 28);
    assert_eq!(stats["all_time_average_cycle_length"], 28);
    assert_eq!(stats["current_cycle_length"], -1);
    assert!(stats["cycle_length_mean"].is_null());
    assert!(stats["cycle_length_mode"].is_null());
    assert_eq!(stats["predicted_events"].as_array().unwrap().len(), 0);
}

#[test]
fn test_stats_after_two_periods() {
    let temp_dir = setup_test_dir();
    log_first_day(temp_dir.path(), "2014-01-31");
    log_first_day(temp_dir.path(), "2014-02-27");

    let stats = stats_json(temp_dir.path(), "2014-03-10");

    assert_eq!(stats["average_cycle_length"], 27);
    assert_eq!(stats["current_cycle_length"], 11);
    assert_eq!(stats["cycle_length_minimum"], 27);
    assert_eq!(stats["cycle_length_maximum"], 27);
    assert_eq!(stats["cycle_length_mean"], 27.0);
    assert!(stats["cycle_length_mode"].is_null());
    assert!(stats["cycle_length_standard_deviation"].is_null());

    let predicted = stats["predicted_events"].as_array().unwrap();
    assert_eq!(predicted.len(), 6);
    assert_eq!(predicted[0]["timestamp"], "2014-03-12");
    assert_eq!(predicted[0]["type"], "projected ovulation");
    assert_eq!(predicted[1]["timestamp"], "2014-03-26");
    assert_eq!(predicted[1]["type"], "projected period");
}

#[test]
fn test_non_first_day_events_are_ignored() {
    let temp_dir = setup_test_dir();
    log_first_day(temp_dir.path(), "2014-01-31");
    cli(temp_dir.path())
        .args(["log", "--at", "2014-02-01", "--level", "heavy", "--cramps", "severe"])
        .assert()
        .success();

    let stats = stats_json(temp_dir.path(), "2014-02-05");
    assert_eq!(stats["current_cycle_length"], 5);
    assert!(stats["cycle_length_minimum"].is_null());
}

#[test]
fn test_log_rejects_unknown_level() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .args(["log", "--at", "2014-01-31", "--level", "gushing"])
        .assert()
        .failure();
}

#[test]
fn test_log_rejects_bad_date() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .args(["log", "--at", "last tuesday"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid date or timestamp"));
}

#[test]
fn test_stats_text_output() {
    let temp_dir = setup_test_dir();
    log_first_day(temp_dir.path(), "2014-01-31");
    log_first_day(temp_dir.path(), "2014-02-27");

    cli(temp_dir.path())
        .args(["stats", "--now", "2014-03-10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Average cycle length: 27 days"))
        .stdout(predicate::str::contains("Current cycle length: 11 days"))
        .stdout(predicate::str::contains("2014-03-26  projected period"));
}

#[test]
fn test_notify_buckets() {
    let temp_dir = setup_test_dir();
    log_first_day(temp_dir.path(), "2014-01-31");
    log_first_day(temp_dir.path(), "2014-02-27");

    let cases = [
        ("2014-03-12", "Ovulation today!"),
        ("2014-03-23", "Period expected in 3 days"),
        ("2014-03-26", "Period today!"),
        ("2014-03-29", "Period was expected 3 days ago"),
        ("2014-03-15", "Next period expected in 11 days"),
    ];
    for (today, expected) in cases {
        cli(temp_dir.path())
            .args(["notify", "--today", today])
            .assert()
            .success()
            .stdout(predicate::str::contains(expected));
    }
}

#[test]
fn test_notify_without_periods() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .args(["notify", "--today", "2014-03-12"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No periods recorded."));
}

#[test]
fn test_reference() {
    let temp_dir = setup_test_dir();
    log_first_day(temp_dir.path(), "2014-02-27");

    cli(temp_dir.path())
        .args(["reference", "--at", "2014-03-05"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2014-03-05: cycle day 7"));

    // Before the first period the next one is shown as day 1
    let output = cli(temp_dir.path())
        .args(["reference", "--at", "2014-02-01", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let reference: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(reference["first_date"], "2014-02-27");
    assert_eq!(reference["first_day"], 1);
}

#[test]
fn test_remove_event() {
    let temp_dir = setup_test_dir();
    log_first_day(temp_dir.path(), "2014-01-31");
    log_first_day(temp_dir.path(), "2014-02-27");

    let log_path = temp_dir.path().join("data/events.jsonl");
    let contents = fs::read_to_string(&log_path).unwrap();
    let last: serde_json::Value =
        serde_json::from_str(contents.lines().last().unwrap()).unwrap();
    let id = last["id"].as_str().unwrap();

    cli(temp_dir.path())
        .args(["remove", id])
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Removed flow event"));

    let stats = stats_json(temp_dir.path(), "2014-03-10");
    assert_eq!(stats["average_cycle_length"], 28);
    assert!(stats["cycle_length_minimum"].is_null());
}

#[test]
fn test_remove_unknown_event_fails() {
    let temp_dir = setup_test_dir();
    log_first_day(temp_dir.path(), "2014-01-31");

    cli(temp_dir.path())
        .args(["remove", "00000000-0000-0000-0000-000000000000"])
        .assert()
        .failure();
}

#[test]
fn test_history_and_frequency() {
    let temp_dir = setup_test_dir();
    for date in ["2014-01-01", "2014-01-29", "2014-02-26", "2014-03-25"] {
        log_first_day(temp_dir.path(), date);
    }

    cli(temp_dir.path())
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("2014-01-01  28 days"))
        .stdout(predicate::str::contains("2014-02-26  27 days"));

    cli(temp_dir.path())
        .arg("frequency")
        .assert()
        .success()
        .stdout(predicate::str::contains(" 27 days: 1"))
        .stdout(predicate::str::contains(" 28 days: 2"));
}

#[test]
fn test_export_and_import_roundtrip() {
    let temp_dir = setup_test_dir();
    log_first_day(temp_dir.path(), "2014-01-01");
    log_first_day(temp_dir.path(), "2014-01-29");

    let events_csv = temp_dir.path().join("out/events.csv");
    let cycles_csv = temp_dir.path().join("out/cycles.csv");
    cli(temp_dir.path())
        .arg("export")
        .arg("--events")
        .arg(&events_csv)
        .arg("--cycles")
        .arg(&cycles_csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Exported 1 cycles"))
        .stdout(predicate::str::contains("✓ Exported 2 flow events"));

    assert_eq!(
        fs::read_to_string(&cycles_csv).unwrap(),
        "start_date,cycle_length\n2014-01-01,28\n"
    );

    // Import into a fresh data directory
    let other = setup_test_dir();
    cli(other.path())
        .arg("import")
        .arg(&events_csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Imported 2 flow events"));

    let stats = stats_json(other.path(), "2014-02-01");
    assert_eq!(stats["average_cycle_length"], 28);
    assert_eq!(stats["current_cycle_length"], 3);
}

#[test]
fn test_reimport_does_not_duplicate_events() {
    let temp_dir = setup_test_dir();
    log_first_day(temp_dir.path(), "2014-01-31");
    log_first_day(temp_dir.path(), "2014-02-28");

    let events_csv = temp_dir.path().join("events.csv");
    cli(temp_dir.path())
        .arg("export")
        .arg("--events")
        .arg(&events_csv)
        .assert()
        .success();

    cli(temp_dir.path())
        .arg("import")
        .arg(&events_csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Imported 0 flow events"))
        .stdout(predicate::str::contains("Skipped 2 already stored"));

    let log = fs::read_to_string(temp_dir.path().join("data/events.jsonl")).unwrap();
    assert_eq!(log.lines().count(), 2);

    let stats = stats_json(temp_dir.path(), "2014-03-01");
    assert_eq!(stats["average_cycle_length"], 28);
    assert_eq!(stats["cycle_length_minimum"], 28);
}

#[test]
fn test_remove_is_scoped_to_user() {
    let temp_dir = setup_test_dir();
    log_first_day(temp_dir.path(), "2014-01-31");

    let log = fs::read_to_string(temp_dir.path().join("data/events.jsonl")).unwrap();
    let event: serde_json::Value = serde_json::from_str(log.lines().next().unwrap()).unwrap();
    let id = event["id"].as_str().unwrap();

    cli(temp_dir.path())
        .args(["--user", "someone-else", "remove", id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NotFound"));

    let log = fs::read_to_string(temp_dir.path().join("data/events.jsonl")).unwrap();
    assert_eq!(log.lines().count(), 1);
}

#[test]
fn test_config_with_oversized_luteal_phase_is_rejected() {
    let temp_dir = setup_test_dir();
    fs::write(
        temp_dir.path().join("config.toml"),
        "[user]\nluteal_phase_length = 1000000000000000\n",
    )
    .unwrap();

    cli(temp_dir.path())
        .args(["stats", "--now", "2014-03-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("luteal_phase_length"));
}

#[test]
fn test_export_requires_a_target() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path()).arg("export").assert().failure();
}

#[test]
fn test_users_are_isolated() {
    let temp_dir = setup_test_dir();
    log_first_day(temp_dir.path(), "2014-01-01");
    log_first_day(temp_dir.path(), "2014-01-21");

    let output = cli(temp_dir.path())
        .args(["--user", "someone-else", "stats", "--now", "2014-02-01", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats["average_cycle_length"], 28);
    assert_eq!(stats["current_cycle_length"], -1);
}

#[test]
fn test_timezone_offset_shifts_calendar_day() {
    let temp_dir = setup_test_dir();
    fs::write(
        temp_dir.path().join("config.toml"),
        "[user]\nid = \"jessamyn\"\nutc_offset_minutes = -300\n",
    )
    .unwrap();

    // 03:00 UTC on Feb 1 is still Jan 31 at UTC-5
    cli(temp_dir.path())
        .args(["log", "--at", "2014-02-01T03:00:00Z", "--first-day"])
        .assert()
        .success();

    cli(temp_dir.path())
        .args(["reference", "--at", "2014-01-31T23:00:00-05:00"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2014-01-31: cycle day 1"));
}
