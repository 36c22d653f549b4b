//! Concurrency tests for eggtimer.
//!
//! Several processes writing the same data directory must not lose,
//! interleave or overwrite each other's records.

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use std::thread;
use tempfile::TempDir;

fn setup_test_dir() -> TempDir {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    std::fs::write(
        temp_dir.path().join("config.toml"),
        "[user]\nid = \"jessamyn\"\n",
    )
    .expect("Failed to write config");
    temp_dir
}

fn cli(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("eggtimer"));
    cmd.arg("--config")
        .arg(dir.join("config.toml"))
        .arg("--data-dir")
        .arg(dir.join("data"));
    cmd
}

#[test]
fn test_concurrent_event_logging() {
    let temp_dir = setup_test_dir();
    let dir: PathBuf = temp_dir.path().to_path_buf();

    let handles: Vec<_> = (1..=5)
        .map(|day| {
            let dir = dir.clone();
            thread::spawn(move || {
                cli(&dir)
                    .args(["log", "--at"])
                    .arg(format!("2014-01-{:02}", day * 5))
                    .assert()
                    .success();
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("logging thread panicked");
    }

    let contents = std::fs::read_to_string(dir.join("data/events.jsonl"))
        .expect("Failed to read event log");
    assert_eq!(contents.lines().count(), 5);
    for line in contents.lines() {
        serde_json::from_str::<serde_json::Value>(line).expect("interleaved line");
    }
}

#[test]
fn test_concurrent_users_keep_stored_statistics() {
    let temp_dir = setup_test_dir();
    let dir: PathBuf = temp_dir.path().to_path_buf();

    let handles: Vec<_> = (0..6)
        .map(|n| {
            let dir = dir.clone();
            thread::spawn(move || {
                cli(&dir)
                    .arg("--user")
                    .arg(format!("user-{}", n))
                    .args(["log", "--at", "2014-01-31", "--first-day"])
                    .assert()
                    .success();
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("logging thread panicked");
    }

    let contents = std::fs::read_to_string(dir.join("data/statistics.json"))
        .expect("Failed to read statistics");
    let stored: serde_json::Value = serde_json::from_str(&contents).unwrap();
    let users = stored["users"].as_object().unwrap();
    assert_eq!(users.len(), 6);
}

#[test]
fn test_logging_while_removing() {
    let temp_dir = setup_test_dir();
    let dir: PathBuf = temp_dir.path().to_path_buf();

    for day in 1..=4 {
        cli(&dir)
            .args(["log", "--at"])
            .arg(format!("2014-01-{:02}", day))
            .assert()
            .success();
    }
    let log_path = dir.join("data/events.jsonl");
    let seeded: Vec<String> = std::fs::read_to_string(&log_path)
        .unwrap()
        .lines()
        .map(|line| {
            let event: serde_json::Value = serde_json::from_str(line).unwrap();
            event["id"].as_str().unwrap().to_string()
        })
        .collect();

    let remover = {
        let dir = dir.clone();
        thread::spawn(move || {
            for id in seeded {
                cli(&dir).arg("remove").arg(&id).assert().success();
            }
        })
    };
    for day in 10..=17 {
        cli(&dir)
            .args(["log", "--first-day", "--at"])
            .arg(format!("2014-02-{:02}", day))
            .assert()
            .success();
    }
    remover.join().expect("remove thread panicked");

    let remaining = std::fs::read_to_string(&log_path).unwrap();
    assert_eq!(remaining.lines().count(), 8);
    for line in remaining.lines() {
        let event: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(event["first_day"], true);
    }
}
