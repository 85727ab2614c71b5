//! CLI surface tests: help text, config validation, and the offline
//! markets listing.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn write_config(dir: &TempDir) -> std::path::PathBuf {
    let db_path = dir.path().join("test.sqlite");
    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
[market]
fee_bps = 100
min_bet_lamports = 10000000
epoch_seconds = 900
feed_id = "0xef0d8b6fda2ceba41da15d4095d1da392a0d2f8ed0c6c7bc0f4cfac8c280b56d"

[database]
path = "{}"
"#,
            db_path.display()
        ),
    )
    .unwrap();
    config_path
}

#[test]
fn help_lists_subcommands() {
    Command::cargo_bin("updown")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("once"))
        .stdout(predicate::str::contains("markets"))
        .stdout(predicate::str::contains("check-config"));
}

#[test]
fn version_flag_works() {
    Command::cargo_bin("updown")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("updown"));
}

#[test]
fn missing_config_file_fails_cleanly() {
    Command::cargo_bin("updown")
        .unwrap()
        .args(["--config", "/nonexistent/config.toml", "check-config"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn check_config_prints_effective_settings() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    Command::cargo_bin("updown")
        .unwrap()
        .args(["--config", config.to_str().unwrap(), "check-config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("configuration is valid"))
        .stdout(predicate::str::contains("100 bps"));
}

#[test]
fn invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        r#"
[market]
fee_bps = 20000
min_bet_lamports = 1
epoch_seconds = 900
feed_id = "0xabc"
"#,
    )
    .unwrap();

    Command::cargo_bin("updown")
        .unwrap()
        .args(["--config", config_path.to_str().unwrap(), "check-config"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("fee_bps"));
}

#[test]
fn markets_on_empty_archive_reports_none() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    Command::cargo_bin("updown")
        .unwrap()
        .args(["--config", config.to_str().unwrap(), "markets"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no markets archived yet"));
}

#[test]
fn markets_json_output_is_valid_json() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    let output = Command::cargo_bin("updown")
        .unwrap()
        .args(["--config", config.to_str().unwrap(), "markets", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let parsed: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert!(parsed.is_array());
}
