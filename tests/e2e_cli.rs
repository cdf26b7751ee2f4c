//! CLI end-to-end tests
//!
//! Tests for the scribeflow command-line interface.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the scribeflow binary
#[allow(deprecated)]
fn scribeflow_cmd() -> Command {
    Command::cargo_bin("scribeflow").unwrap()
}

/// Write a config whose relative paths all live under `dir`.
fn write_config(dir: &Path, env_prefix: &str) -> std::path::PathBuf {
    let config_path = dir.join("scribeflow.toml");
    let content = format!(
        r#"
[credentials]
env_prefix = "{env_prefix}"
cursor_path = "{cursor}"

[workspace]
inbox = "{inbox}"
work_dir = "{work}"

[logs]
success_log = "{ok}"
failure_log = "{fail}"
"#,
        cursor = dir.join(".session_data.json").display(),
        inbox = dir.join("inbox").display(),
        work = dir.join("work").display(),
        ok = dir.join("processed_success.log").display(),
        fail = dir.join("processed_failure.log").display(),
    );
    fs::write(&config_path, content).unwrap();
    config_path
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = scribeflow_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = scribeflow_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("scribeflow"))
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = scribeflow_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_check_tools_command() {
    let mut cmd = scribeflow_cmd();
    cmd.arg("check-tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("ffmpeg"));
}

#[test]
fn test_cli_validate_default_config() {
    let dir = tempdir().unwrap();
    let mut cmd = scribeflow_cmd();
    cmd.current_dir(dir.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("using defaults"))
        .stdout(predicate::str::contains("GOOGLE_API_KEY"))
        .stdout(predicate::str::contains("edit -> z2_edited.txt"));
}

#[test]
fn test_cli_validate_custom_config() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "CLI_VALIDATE_KEY");

    let mut cmd = scribeflow_cmd();
    cmd.arg("validate")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("CLI_VALIDATE_KEY"));
}

#[test]
fn test_cli_validate_rejects_bad_config() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("bad.toml");
    fs::write(&config, "[pipeline]\nconcurrency = 0\n").unwrap();

    let mut cmd = scribeflow_cmd();
    cmd.arg("validate")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("concurrency"));
}

#[test]
fn test_cli_keys_shows_hints_only() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "CLI_KEYS_TEST");
    fs::write(dir.path().join(".session_data.json"), r#"{"lastKeyIndex": 0}"#).unwrap();

    let mut cmd = scribeflow_cmd();
    cmd.arg("--config")
        .arg(&config)
        .arg("keys")
        .env("CLI_KEYS_TEST", "AIzaFirstSecretAAAA")
        .env("CLI_KEYS_TEST_1", "AIzaSecondSecretBBBB")
        .assert()
        .success()
        .stdout(predicate::str::contains("Keys under CLI_KEYS_TEST*: 2"))
        .stdout(predicate::str::contains("…AAAA"))
        .stdout(predicate::str::contains("…BBBB"))
        .stdout(predicate::str::contains("Next key: index 1"))
        .stdout(predicate::str::contains("AIzaFirstSecret").not());
}

#[test]
fn test_cli_run_without_keys_fails() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "CLI_RUN_NO_KEYS");

    let mut cmd = scribeflow_cmd();
    cmd.arg("--config")
        .arg(&config)
        .arg("run")
        .env_remove("CLI_RUN_NO_KEYS")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No credentials available"));

    assert!(!dir.path().join(".session_data.json").exists());
}

#[test]
fn test_cli_run_with_empty_inbox_saves_cursor() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "CLI_RUN_EMPTY");
    fs::create_dir(dir.path().join("inbox")).unwrap();
    fs::write(dir.path().join(".session_data.json"), r#"{"lastKeyIndex": 1}"#).unwrap();

    let mut cmd = scribeflow_cmd();
    cmd.arg("--config")
        .arg(&config)
        .arg("run")
        .env("CLI_RUN_EMPTY", "k0")
        .env("CLI_RUN_EMPTY_1", "k1")
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to process"));

    let saved = fs::read_to_string(dir.path().join(".session_data.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&saved).unwrap();
    assert_eq!(value["lastKeyIndex"], 1);
    assert!(dir.path().join("work/output").is_dir());
}

#[test]
fn test_cli_run_missing_input_file() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "CLI_RUN_MISSING");

    let mut cmd = scribeflow_cmd();
    cmd.arg("--config")
        .arg(&config)
        .arg("run")
        .arg("--input")
        .arg(dir.path().join("nope.mp4"))
        .env("CLI_RUN_MISSING", "k0")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file does not exist"));
}
