// ABOUTME: Integration tests for the heckx-deploy CLI.
// ABOUTME: Covers argument parsing, early failures, the confirmation gate and backup listing.

use assert_cmd::Command;
use chrono::Utc;
use heckx_deploy::backup::{BackupRecord, BackupStore};
use heckx_deploy::types::Environment;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

fn heckx_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("heckx-deploy"))
}

fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(".env.production"), "FLASK_ENV=production\n").unwrap();
    fs::write(dir.path().join("docker-compose.yml"), "services: {}\n").unwrap();
    dir
}

fn seed_backup(dir: &Path, environment: Environment) -> BackupRecord {
    let store = BackupStore::new(dir.join("backups"));
    let now = Utc::now();
    let path = store.allocate(environment, now).unwrap();
    let record = BackupRecord::new(path, environment, now);
    store.write_manifest(&record).unwrap();
    store.record_last(&record).unwrap();
    record
}

#[test]
fn help_shows_flags() {
    heckx_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("[ENVIRONMENT]"))
        .stdout(predicate::str::contains("--skip-tests"))
        .stdout(predicate::str::contains("--rollback"))
        .stdout(predicate::str::contains("--list-backups"))
        .stdout(predicate::str::contains("--timeout"));
}

#[test]
fn unknown_environment_is_rejected() {
    heckx_cmd()
        .arg("qa")
        .assert()
        .failure()
        .stderr(predicate::str::contains("qa"));
}

#[test]
fn conflicting_flags_are_rejected() {
    heckx_cmd()
        .args(["staging", "--rollback", "--skip-tests"])
        .assert()
        .failure();
    heckx_cmd()
        .args(["staging", "--quiet", "--json"])
        .assert()
        .failure();
}

#[test]
fn missing_settings_file_is_a_configuration_error() {
    let dir = project();

    heckx_cmd()
        .args(["staging", "--skip-tests", "--project-dir"])
        .arg(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error: configuration error"))
        .stderr(predicate::str::contains(".env.staging"));

    assert!(!dir.path().join("backups").exists());
    assert!(
        !dir.path().join(".deploy/locks/staging.lock").exists(),
        "lock released on failure"
    );
}

#[test]
fn production_without_terminal_requires_force() {
    let dir = project();

    heckx_cmd()
        .arg("--project-dir")
        .arg(dir.path())
        .write_stdin("")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("requires confirmation"))
        .stderr(predicate::str::contains("--force"));

    assert!(!dir.path().join(".deploy").exists(), "nothing done before confirming");
}

#[test]
fn rollback_without_terminal_requires_force() {
    let dir = project();

    heckx_cmd()
        .args(["staging", "--rollback", "--project-dir"])
        .arg(dir.path())
        .write_stdin("")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("requires confirmation"));
}

#[test]
fn forced_rollback_without_backup_fails_cleanly() {
    let dir = project();

    heckx_cmd()
        .args(["staging", "--rollback", "--force", "--project-dir"])
        .arg(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no backup found"));
}

#[test]
fn invalid_config_is_reported() {
    let dir = project();
    fs::write(dir.path().join("deploy.yml"), "project: Not Valid\n").unwrap();

    heckx_cmd()
        .args(["staging", "--list-backups", "--project-dir"])
        .arg(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::starts_with("Error:"));
}

#[test]
fn list_backups_on_empty_project() {
    let dir = project();

    heckx_cmd()
        .args(["staging", "--list-backups", "--project-dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No backups for staging"));
}

#[test]
fn list_backups_filters_by_environment() {
    let dir = project();
    let record = seed_backup(dir.path(), Environment::Production);
    seed_backup(dir.path(), Environment::Staging);

    heckx_cmd()
        .args(["production", "--list-backups", "--project-dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("  {}", record.name())))
        .stdout(predicate::str::contains("staging-").not());
}

#[test]
fn list_backups_as_json() {
    let dir = project();
    let record = seed_backup(dir.path(), Environment::Staging);

    let output = heckx_cmd()
        .args(["staging", "--list-backups", "--json", "--project-dir"])
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let line = String::from_utf8(output.stdout).unwrap();
    let event: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(event["event"], "backup");
    assert_eq!(event["data"]["environment"], "staging");
    assert_eq!(event["data"]["last"], true);
    assert_eq!(event["data"]["path"], record.path.to_str().unwrap());
}
