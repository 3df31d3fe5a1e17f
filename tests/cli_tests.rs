//! Binary tests: argument handling and exit codes

#![allow(deprecated)] // Command::cargo_bin deprecation - no stable replacement yet

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn dtforge(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("dtforge").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("RUST_LOG")
        .env_remove("DTFORGE_INPUT")
        .env_remove("DTFORGE_OUTPUT");
    cmd
}

#[test]
fn test_cli_help() {
    let dir = TempDir::new().unwrap();
    dtforge(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--no-fill-dashes"))
        .stdout(predicate::str::contains("--report"));
}

#[test]
fn test_cli_version() {
    let dir = TempDir::new().unwrap();
    dtforge(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dtforge"));
}

#[test]
fn test_unknown_option_exits_2() {
    let dir = TempDir::new().unwrap();
    dtforge(&dir).arg("--no-such-option").assert().code(2);
}

#[test]
fn test_empty_input_succeeds() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("input/decision-logic")).unwrap();
    dtforge(&dir)
        .arg("--report")
        .arg("report.json")
        .assert()
        .success()
        .stdout(predicate::str::contains("Extraction complete"));

    let report = fs::read_to_string(dir.path().join("report.json")).unwrap();
    assert!(report.contains("\"installed\": true"));
    assert!(dir.path().join("output").is_dir());
}

#[test]
fn test_missing_input_directory_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    dtforge(&dir).args(["--input", "nowhere", "--quiet"]).assert().success();
}

#[test]
fn test_output_directory_from_environment() {
    let dir = TempDir::new().unwrap();
    dtforge(&dir)
        .env("DTFORGE_OUTPUT", "generated")
        .arg("--quiet")
        .assert()
        .success();
    assert!(dir.path().join("generated").is_dir());
}

#[test]
fn test_install_failure_exits_1() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("output"), "a file where the output directory should be").unwrap();
    dtforge(&dir)
        .arg("--quiet")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("could not install resources"));
}
