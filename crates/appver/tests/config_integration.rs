//! Configuration integration tests.
//!
//! Config discovery, format parsing and precedence, observed through
//! `appver doctor --json`, which reports the merged files and the default
//! stage they produce.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// A temp project bounded by `.git` so discovery never leaves it.
fn project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::create_dir(tmp.path().join(".git")).unwrap();
    tmp
}

#[allow(deprecated)]
fn cmd(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
    cmd.env("XDG_CONFIG_HOME", root.join("xdg"))
        .env("APPVER_LOG_DIR", root.join("logs"))
        .env_remove("PACKAGE_REPO_STAGE")
        .env_remove("RUST_LOG");
    cmd
}

/// Doctor report for a run from `dir`. Readiness may fail; only the
/// report matters here.
fn doctor(root: &Path, dir: &Path) -> serde_json::Value {
    let output = cmd(root)
        .args(["-C", dir.to_str().unwrap(), "doctor", "--json"])
        .output()
        .unwrap();
    serde_json::from_slice(&output.stdout).unwrap()
}

fn files(report: &serde_json::Value) -> Vec<String> {
    report["config"]["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f.as_str().unwrap().to_string())
        .collect()
}

// =============================================================================
// Config File Discovery
// =============================================================================

#[test]
fn runs_without_config_file() {
    let tmp = project();
    let report = doctor(tmp.path(), tmp.path());
    assert!(files(&report).is_empty());
    assert_eq!(report["default_stage"], "DEV");
}

#[test]
fn discovers_dotfile_config_in_current_dir() {
    let tmp = project();
    fs::write(tmp.path().join(".appver.toml"), r#"stage = "QA""#).unwrap();

    let report = doctor(tmp.path(), tmp.path());
    assert_eq!(report["default_stage"], "QA");
    assert!(files(&report)[0].ends_with(".appver.toml"));
}

#[test]
fn discovers_regular_config_in_current_dir() {
    let tmp = project();
    fs::write(tmp.path().join("appver.toml"), r#"stage = "UAT""#).unwrap();

    assert_eq!(doctor(tmp.path(), tmp.path())["default_stage"], "UAT");
}

#[test]
fn discovers_config_in_parent_directory() {
    let tmp = project();
    let sub_dir = tmp.path().join("nested").join("deep");
    fs::create_dir_all(&sub_dir).unwrap();
    fs::write(tmp.path().join(".appver.toml"), r#"stage = "PROD""#).unwrap();

    assert_eq!(doctor(tmp.path(), &sub_dir)["default_stage"], "PROD");
}

#[test]
fn dotfile_takes_precedence_over_regular_name() {
    let tmp = project();
    fs::write(tmp.path().join(".appver.toml"), r#"stage = "DOT""#).unwrap();
    fs::write(tmp.path().join("appver.toml"), r#"stage = "PLAIN""#).unwrap();

    assert_eq!(doctor(tmp.path(), tmp.path())["default_stage"], "DOT");
}

#[test]
fn discovery_stops_at_git_boundary() {
    let outer = TempDir::new().unwrap();
    fs::write(outer.path().join(".appver.toml"), r#"stage = "OUTER""#).unwrap();
    let inner = outer.path().join("repo");
    fs::create_dir_all(inner.join(".git")).unwrap();
    let nested = inner.join("src");
    fs::create_dir_all(&nested).unwrap();

    assert_eq!(doctor(outer.path(), &nested)["default_stage"], "DEV");
}

// =============================================================================
// Config Format Parsing
// =============================================================================

#[test]
fn parses_yaml_config() {
    let tmp = project();
    fs::write(
        tmp.path().join(".appver.yaml"),
        "stage: STAGING\ncollaborator:\n  interpreter: sh\n",
    )
    .unwrap();

    assert_eq!(doctor(tmp.path(), tmp.path())["default_stage"], "STAGING");
}

#[test]
fn parses_json_config() {
    let tmp = project();
    fs::write(
        tmp.path().join(".appver.json"),
        r#"{"stage": "JSON", "output": {"format": "raw"}}"#,
    )
    .unwrap();

    assert_eq!(doctor(tmp.path(), tmp.path())["default_stage"], "JSON");
}

#[test]
fn invalid_config_value_fails() {
    let tmp = project();
    fs::write(
        tmp.path().join(".appver.toml"),
        "[output]\nformat = \"fancy\"\n",
    )
    .unwrap();

    cmd(tmp.path())
        .args(["-C", tmp.path().to_str().unwrap(), "doctor"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to load configuration"));
}

// =============================================================================
// Precedence
// =============================================================================

#[test]
fn explicit_config_overrides_discovered() {
    let tmp = project();
    fs::write(tmp.path().join(".appver.toml"), r#"stage = "FOUND""#).unwrap();
    let explicit = tmp.path().join("ci.toml");
    fs::write(&explicit, r#"stage = "EXPLICIT""#).unwrap();

    let output = cmd(tmp.path())
        .args([
            "-C",
            tmp.path().to_str().unwrap(),
            "--config",
            explicit.to_str().unwrap(),
            "doctor",
            "--json",
        ])
        .output()
        .unwrap();
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["default_stage"], "EXPLICIT");
    assert_eq!(files(&report).len(), 2);
}

#[test]
fn user_config_is_lowest_precedence() {
    let tmp = project();
    let user_dir = tmp.path().join("xdg").join("appver");
    fs::create_dir_all(&user_dir).unwrap();
    fs::write(user_dir.join("config.toml"), r#"stage = "USER""#).unwrap();

    assert_eq!(doctor(tmp.path(), tmp.path())["default_stage"], "USER");

    fs::write(tmp.path().join(".appver.toml"), r#"stage = "PROJECT""#).unwrap();
    assert_eq!(doctor(tmp.path(), tmp.path())["default_stage"], "PROJECT");
}

#[test]
fn environment_beats_config_stage() {
    let tmp = project();
    fs::write(tmp.path().join(".appver.toml"), r#"stage = "QA""#).unwrap();

    let output = cmd(tmp.path())
        .env("PACKAGE_REPO_STAGE", "HOTFIX")
        .args(["-C", tmp.path().to_str().unwrap(), "doctor", "--json"])
        .output()
        .unwrap();
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["default_stage"], "HOTFIX");
}
