#![allow(deprecated)] // cargo_bin! macro doesn't exist yet in assert_cmd 2.1

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn oxserve(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("oxserve").unwrap();
    cmd.current_dir(dir);
    cmd.env_remove("RUST_LOG");
    cmd
}

/// A working directory holding `apps/` with one small app in it.
fn create_site() -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let apps = temp_dir.path().join("apps");
    fs::create_dir_all(apps.join("home")).unwrap();
    fs::create_dir_all(apps.join("docs/notes")).unwrap();
    fs::write(apps.join("home/index.html"), "<h1>home</h1>\n").unwrap();
    fs::write(apps.join("home/app.icon"), [0u8, 0, 1, 0]).unwrap();
    fs::write(apps.join("docs/guide.txt"), "guide\n").unwrap();
    fs::write(apps.join("docs/notes/todo.txt"), "todo\n").unwrap();
    temp_dir
}

fn write_config(dir: &TempDir, content: &str) {
    fs::write(dir.path().join("oxserve.toml"), content).unwrap();
}

// ============================================================================
// Help and Version
// ============================================================================

#[test]
fn test_help() {
    let temp = TempDir::new().unwrap();
    oxserve(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cached static app server"))
        .stdout(predicate::str::contains("--no-watch"))
        .stdout(predicate::str::contains("EXAMPLES"));
}

#[test]
fn test_version() {
    let temp = TempDir::new().unwrap();
    oxserve(temp.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("oxserve"));
}

#[test]
fn test_unknown_flag_is_usage_error() {
    let temp = TempDir::new().unwrap();
    oxserve(temp.path()).arg("--bogus").assert().code(2);
}

// ============================================================================
// Check Mode
// ============================================================================

#[test]
fn test_check_without_config_uses_defaults() {
    let temp = create_site();
    oxserve(temp.path())
        .arg("--check")
        .assert()
        .success()
        .stdout(predicate::str::contains("cached: 4 files, 4 folders, 0 failed"))
        .stdout(predicate::str::contains("/apps"))
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn test_check_with_site_config() {
    let temp = create_site();
    write_config(
        &temp,
        r#"
[network]
port = 9000

[cache]
root = "./apps"

[site]
landing_page = "home"
default_app = "home"

[site.path_map]
"/docs" = "docs"
"#,
    );

    oxserve(temp.path())
        .arg("--check")
        .assert()
        .success()
        .stdout(predicate::str::contains("/favicon.ico"))
        .stdout(predicate::str::contains("/docs"))
        .stdout(predicate::str::contains("/apps"));
}

#[test]
fn test_check_with_root_override() {
    let temp = create_site();
    oxserve(temp.path())
        .args(["--check", "--root", "apps/docs", "--no-optimize"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cached: 2 files, 2 folders, 0 failed"));
}

#[test]
fn test_quiet_check_keeps_summary_only() {
    let temp = create_site();
    oxserve(temp.path())
        .args(["--check", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cached:"))
        .stderr(predicate::str::is_empty());
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_invalid_config_exits_with_config_error() {
    let temp = create_site();
    write_config(&temp, "[network]\nport = \"not a port\"\n");

    oxserve(temp.path())
        .arg("--check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Failed to parse config file"));
}

#[test]
fn test_missing_root_exits_with_config_error() {
    let temp = TempDir::new().unwrap();
    oxserve(temp.path())
        .args(["--check", "--root", "does-not-exist"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Cache root is not a directory"));
}

#[test]
fn test_mount_outside_root_exits_with_config_error() {
    let temp = create_site();
    let outside = TempDir::new().unwrap();
    write_config(
        &temp,
        &format!(
            "[site.path_map]\n\"/elsewhere\" = {:?}\n",
            outside.path().display().to_string()
        ),
    );

    oxserve(temp.path())
        .arg("--check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid route /elsewhere"));
}

#[test]
fn test_relative_prefix_exits_with_config_error() {
    let temp = create_site();
    write_config(&temp, "[site.path_map]\n\"docs\" = \"docs\"\n");

    oxserve(temp.path())
        .arg("--check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid route"));
}
