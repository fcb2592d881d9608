//! CLI integration tests for short
//!
//! Every test runs against a throwaway config directory and never reaches
//! the real service: commands either stop before any request or talk to a
//! closed local port.

use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// An API root nothing listens on
const DEAD_API: &str = "http://127.0.0.1:9/api/v3";

/// Get a command instance for the short binary, isolated from the user's
/// config and environment
fn short_cmd(config_dir: &TempDir) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("short"));
    cmd.env("SHORTCUT_CONFIG_DIR", config_dir.path())
        .env("HOME", config_dir.path())
        .env("SHORTCUT_API_URL", DEAD_API)
        .env_remove("SHORTCUT_API_TOKEN")
        .env_remove("CLUBHOUSE_API_TOKEN")
        .env_remove("SHORTCUT_MENTION_NAME")
        .env_remove("SHORTCUT_URL_SLUG")
        .env_remove("RUST_LOG");
    cmd
}

/// A config directory holding a token and the given workspaces
fn installed(workspaces: serde_json::Value) -> TempDir {
    let dir = TempDir::new().unwrap();
    let config = serde_json::json!({
        "token": "test-token",
        "mentionName": "alice",
        "urlSlug": "acme",
        "workspaces": workspaces,
    });
    fs::write(
        dir.path().join("config.json"),
        serde_json::to_string_pretty(&config).unwrap(),
    )
    .unwrap();
    dir
}

fn read_config(dir: &TempDir) -> serde_json::Value {
    let content = fs::read_to_string(dir.path().join("config.json")).unwrap();
    serde_json::from_str(&content).unwrap()
}

// =============================================================================
// Help
// =============================================================================

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();

    short_cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("search"))
        .stdout(predicate::str::contains("workspace"))
        .stdout(predicate::str::contains("iterations"));
}

#[test]
fn test_unknown_flag_is_a_usage_error() {
    let dir = TempDir::new().unwrap();

    short_cmd(&dir)
        .args(["search", "--no-such-flag"])
        .assert()
        .failure()
        .code(2);
}

// =============================================================================
// Workspaces
// =============================================================================

#[test]
fn test_workspace_without_install_gives_guidance() {
    let dir = TempDir::new().unwrap();

    short_cmd(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Not installed yet."))
        .stdout(predicate::str::contains("short install"));
}

#[test]
fn test_workspace_without_saved_searches_gives_guidance() {
    let dir = installed(serde_json::json!({}));

    short_cmd(&dir)
        .arg("workspace")
        .assert()
        .success()
        .stdout(predicate::str::contains("No workspace saved."))
        .stdout(predicate::str::contains("short search [options] --save"));
}

#[test]
fn test_workspace_list_prints_flags() {
    let dir = installed(serde_json::json!({
        "default": {"args": ["owner:%self%"], "state": "Started"},
        "bugs": {"type": "bug", "archived": true}
    }));

    short_cmd(&dir)
        .args(["workspace", "--list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Workspaces:"))
        .stdout(predicate::str::contains("  default: --state 'Started' 'owner:%self%'"))
        .stdout(predicate::str::contains("  bugs: --archived --type 'bug'"));
}

#[test]
fn test_legacy_workspace_blank_values_are_unset() {
    let dir = installed(serde_json::json!({
        "legacy": {
            "args": [],
            "created": "",
            "quiet": "",
            "label": "",
            "state": "Started",
            "sort": "",
            "format": ""
        }
    }));

    short_cmd(&dir)
        .args(["workspace", "--list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("  legacy: --state 'Started'\n"))
        .stdout(predicate::str::contains("--format").not());
}

#[test]
fn test_workspace_list_as_json() {
    let dir = installed(serde_json::json!({"default": {"owner": "alice"}}));

    let out = short_cmd(&dir)
        .args(["--output", "json", "w", "--list"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(value["default"]["owner"], "alice");
}

#[test]
fn test_workspace_unset_removes_entry() {
    let dir = installed(serde_json::json!({
        "default": {"owner": "alice"},
        "old": {"owner": "bob"}
    }));

    short_cmd(&dir)
        .args(["workspace", "--unset", "old"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Successfully removed old workspace"));

    let config = read_config(&dir);
    assert!(config["workspaces"].get("old").is_none());
    assert_eq!(config["workspaces"]["default"]["owner"], "alice");
    assert_eq!(config["token"], "test-token");
}

#[test]
fn test_workspace_unset_unknown_reports_failure() {
    let dir = installed(serde_json::json!({"default": {"owner": "alice"}}));

    short_cmd(&dir)
        .args(["workspace", "--unset", "missing"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Failed to remove missing workspace"));
}

#[test]
fn test_unknown_workspace_gives_guidance() {
    let dir = installed(serde_json::json!({"default": {"owner": "alice"}}));

    short_cmd(&dir)
        .arg("mine")
        .assert()
        .success()
        .stdout(predicate::str::contains("No workspace saved with name mine"))
        .stdout(predicate::str::contains("short search [options] --save mine"));
}

#[test]
fn test_config_keeps_unknown_keys() {
    let dir = installed(serde_json::json!({"default": {}, "gone": {}}));
    let path = dir.path().join("config.json");
    let mut config = read_config(&dir);
    config["theme"] = serde_json::json!("dark");
    fs::write(&path, config.to_string()).unwrap();

    short_cmd(&dir)
        .args(["workspace", "--unset", "gone"])
        .assert()
        .success();

    assert_eq!(read_config(&dir)["theme"], "dark");
}

#[test]
fn test_corrupt_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("config.json"), "{not json").unwrap();

    short_cmd(&dir)
        .arg("workspace")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error:"));
}

// =============================================================================
// Validation before any request
// =============================================================================

#[test]
fn test_search_without_token_asks_for_install() {
    let dir = TempDir::new().unwrap();

    short_cmd(&dir)
        .args(["search", "owner:%self%"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("short install"));
}

#[test]
fn test_invalid_filter_pattern_fails_fast() {
    let dir = installed(serde_json::json!({}));

    short_cmd(&dir)
        .args(["search", "--owner", "("])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid pattern"));
}

#[test]
fn test_invalid_comparator_fails_fast() {
    let dir = installed(serde_json::json!({}));

    short_cmd(&dir)
        .args(["search", "--estimate", ">abc"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_create_requires_title() {
    let dir = installed(serde_json::json!({}));

    short_cmd(&dir)
        .args(["create", "-p", "Web"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Must provide --title"));
}

#[test]
fn test_create_requires_project_or_state() {
    let dir = installed(serde_json::json!({}));

    short_cmd(&dir)
        .args(["c", "-t", "New story"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Must provide --project or --state"));
}

#[test]
fn test_create_rejects_unknown_type() {
    let dir = installed(serde_json::json!({}));

    short_cmd(&dir)
        .args(["create", "-t", "x", "-p", "Web", "-y", "epic"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_doc_delete_requires_confirm() {
    let dir = installed(serde_json::json!({}));

    short_cmd(&dir)
        .args(["doc", "delete", "8d0c5d8e-1b2a-4c3d-9e8f-0a1b2c3d4e5f"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--confirm"));
}

#[test]
fn test_install_with_existing_token_needs_force() {
    let dir = installed(serde_json::json!({}));

    short_cmd(&dir)
        .arg("install")
        .assert()
        .success()
        .stdout(predicate::str::contains("re-run with --force"));
}

// =============================================================================
// Exit codes
// =============================================================================

#[test]
fn test_unreachable_api_fails_entity_fetch() {
    let dir = installed(serde_json::json!({}));

    short_cmd(&dir)
        .args(["search", "is:started", "-q"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Error:"));
}
