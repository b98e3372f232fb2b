//! Integration tests for the `sentinel` CLI binary.
//!
//! Every test runs against a private temp directory for config and
//! settings, and uses the simulated fleet unless it mocks the HTTP API.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `sentinel` binary with env isolation.
///
/// Clears all `SENTINEL_*` env vars and points config and data
/// directories into `home` so tests never touch real settings.
fn sentinel_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("sentinel");
    for (key, _) in std::env::vars() {
        if key.starts_with("SENTINEL_") {
            cmd.env_remove(key);
        }
    }
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env("SENTINEL_DATA_DIR", home.join("settings"))
        .env("SENTINEL_SOURCE__LATENCY_MS", "0")
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn no_args_shows_help() {
    let home = TempDir::new().unwrap();
    let output = sentinel_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn help_lists_commands() {
    let home = TempDir::new().unwrap();
    sentinel_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("status")
            .and(predicate::str::contains("toggle"))
            .and(predicate::str::contains("automation")),
    );
}

#[test]
fn version_flag() {
    let home = TempDir::new().unwrap();
    sentinel_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sentinel"));
}

#[test]
fn bash_completions() {
    let home = TempDir::new().unwrap();
    sentinel_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sentinel"));
}

// ── Fleet ───────────────────────────────────────────────────────────

#[test]
fn status_lists_the_simulated_fleet() {
    let home = TempDir::new().unwrap();
    let output = sentinel_cmd(home.path())
        .args(["--simulate", "-o", "json", "status"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let hosts = stdout_json(&output);
    let ips: Vec<&str> = hosts
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["ip"].as_str().unwrap())
        .collect();
    assert_eq!(ips.len(), 3);
    assert!(ips.contains(&"192.168.1.101"));
    assert!(!ips.contains(&"10.0.0.5"), "orphan services must not become hosts");
}

#[test]
fn status_table_has_a_summary() {
    let home = TempDir::new().unwrap();
    sentinel_cmd(home.path())
        .args(["--simulate", "status"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("VPS-FIN-01")
                .and(predicate::str::contains("3 hosts, 0 throttled")),
        );
}

#[test]
fn plain_status_prints_one_ip_per_line() {
    let home = TempDir::new().unwrap();
    let output = sentinel_cmd(home.path())
        .args(["--simulate", "-o", "plain", "status"])
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 3);
}

#[test]
fn check_reports_the_action() {
    let home = TempDir::new().unwrap();
    let output = sentinel_cmd(home.path())
        .args(["--simulate", "-o", "json", "check"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let report = stdout_json(&output);
    assert_eq!(report["action"], "pause");
    assert_eq!(report["polled"], 3);
    assert!(report["transitions"].as_array().unwrap().len() <= 1);
}

#[test]
fn toggle_pauses_a_running_client() {
    let home = TempDir::new().unwrap();
    let output = sentinel_cmd(home.path())
        .args(["--simulate", "-o", "json", "toggle", "torrent", "192.168.1.101"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let host = stdout_json(&output);
    assert_eq!(host["torrentClient"]["status"], "PAUSED");
}

#[test]
fn toggle_unknown_host_is_not_found() {
    let home = TempDir::new().unwrap();
    let output = sentinel_cmd(home.path())
        .args(["--simulate", "toggle", "torrent", "203.0.113.9"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("not found"));
}

#[test]
fn toggle_missing_service_is_not_found() {
    let home = TempDir::new().unwrap();
    let output = sentinel_cmd(home.path())
        .args(["--simulate", "toggle", "downloader", "192.168.2.55"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("downloader"));
}

// ── Settings ────────────────────────────────────────────────────────

#[test]
fn accounts_persist_between_runs() {
    let home = TempDir::new().unwrap();
    sentinel_cmd(home.path())
        .args(["accounts", "add", "alice", "--password", "hunter2"])
        .assert()
        .success();
    sentinel_cmd(home.path())
        .args(["accounts", "add", "bob", "--password", "x"])
        .assert()
        .success();

    let output = sentinel_cmd(home.path())
        .args(["-o", "json", "accounts", "list"])
        .output()
        .unwrap();
    let accounts = stdout_json(&output);
    assert_eq!(accounts[0]["login"], "alice");
    assert_eq!(accounts[0]["id"], 1);
    assert_eq!(accounts[1]["id"], 2);
    assert_eq!(accounts[1]["status"], "Inactive");
    assert!(!String::from_utf8_lossy(&output.stdout).contains("hunter2"));
}

#[test]
fn blank_login_is_rejected() {
    let home = TempDir::new().unwrap();
    let output = sentinel_cmd(home.path())
        .args(["accounts", "add", "   ", "--password", "x"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn removing_a_missing_account_is_a_noop() {
    let home = TempDir::new().unwrap();
    sentinel_cmd(home.path())
        .args(["accounts", "remove", "7"])
        .assert()
        .success()
        .stderr(predicate::str::contains("No account with id 7"));
}

#[test]
fn activating_a_missing_account_fails() {
    let home = TempDir::new().unwrap();
    sentinel_cmd(home.path())
        .args(["accounts", "activate", "7"])
        .assert()
        .code(4);
}

#[test]
fn automation_settings_round_trip() {
    let home = TempDir::new().unwrap();
    sentinel_cmd(home.path())
        .args(["automation", "set", "--interval", "2m", "--action", "notify"])
        .assert()
        .success();

    let output = sentinel_cmd(home.path())
        .args(["-o", "json", "automation", "show"])
        .output()
        .unwrap();
    assert_eq!(
        stdout_json(&output),
        json!({ "interval": 120, "action": "notify", "enabled": true })
    );
}

#[test]
fn zero_interval_is_a_usage_error() {
    let home = TempDir::new().unwrap();
    let output = sentinel_cmd(home.path())
        .args(["automation", "set", "--interval", "0s"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("interval"));
}

#[test]
fn settings_show_masks_secrets() {
    let home = TempDir::new().unwrap();
    sentinel_cmd(home.path())
        .args(["notify", "set", "--token", "123:abc", "--chat-id", "42"])
        .assert()
        .success();

    let output = sentinel_cmd(home.path())
        .args(["-o", "json", "settings", "show"])
        .output()
        .unwrap();
    let settings = stdout_json(&output);
    assert_eq!(settings["notifications"]["chatId"], "42");
    assert_ne!(settings["notifications"]["telegramToken"], "123:abc");
}

#[test]
fn notify_test_without_target_is_a_usage_error() {
    let home = TempDir::new().unwrap();
    let output = sentinel_cmd(home.path())
        .args(["--simulate", "notify", "test"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Telegram token and chat id are required"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn config_path_honors_the_flag() {
    let home = TempDir::new().unwrap();
    let file = home.path().join("custom.toml");
    sentinel_cmd(home.path())
        .args(["config", "path", "--config"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.toml"));
}

#[test]
fn config_init_refuses_to_overwrite() {
    let home = TempDir::new().unwrap();
    let file = home.path().join("sentinel.toml");

    sentinel_cmd(home.path())
        .args(["config", "init", "--config"])
        .arg(&file)
        .assert()
        .success();
    assert!(std::fs::read_to_string(&file).unwrap().contains("[source]"));

    sentinel_cmd(home.path())
        .args(["config", "init", "--config"])
        .arg(&file)
        .assert()
        .code(6);
}

#[test]
fn invalid_config_values_are_reported() {
    let home = TempDir::new().unwrap();
    sentinel_cmd(home.path())
        .args(["config", "show"])
        .env("SENTINEL_SOURCE__TIMEOUT", "0")
        .assert()
        .code(2);
}

// ── HTTP source ─────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn status_over_http_uses_the_configured_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/fleet/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "10.0.0.1": { "name": "VPS-DE-01", "throttled": true },
        })))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    sentinel_cmd(home.path())
        .args(["integrations", "set", "--api-endpoint"])
        .arg(format!("{}/api", server.uri()))
        .assert()
        .success();

    let output = sentinel_cmd(home.path())
        .args(["-o", "json", "status"])
        .env("SENTINEL_SOURCE__MODE", "http")
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let hosts = stdout_json(&output);
    assert_eq!(hosts[0]["ip"], "10.0.0.1");
    assert_eq!(hosts[0]["throttleMonitor"]["status"], "Throttled");
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_endpoint_exits_with_connection_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/fleet/status"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    sentinel_cmd(home.path())
        .args(["integrations", "set", "--api-endpoint"])
        .arg(format!("{}/api", server.uri()))
        .assert()
        .success();

    let output = sentinel_cmd(home.path())
        .args(["status"])
        .env("SENTINEL_SOURCE__MODE", "http")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7));
    assert!(combined_output(&output).contains("HTTP 502"));
}
