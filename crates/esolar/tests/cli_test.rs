//! Integration tests for the `esolar` CLI binary.
//!
//! Argument parsing, offline commands and exit codes; the fetch path runs
//! against a wiremock portal.
#![allow(clippy::unwrap_used)]

use std::path::Path;
use std::time::Duration;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `esolar` binary with env isolation.
///
/// Clears all `ESOLAR_*` env vars and points the config file at `config`
/// so tests never touch the user's real configuration.
fn esolar_cmd(config: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("esolar");
    cmd.env("HOME", "/tmp/esolar-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/esolar-cli-test-nonexistent")
        .env("ESOLAR_CONFIG", config)
        .env_remove("ESOLAR_PROFILE")
        .env_remove("ESOLAR_USERNAME")
        .env_remove("ESOLAR_PASSWORD")
        .env_remove("ESOLAR_PROVIDER")
        .env_remove("ESOLAR_HOST")
        .env_remove("ESOLAR_VARIANT")
        .env_remove("ESOLAR_OUTPUT")
        .env_remove("ESOLAR_INSECURE")
        .env_remove("ESOLAR_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let dir = tempfile::tempdir().unwrap();
    let output = esolar_cmd(&dir.path().join("config.toml")).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    esolar_cmd(&dir.path().join("config.toml"))
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("fetch")
                .and(predicate::str::contains("watch"))
                .and(predicate::str::contains("login"))
                .and(predicate::str::contains("fields")),
        );
}

#[test]
fn test_completions_bash() {
    let dir = tempfile::tempdir().unwrap();
    esolar_cmd(&dir.path().join("config.toml"))
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("esolar"));
}

// ── Offline commands ────────────────────────────────────────────────

#[test]
fn test_fields_for_base_plants() {
    let dir = tempfile::tempdir().unwrap();
    esolar_cmd(&dir.path().join("config.toml"))
        .args(["fields", "-o", "plain"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("nowPower")
                .and(predicate::str::contains("systemPower"))
                .and(predicate::str::contains("batteryDirection").not()),
        );
}

#[test]
fn test_fields_for_h1_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let output = esolar_cmd(&dir.path().join("config.toml"))
        .args(["--variant", "h1", "fields", "--paths", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let fields: Vec<Value> = serde_json::from_slice(&output.stdout).unwrap();
    let battery = fields
        .iter()
        .find(|f| f["key"] == "batteryDirection")
        .unwrap();
    assert_eq!(battery["module"], "h1");
    assert_eq!(battery["path"], "storeDevicePower.batteryDirection");
}

#[test]
fn test_unknown_variant_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    esolar_cmd(&dir.path().join("config.toml"))
        .args(["--variant", "sec2", "fields"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("variant"));
}

#[test]
fn test_config_set_and_show() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");

    esolar_cmd(&config)
        .args(["config", "set", "username", "owner@example.com"])
        .assert()
        .success();
    esolar_cmd(&config)
        .args(["config", "set", "variant", "h1"])
        .assert()
        .success();
    esolar_cmd(&config)
        .args(["config", "set", "password", "nope"])
        .assert()
        .code(2);

    let output = esolar_cmd(&config)
        .args(["config", "show", "-o", "json"])
        .output()
        .unwrap();
    let shown: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(shown["profiles"]["default"]["username"], "owner@example.com");
    assert_eq!(shown["profiles"]["default"]["variant"], "h1");

    esolar_cmd(&config)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_fetch_without_config_points_at_init() {
    let dir = tempfile::tempdir().unwrap();
    esolar_cmd(&dir.path().join("config.toml"))
        .arg("fetch")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("esolar config init"));
}

// ── Against a portal ────────────────────────────────────────────────

async fn mount_portal(server: &MockServer, login_status: u16) {
    let mut login = ResponseTemplate::new(login_status);
    if login_status == 302 {
        login = login.insert_header("Location", "/saj/monitor/home/index");
    }
    Mock::given(method("POST"))
        .and(path("/saj/login"))
        .respond_with(login)
        .mount(server)
        .await;

    let routes = [
        (
            "/saj/monitor/site/getUserPlantList",
            json!({ "plantList": [{ "plantuid": "PLANT-1", "plantname": "Roof" }] }),
        ),
        (
            "/saj/monitor/site/getPlantDetailInfo",
            json!({ "plantDetail": { "nowPower": "1520", "snList": ["INV-1"] } }),
        ),
        ("/saj/cloudMonitor/device/findDevicePageList", json!({ "list": [] })),
        ("/saj/monitor/site/getPlantDetailChart2", json!({})),
    ];
    for (route, body) in routes {
        Mock::given(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }
}

fn portal_cmd(config: &Path, server: &MockServer) -> assert_cmd::Command {
    let mut cmd = esolar_cmd(config);
    cmd.env("ESOLAR_PASSWORD", "hunter2").args([
        "--host",
        &server.address().to_string(),
        "--path",
        "saj",
        "--http",
        "--username",
        "owner@example.com",
    ]);
    cmd
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_json() {
    let server = MockServer::start().await;
    mount_portal(&server, 302).await;
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = portal_cmd(&dir.path().join("config.toml"), &server);
    cmd.args(["-o", "json", "fetch"]);

    let output = tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let reading: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(reading["ids"]["plant_uid"], "PLANT-1");
    assert_eq!(reading["fields"]["nowPower"], 1520.0);
    assert_eq!(reading["fields"]["plantname"], "Roof");
    // Unreported fields are left out rather than shown as null.
    assert!(reading["fields"].get("address").is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_login_exit_code() {
    let server = MockServer::start().await;
    mount_portal(&server, 200).await;
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = portal_cmd(&dir.path().join("config.toml"), &server);
    cmd.arg("login");

    let output = tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap();
    assert_eq!(output.status.code(), Some(3), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("Authentication failed"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_watch_stops_on_rejected_login() {
    let server = MockServer::start().await;
    mount_portal(&server, 200).await;
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = portal_cmd(&dir.path().join("config.toml"), &server);
    cmd.args(["watch", "--interval", "100ms"])
        .timeout(Duration::from_secs(20));

    let output = tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap();
    assert_eq!(output.status.code(), Some(3), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("Authentication failed"));

    let logins = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/saj/login")
        .count();
    assert_eq!(logins, 1);
}
