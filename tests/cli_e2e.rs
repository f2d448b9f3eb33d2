//! End-to-end CLI tests for the lms-launch binary.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::NamedTempFile;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_file(config: &Value) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("failed to create temp file");
    file.write_all(config.to_string().as_bytes())
        .expect("failed to write config");
    file
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    let mut cmd = Command::cargo_bin("lms-launch").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Run LMS assignment launches"))
        .stdout(predicate::str::contains("launch"))
        .stdout(predicate::str::contains("files"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    let mut cmd = Command::cargo_bin("lms-launch").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("lms-launch"));
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_binary_invalid_flag_returns_error() {
    let mut cmd = Command::cargo_bin("lms-launch").unwrap();
    cmd.arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_launch_missing_config_reports_path() {
    let mut cmd = Command::cargo_bin("lms-launch").unwrap();
    cmd.args(["launch", "--config", "/nonexistent/launch.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("/nonexistent/launch.json"));
}

#[test]
fn test_launch_invalid_config_shows_suggestion() {
    let config = config_file(&json!({"api": {"authToken": ""}, "contentUrl": "https://x"}));
    let mut cmd = Command::cargo_bin("lms-launch").unwrap();
    cmd.arg("launch")
        .arg("--config")
        .arg(config.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("authToken"))
        .stderr(predicate::str::contains("Suggestion"));
}

#[test]
fn test_launch_with_synchronous_content_url_prints_iframe() {
    let config = config_file(&json!({
        "api": {"authToken": "Bearer t"},
        "backendUrl": "https://lms.example.com",
        "contentUrl": "https://via.example.com/doc"
    }));
    let mut cmd = Command::cargo_bin("lms-launch").unwrap();
    cmd.arg("-q")
        .arg("launch")
        .arg("--config")
        .arg(config.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "\"iframe_url\": \"https://via.example.com/doc\"",
        ));
}

#[test]
fn test_launch_without_backend_url_fails() {
    let config = config_file(&json!({
        "api": {"authToken": "Bearer t"},
        "contentUrl": "https://via.example.com/doc"
    }));
    let mut cmd = Command::cargo_bin("lms-launch").unwrap();
    cmd.arg("launch")
        .arg("--config")
        .arg(config.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("--backend-url"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_launch_resolves_content_url_from_backend() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/via_url"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"via_url": "https://via.example.com/resolved"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = config_file(&json!({
        "api": {"authToken": "Bearer t", "viaUrl": {"path": "/api/via_url"}}
    }));
    let mut cmd = Command::cargo_bin("lms-launch").unwrap();
    cmd.arg("launch")
        .arg("--config")
        .arg(config.path())
        .arg("--backend-url")
        .arg(server.uri())
        .assert()
        .success()
        .stdout(predicate::str::contains("https://via.example.com/resolved"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_launch_fetch_error_exits_unresolved() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/via_url"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "boom"})))
        .expect(2)
        .mount(&server)
        .await;

    let config = config_file(&json!({
        "api": {"authToken": "Bearer t", "viaUrl": {"path": "/api/via_url"}}
    }));
    let mut cmd = Command::cargo_bin("lms-launch").unwrap();
    cmd.arg("launch")
        .arg("--config")
        .arg(config.path())
        .arg("--backend-url")
        .arg(server.uri())
        .arg("--max-attempts")
        .arg("1")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("error-fetching"))
        .stdout(predicate::str::contains("try_again"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_launch_authorizes_through_terminal_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/via_url"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({})))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/via_url"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"via_url": "https://via.example.com/ok"})),
        )
        .mount(&server)
        .await;

    let config = config_file(&json!({
        "api": {
            "authToken": "Bearer t",
            "viaUrl": {"path": "/api/via_url", "authUrl": "/api/oauth/authorize"}
        }
    }));
    let mut cmd = Command::cargo_bin("lms-launch").unwrap();
    cmd.arg("launch")
        .arg("--config")
        .arg(config.path())
        .arg("--backend-url")
        .arg(server.uri())
        .write_stdin("\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("/api/oauth/authorize?authorization="))
        .stdout(predicate::str::contains("https://via.example.com/ok"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_files_lists_opened_folder() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/d2l/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "d1", "display_name": "Week 1", "type": "Folder",
             "contents": {"path": "/api/d2l/folders/d1"}}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/d2l/folders/d1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "d2l://file/77", "display_name": "Lecture.pdf", "type": "File"}
        ])))
        .mount(&server)
        .await;

    let config = config_file(&json!({
        "api": {"authToken": "Bearer t"},
        "contentUrl": "https://x",
        "backendUrl": server.uri(),
        "filePicker": {"d2l": {"path": "/api/d2l/files"}}
    }));
    let mut cmd = Command::cargo_bin("lms-launch").unwrap();
    cmd.arg("files")
        .arg("--config")
        .arg(config.path())
        .args(["--source", "d2l", "--open", "d1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Lecture.pdf"))
        .stdout(predicate::str::contains("d2l://file/77"));
}

#[test]
fn test_files_without_picker_endpoint_fails() {
    let config = config_file(&json!({
        "api": {"authToken": "Bearer t"},
        "contentUrl": "https://x",
        "backendUrl": "https://lms.example.com"
    }));
    let mut cmd = Command::cargo_bin("lms-launch").unwrap();
    cmd.arg("files")
        .arg("--config")
        .arg(config.path())
        .args(["--source", "moodle"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Moodle files"));
}
