// Tests for the command-line interface.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;

fn sample(file_name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("samples")
        .join(file_name)
}

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("openapi-test-data").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_prints_test_data_as_json() {
    let output = cli()
        .arg("--spec")
        .arg(sample("sample_openapi.yaml"))
        .args(["--path", "/users", "--method", "post"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let data: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(data["method"], "POST");
    assert_eq!(data["body"]["email"], "user@example.com");
}

#[test]
fn test_writes_into_output_directory() {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("target")
        .join("test-output")
        .join("cli");
    fs::create_dir_all(&dir).unwrap();

    cli()
        .arg("--spec")
        .arg(sample("sample_swagger.json"))
        .args(["--path", "/users/{id}", "--method", "PUT"])
        .arg("--output")
        .arg(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("put_users_id.json"));

    let written = fs::read_to_string(dir.join("put_users_id.json")).unwrap();
    assert!(written.contains("\"path_params\""));
}

#[test]
fn test_unknown_endpoint_fails() {
    cli()
        .arg("--spec")
        .arg(sample("sample_openapi.yaml"))
        .args(["--path", "/orders", "--method", "GET"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Endpoint not found: GET /orders"));
}

#[test]
fn test_depth_limit_is_reported() {
    cli()
        .arg("--spec")
        .arg(sample("sample_openapi.yaml"))
        .args(["--path", "/reports/{year}", "--max-depth", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Maximum nesting depth 3 exceeded"));
}

#[test]
fn test_rejects_unknown_mode() {
    cli()
        .arg("--spec")
        .arg(sample("sample_openapi.yaml"))
        .args(["--path", "/users", "--mode", "gemini"])
        .assert()
        .failure();
}
