//! End-to-end tests of the `expd` binary.

mod common;

use assert_cmd::Command;
use axum::{routing::get, Json, Router};
use common::{sample_package, serve, write_project};
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;

fn expd() -> Command {
    let mut cmd = Command::cargo_bin("expd").unwrap();
    cmd.env_remove("EXPD_SESSION")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_help_lists_commands() {
    expd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("start"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn test_start_rejects_port_zero() {
    expd()
        .args(["start", ".", "--port", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("port"));
}

#[test]
fn test_verbose_conflicts_with_quiet() {
    expd().args(["-v", "-q", "check"]).assert().failure();
}

#[test]
fn test_check_missing_root() {
    let temp = TempDir::new().unwrap();
    expd()
        .arg("check")
        .arg(temp.path().join("nope"))
        .assert()
        .failure();
}

#[test]
fn test_check_without_react_native_fails() {
    let temp = TempDir::new().unwrap();
    write_project(temp.path(), json!({ "name": "x", "dependencies": {} }));

    expd()
        .arg("check")
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Can't find react-native in package.json dependencies",
        ));
}

#[test]
fn test_check_unversioned_is_warning() {
    let temp = TempDir::new().unwrap();
    write_project(
        temp.path(),
        json!({
            "dependencies": { "react-native": "github:exponentjs/react-native#sdk-5.0.0" },
            "exp": { "sdkVersion": "UNVERSIONED" }
        }),
    );

    expd()
        .arg("check")
        .arg(temp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Using unversioned Exponent SDK"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_check_against_api() {
    let app = Router::new().route(
        "/--/sdk-versions",
        get(|| async { Json(json!({ "5.0.0": { "exponent-react-native-tag": "sdk-5.0.0" } })) }),
    );
    let api_url = format!("http://{}", serve(app).await);

    let temp = TempDir::new().unwrap();
    write_project(temp.path(), sample_package());
    let root = temp.path().to_path_buf();

    let output = tokio::task::spawn_blocking(move || {
        expd()
            .arg("check")
            .arg(&root)
            .args(["--api-url", &api_url])
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Project is compatible"));
}
