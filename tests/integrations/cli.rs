use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn danglewatch(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("danglewatch").unwrap();
    cmd.current_dir(dir).env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_missing_targets_file_exits_with_error() {
    let dir = tempfile::tempdir().unwrap();

    danglewatch(dir.path())
        .args(["--targets", "missing.txt", "--once"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Targets file not found"));
}

#[test]
fn test_targets_file_without_domains_exits_with_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("domains.txt"), "# nothing yet\n\n").unwrap();

    danglewatch(dir.path())
        .arg("--once")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("contains no domains"));
}

#[test]
fn test_missing_config_file_exits_with_error() {
    let dir = tempfile::tempdir().unwrap();

    danglewatch(dir.path())
        .args(["--config", "absent.toml", "--once"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Config file not found"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_single_baseline_cycle_from_environment_config() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("q", "%.example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "name_value": "api.example.com\n*.example.com", "entry_timestamp": "2024-05-01T00:00:00" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("domains.txt"), "# monitored\nExample.com\n").unwrap();
    let source_url = format!("{}/", server.uri());
    let workdir = dir.path().to_path_buf();

    let assert = tokio::task::spawn_blocking(move || {
        danglewatch(&workdir)
            .arg("--once")
            .env("DANGLEWATCH_SOURCE__URL", source_url)
            .env("DANGLEWATCH_DNS__RESOLVER", "127.0.0.1:53")
            .assert()
    })
    .await
    .unwrap();
    assert.success();

    let ledger = std::fs::read_to_string(dir.path().join("seen_domains.txt")).unwrap();
    assert_eq!(ledger, "api.example.com\nexample.com\n");
    assert!(dir.path().join(".first_run_complete").exists());
    assert!(dir.path().join("results").is_dir());
    assert!(!dir.path().join("results").join("example_com").exists());
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_interrupt_during_single_cycle_exits_cleanly() {
    use std::process::{Command as StdCommand, Stdio};
    use std::time::Duration;

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]").set_delay(Duration::from_secs(20)))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("domains.txt"), "example.com\n").unwrap();

    let mut child = StdCommand::new(assert_cmd::cargo::cargo_bin("danglewatch"))
        .arg("--once")
        .current_dir(dir.path())
        .env_remove("RUST_LOG")
        .env("DANGLEWATCH_SOURCE__URL", format!("{}/", server.uri()))
        .env("DANGLEWATCH_DNS__RESOLVER", "127.0.0.1:53")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    // The cycle is in flight once the source has been queried.
    tokio::time::timeout(Duration::from_secs(10), async {
        while server.received_requests().await.unwrap_or_default().is_empty() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("cycle never reached the certificate source");
    tokio::time::sleep(Duration::from_millis(200)).await;

    let killed = StdCommand::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(killed.success());

    let status = tokio::time::timeout(
        Duration::from_secs(10),
        tokio::task::spawn_blocking(move || child.wait()),
    )
    .await
    .unwrap()
    .unwrap()
    .unwrap();
    assert_eq!(status.code(), Some(0));
}
