use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;

#[path = "../helpers/mod.rs"]
mod helpers;
use helpers::{app::TestEnv, cert, fake_source::Scripted};

/// Polls `condition` until it holds, failing the test after five seconds.
async fn wait_until(condition: impl Fn() -> bool) {
    timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn test_panicking_cycle_is_contained_and_loop_continues() {
    let env = TestEnv::new(&["example.com"]);
    env.source
        .push("example.com", Scripted::Panic)
        .push_records("example.com", vec![cert(1, "api.example.com")]);

    let app = env.build_app().await;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(app.run(shutdown_rx));

    let source = env.source.clone();
    wait_until(move || source.calls().len() >= 3).await;
    shutdown_tx.send(true).unwrap();

    let result = timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    assert!(result.is_ok());
    assert_eq!(env.ledger_lines(), vec!["api.example.com"]);
    assert!(env.config.paths.baseline_marker.exists());
}

#[tokio::test]
async fn test_failing_source_never_stops_the_loop() {
    let env = TestEnv::new(&["example.com"]);
    env.skip_baseline();
    for _ in 0..3 {
        env.source.push_failure("example.com");
    }
    env.source
        .push_records("example.com", vec![cert(9, "late.example.com")]);

    let app = env.build_app().await;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(app.run(shutdown_rx));

    let notifier = env.notifier.clone();
    wait_until(move || notifier.count() >= 4).await;
    shutdown_tx.send(true).unwrap();
    timeout(Duration::from_secs(5), handle).await.unwrap().unwrap().unwrap();

    assert_eq!(env.result_lines("example.com"), vec!["late.example.com|N/A|N/A|OK"]);
}

#[tokio::test]
async fn test_shutdown_interrupts_the_pause_between_cycles() {
    let mut env = TestEnv::new(&["example.com"]);
    env.config.scheduler.interval_seconds = 3600;

    let app = env.build_app().await;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(app.run(shutdown_rx));

    let source = env.source.clone();
    wait_until(move || source.calls().len() == 1).await;
    shutdown_tx.send(true).unwrap();

    let result = timeout(Duration::from_secs(2), handle).await;
    assert!(result.is_ok(), "scheduler did not stop during its pause");
    assert_eq!(env.source.calls().len(), 1);
}

#[tokio::test]
async fn test_no_cycle_runs_when_already_shut_down() {
    let env = TestEnv::new(&["example.com"]);
    let app = env.build_app().await;
    let (_shutdown_tx, shutdown_rx) = watch::channel(true);

    timeout(Duration::from_secs(2), app.run(shutdown_rx))
        .await
        .unwrap()
        .unwrap();
    assert!(env.source.calls().is_empty());
}
