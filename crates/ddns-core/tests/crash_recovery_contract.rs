//! Contract Test: Crash Recovery
//!
//! Constraints verified:
//! - A panic inside the loop body relaunches the loop
//! - The restart count grows by exactly one per relaunch
//! - At most 5 relaunches; the 6th failure launches nothing
//! - The last observed address survives a relaunch
//! - An error escaping the loop (bounded retry) is treated like a panic
//!
//! If this test fails, the daemon either dies on the first bug or crash-loops.

mod common;

use common::*;
use ddns_core::{
    DomainResolver, EngineEvent, RetryPolicy, Supervisor, SupervisorExit, UpdateLoop,
    engine::DEFAULT_RESTART_CEILING,
};
use std::sync::Arc;
use std::time::Duration;

async fn example_loop(source: Arc<ScriptedAddressSource>, provider: Arc<RecordingProvider>) -> UpdateLoop {
    let domain = DomainResolver::new(provider.as_ref())
        .resolve("example.com", "home,nas")
        .await
        .expect("resolution succeeds");
    UpdateLoop::new(source, provider, domain, Duration::from_secs(300))
}

#[tokio::test]
async fn sixth_failure_launches_no_new_loop() {
    let provider = Arc::new(example_provider());
    let source = Arc::new(ScriptedAddressSource::new(vec![Step::Panic("bug in loop body")]));

    let (update_loop, mut events) = example_loop(source.clone(), provider.clone())
        .await
        .with_events(64);
    let mut supervisor = Supervisor::new(update_loop);
    assert_eq!(supervisor.restart_ceiling(), DEFAULT_RESTART_CEILING);
    assert_eq!(supervisor.restart_count(), 0);

    let exit = supervisor.run().await;

    assert_eq!(exit, SupervisorExit::RestartCeilingReached { restart_count: 5 });
    assert_eq!(supervisor.restart_count(), 5);
    // Initial instance plus five relaunches
    assert_eq!(source.call_count(), 6);
    assert!(provider.updates().is_empty());

    let mut restarts = Vec::new();
    let mut failures = 0;
    let mut ceiling_events = 0;
    while let Ok(event) = events.try_recv() {
        match event {
            EngineEvent::LoopRestarted { restart_count } => restarts.push(restart_count),
            EngineEvent::LoopFailed { reason, .. } => {
                assert!(reason.contains("bug in loop body"), "reason: {}", reason);
                failures += 1;
            }
            EngineEvent::RestartCeilingReached { restart_count } => {
                assert_eq!(restart_count, 5);
                ceiling_events += 1;
            }
            _ => {}
        }
    }
    assert_eq!(restarts, vec![1, 2, 3, 4, 5]);
    assert_eq!(failures, 6);
    assert_eq!(ceiling_events, 1);
}

#[tokio::test]
async fn custom_ceiling_is_honoured() {
    let provider = Arc::new(example_provider());
    let source = Arc::new(ScriptedAddressSource::new(vec![Step::Panic("boom")]));

    let mut supervisor =
        Supervisor::with_restart_ceiling(example_loop(source.clone(), provider).await, 2);

    assert_eq!(
        supervisor.run().await,
        SupervisorExit::RestartCeilingReached { restart_count: 2 }
    );
    assert_eq!(source.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn recovered_loop_keeps_running() {
    let provider = Arc::new(example_provider());
    let source = Arc::new(ScriptedAddressSource::new(vec![
        Step::Panic("first"),
        Step::Panic("second"),
        Step::Address("1.2.3.4"),
    ]));

    let mut supervisor = Supervisor::new(example_loop(source.clone(), provider.clone()).await);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(async move {
        let exit = supervisor.run_with_shutdown(Some(shutdown_rx)).await;
        (exit, supervisor.restart_count())
    });

    // Cycles of the third instance at t=0, 300, 600, 900
    tokio::time::sleep(Duration::from_secs(1000)).await;
    shutdown_tx.send(()).unwrap();

    let (exit, restart_count) = handle.await.unwrap();
    assert_eq!(exit, SupervisorExit::Shutdown);
    assert_eq!(restart_count, 2);
    assert_eq!(source.call_count(), 6);
    assert_eq!(
        provider.updates(),
        vec![("home".to_string(), "1.2.3.4".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn last_observed_address_survives_restart() {
    let provider = Arc::new(example_provider());
    let source = Arc::new(ScriptedAddressSource::new(vec![
        Step::Address("1.2.3.4"),
        Step::Panic("crash after first cycle"),
        Step::Address("1.2.3.4"),
    ]));

    let update_loop = example_loop(source.clone(), provider.clone()).await;
    let last_observed = update_loop.last_observed().clone();
    let mut supervisor = Supervisor::new(update_loop);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(async move {
        let exit = supervisor.run_with_shutdown(Some(shutdown_rx)).await;
        (exit, supervisor.restart_count())
    });

    // t=0 first cycle, t=300 panic, relaunch cycles at t=300 and t=600
    tokio::time::sleep(Duration::from_secs(700)).await;
    shutdown_tx.send(()).unwrap();

    let (exit, restart_count) = handle.await.unwrap();
    assert_eq!(exit, SupervisorExit::Shutdown);
    assert_eq!(restart_count, 1);
    assert_eq!(source.call_count(), 4);
    // The relaunched instance saw the same address and did not push it again
    assert_eq!(provider.updates().len(), 1);
    assert_eq!(last_observed.get().await, Some("1.2.3.4".to_string()));
}

#[tokio::test(start_paused = true)]
async fn bounded_discovery_exhaustion_counts_as_failure() {
    let provider = Arc::new(example_provider());
    let source = Arc::new(ScriptedAddressSource::new(vec![Step::Fail("network unreachable")]));

    let update_loop = example_loop(source.clone(), provider.clone())
        .await
        .with_retry_policy(RetryPolicy::bounded(2, Duration::from_secs(1)));
    let mut supervisor = Supervisor::with_restart_ceiling(update_loop, 1);

    assert_eq!(
        supervisor.run().await,
        SupervisorExit::RestartCeilingReached { restart_count: 1 }
    );
    // Two instances, two attempts each
    assert_eq!(source.call_count(), 4);
}

#[tokio::test]
async fn shutdown_before_first_failure() {
    let provider = Arc::new(example_provider());
    let source = Arc::new(ScriptedAddressSource::new(vec![Step::Address("1.2.3.4")]));

    let mut supervisor = Supervisor::new(example_loop(source, provider).await);
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    shutdown_tx.send(()).unwrap();

    assert_eq!(
        supervisor.run_with_shutdown(Some(shutdown_rx)).await,
        SupervisorExit::Shutdown
    );
    assert_eq!(supervisor.restart_count(), 0);
}
