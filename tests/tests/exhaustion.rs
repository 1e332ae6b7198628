use surge_tests::*;

use std::time::Duration;
use surge::prelude::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn pool_of_five_rejects_half_of_ten() {
    init();
    let stub = spawn_stub(Duration::from_secs(3)).await;
    let coordinator = spawn_coordinator(stub, 5, Duration::from_secs(5)).await;
    let generator = generator(&coordinator.url, Duration::from_secs(10));

    let summary = generator
        .run_with_defaults(TestConfig::concurrency(10).unwrap())
        .await;

    assert_eq!(summary.total_requests, 10);
    assert_eq!(summary.success_count, 5);
    assert_eq!(summary.failure_count, 5);
    assert_eq!(
        summary.errors.get(&ErrorCategory::ConnectionPoolExhausted),
        Some(&5)
    );
    assert_eq!(summary.errors.len(), 1);

    let latency = summary.latency.as_ref().unwrap();
    assert!(latency.max >= Duration::from_secs(3));
    assert!(latency.min < Duration::from_secs(1));

    assert_eq!(coordinator.record_count().await, 5);
    assert_eq!(coordinator.coordinator.health().in_use, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn one_over_capacity_is_rejected() {
    init();
    let capacity = 3;
    let stub = spawn_stub(Duration::from_secs(1)).await;
    let coordinator = spawn_coordinator(stub, capacity, Duration::from_secs(5)).await;
    let generator = generator(&coordinator.url, Duration::from_secs(10));

    let summary = generator
        .run_with_defaults(TestConfig::concurrency(capacity as u64 + 1).unwrap())
        .await;

    assert_eq!(summary.success_count, capacity as u64);
    assert!(
        summary
            .errors
            .get(&ErrorCategory::ConnectionPoolExhausted)
            .copied()
            .unwrap_or(0)
            >= 1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn rate_mode_against_fast_coordinator() {
    init();
    let stub = spawn_stub(Duration::from_millis(10)).await;
    let coordinator = spawn_coordinator(stub, 5, Duration::from_secs(5)).await;
    let generator = generator(&coordinator.url, Duration::from_secs(10));

    let summary = generator
        .run_with_defaults(TestConfig::rate(1, Some(Duration::from_secs(5))).unwrap())
        .await;

    assert!(
        (4..=6).contains(&summary.total_requests),
        "total_requests = {}",
        summary.total_requests
    );
    assert_eq!(summary.success_rate, 100.);
    assert!(summary.errors.is_empty());
    assert!(summary.total_duration >= Duration::from_secs(5));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn slow_call_past_client_timeout_is_a_timeout() {
    init();
    let stub = spawn_stub(Duration::from_secs(2)).await;
    let coordinator = spawn_coordinator(stub, 5, Duration::from_secs(5)).await;
    let generator = generator(&coordinator.url, Duration::from_millis(300));

    let summary = generator
        .run_with_defaults(TestConfig::concurrency(2).unwrap())
        .await;

    assert_eq!(summary.failure_count, 2);
    assert_eq!(summary.errors.get(&ErrorCategory::Timeout), Some(&2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn downstream_timeout_is_a_server_error() {
    init();
    let stub = spawn_stub(Duration::from_secs(2)).await;
    let coordinator = spawn_coordinator(stub, 5, Duration::from_millis(200)).await;
    let generator = generator(&coordinator.url, Duration::from_secs(10));

    let summary = generator
        .run_with_defaults(TestConfig::concurrency(3).unwrap())
        .await;

    assert_eq!(
        summary.errors.get(&ErrorCategory::InternalServerError),
        Some(&3)
    );
    assert_eq!(coordinator.record_count().await, 0);
    assert_eq!(coordinator.coordinator.health().in_use, 0);
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn unreachable_coordinator_is_connection_refused() {
    init();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let generator = generator(&format!("http://{addr}"), Duration::from_secs(5));
    let summary = generator
        .run_with_defaults(TestConfig::concurrency(3).unwrap())
        .await;

    assert_eq!(summary.success_rate, 0.);
    assert_eq!(
        summary.errors.get(&ErrorCategory::ConnectionRefused),
        Some(&3)
    );
}
