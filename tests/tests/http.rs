use surge_tests::*;

use std::time::Duration;
use surge::TestSummary;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn test_and_status_over_http() {
    init();
    let stub = spawn_stub(Duration::from_millis(500)).await;
    let coordinator = spawn_coordinator(stub, 2, Duration::from_secs(5)).await;
    let generator = spawn_generator(&coordinator.url, Duration::from_secs(10)).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("http://{generator}/test/4"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let summary: TestSummary = res.json().await.unwrap();
    assert_eq!(summary.total_requests, 4);
    assert_eq!(summary.success_count, 2);
    assert_eq!(
        summary.success_count + summary.failure_count,
        summary.total_requests
    );

    let first = client
        .get(format!("http://{generator}/status"))
        .send()
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();
    let second = client
        .get(format!("http://{generator}/status"))
        .send()
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();
    assert_eq!(first, second);

    let res = client
        .get(format!("http://{generator}/test/1001"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);

    let after = client
        .get(format!("http://{generator}/status"))
        .send()
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();
    assert_eq!(first, after);

    let health: serde_json::Value = client
        .get(format!("{}/health", coordinator.url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["pool"]["max"], 2);
    assert_eq!(health["pool"]["in_use"], 0);
}
