use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use super::InMemoryWatchSource;
use super::RateLimitedSource;
use super::WatchSource;
use crate::test_utils::pod;
use crate::test_utils::TestPod;
use crate::WatchConfig;

fn limited(
    qps: f64,
    burst: u32,
) -> RateLimitedSource<Arc<InMemoryWatchSource<TestPod>>> {
    let config = WatchConfig {
        qps,
        burst,
        ..WatchConfig::default()
    };
    RateLimitedSource::new(Arc::new(InMemoryWatchSource::new()), &config)
}

#[tokio::test]
async fn test_requests_within_burst_are_not_delayed() {
    let source = limited(1.0, 3);
    let start = Instant::now();

    for _ in 0..3 {
        source.list().await.unwrap();
    }
    assert!(start.elapsed() < Duration::from_millis(100));
}

#[tokio::test]
async fn test_requests_beyond_burst_are_throttled_to_qps() {
    let source = limited(10.0, 1);
    let start = Instant::now();

    source.server_version().await.unwrap();
    source.list().await.unwrap();
    let _stream = source.watch("").await.unwrap();

    // Two throttled requests at 10 qps
    assert!(start.elapsed() >= Duration::from_millis(180));
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_delegates_to_inner_source() {
    let source = limited(100.0, 10);
    source.inner().apply(pod("ns1", "foo")).unwrap();

    let list = source.list().await.unwrap();
    assert_eq!(list.items.len(), 1);
    assert_eq!(source.inner().list_calls(), 1);
}

#[tokio::test]
async fn test_limits_are_per_instance() {
    let first = limited(1.0, 1);
    let second = limited(1.0, 1);
    let start = Instant::now();

    first.list().await.unwrap();
    second.list().await.unwrap();
    assert!(start.elapsed() < Duration::from_millis(500));
}

#[tokio::test]
async fn test_tiny_rate_admits_burst_without_panicking() {
    let source = limited(1e-300, 2);

    source.list().await.unwrap();
    source.list().await.unwrap();
    assert_eq!(source.inner().list_calls(), 2);
}
