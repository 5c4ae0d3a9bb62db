use chrono::Utc;
use payment_relay::clock::ManualClock;
use payment_relay::health::monitor::HealthMonitor;
use payment_relay::processors::mock::MockProcessorClient;
use std::sync::Arc;
use std::time::Duration;

const ENDPOINT: &str = "http://processor-primary";

fn monitor() -> (HealthMonitor, Arc<MockProcessorClient>, Arc<ManualClock>) {
    let client = Arc::new(MockProcessorClient::default());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let monitor = HealthMonitor::new(
        client.clone(),
        clock.clone(),
        Duration::from_millis(5_000),
        Duration::from_millis(1_000),
    );
    (monitor, client, clock)
}

#[tokio::test]
async fn probes_within_the_freshness_window_hit_the_cache() {
    let (monitor, client, clock) = monitor();
    client.set_healthy(ENDPOINT, true);

    let first = monitor.probe(ENDPOINT).await;
    assert!(first.healthy);
    assert!(first.latency_ms.is_some());
    assert_eq!(client.probes(), 1);

    clock.advance_millis(4_999);
    let second = monitor.probe(ENDPOINT).await;
    assert_eq!(second, first);
    assert_eq!(client.probes(), 1);

    clock.advance_millis(2);
    let third = monitor.probe(ENDPOINT).await;
    assert_eq!(client.probes(), 2);
    assert!(third.observed_at > first.observed_at);
}

#[tokio::test]
async fn a_failed_probe_sticks_for_the_whole_window() {
    let (monitor, client, clock) = monitor();

    // Unscripted endpoint: the probe cannot reach it.
    let first = monitor.probe(ENDPOINT).await;
    assert!(!first.healthy);
    assert_eq!(first.latency_ms, None);
    assert_eq!(client.probes(), 1);

    // The endpoint recovers, but the cached failure still masks it.
    client.set_healthy(ENDPOINT, true);
    let masked = monitor.probe(ENDPOINT).await;
    assert!(!masked.healthy);
    assert_eq!(client.probes(), 1);

    clock.advance_millis(5_001);
    let refreshed = monitor.probe(ENDPOINT).await;
    assert!(refreshed.healthy);
    assert_eq!(client.probes(), 2);
}

#[tokio::test]
async fn a_reachable_endpoint_reporting_not_ok_is_unhealthy_with_latency() {
    let (monitor, client, _clock) = monitor();
    client.set_healthy(ENDPOINT, false);

    let status = monitor.probe(ENDPOINT).await;
    assert!(!status.healthy);
    assert!(status.latency_ms.is_some());
}

#[tokio::test]
async fn endpoints_are_cached_independently() {
    let (monitor, client, _clock) = monitor();
    client.set_healthy("http://a", true);
    client.set_healthy("http://b", false);

    assert!(monitor.probe("http://a").await.healthy);
    assert!(!monitor.probe("http://b").await.healthy);
    assert_eq!(client.probes(), 2);
}
