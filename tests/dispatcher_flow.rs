use chrono::Utc;
use payment_relay::clock::ManualClock;
use payment_relay::domain::payment::{PaymentStatus, ReceivedPayment};
use payment_relay::health::monitor::HealthMonitor;
use payment_relay::processors::mock::MockProcessorClient;
use payment_relay::service::dispatcher::{DispatchTuning, ProcessorEndpoints, WorkerDispatcher};
use payment_relay::service::enqueuer::Enqueuer;
use payment_relay::store::audit::AuditKind;
use payment_relay::store::memory::MemoryBackend;
use payment_relay::store::queue::WorkQueue;
use payment_relay::store::records::RecordStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

const PRIMARY: &str = "http://processor-primary";
const FALLBACK: &str = "http://processor-fallback";

struct Harness {
    backend: Arc<MemoryBackend>,
    client: Arc<MockProcessorClient>,
    enqueuer: Enqueuer,
    dispatcher: WorkerDispatcher,
}

fn harness() -> Harness {
    let backend = Arc::new(MemoryBackend::default());
    let client = Arc::new(MockProcessorClient::default());
    let clock = Arc::new(ManualClock::new(Utc::now()));

    let health = Arc::new(HealthMonitor::new(
        client.clone(),
        clock.clone(),
        Duration::from_millis(5_000),
        Duration::from_millis(1_000),
    ));

    let enqueuer = Enqueuer {
        records: backend.clone(),
        queue: backend.clone(),
        audit: backend.clone(),
        clock: clock.clone(),
    };

    let dispatcher = WorkerDispatcher {
        records: backend.clone(),
        queue: backend.clone(),
        audit: backend.clone(),
        client: client.clone(),
        health,
        endpoints: ProcessorEndpoints {
            primary: PRIMARY.to_string(),
            fallback: FALLBACK.to_string(),
        },
        tuning: DispatchTuning {
            queue_wait: Duration::from_millis(50),
            ..DispatchTuning::default()
        },
        clock,
    };

    Harness {
        backend,
        client,
        enqueuer,
        dispatcher,
    }
}

fn event_names(events: &[payment_relay::store::audit::AuditEvent]) -> Vec<&'static str> {
    events.iter().map(|event| event.kind.name()).collect()
}

#[tokio::test]
async fn healthy_primary_settles_on_primary() {
    let h = harness();
    h.client.set_healthy(PRIMARY, true);

    let id = h
        .enqueuer
        .enqueue(ReceivedPayment {
            correlation_id: "c1".to_string(),
            amount: 100.0,
        })
        .await
        .unwrap();

    h.dispatcher.tick().await.unwrap();

    let record = h.backend.fetch(&id).await.unwrap().unwrap();
    assert_eq!(record.status, PaymentStatus::Done);
    assert_eq!(record.processor.as_deref(), Some(PRIMARY));
    assert!(record.remote_info.is_some());
    assert!(record.worker_started_at.is_some());
    assert!(record.processed_at.is_some());
    assert_eq!(record.worker_error, None);

    assert_eq!(h.client.settle_calls(PRIMARY).len(), 1);
    assert_eq!(h.client.settle_calls(FALLBACK).len(), 0);
    assert_eq!(
        h.client.settle_calls(PRIMARY)[0].timeout,
        Duration::from_millis(900)
    );

    let events = h.backend.events().await;
    assert_eq!(event_names(&events), vec!["enqueued", "processing", "done"]);
}

#[tokio::test]
async fn primary_failure_gets_exactly_one_fallback_retry() {
    let h = harness();
    h.client.set_healthy(PRIMARY, true);
    h.client.refuse_settlements(PRIMARY);

    let id = h
        .enqueuer
        .enqueue(ReceivedPayment {
            correlation_id: "c2".to_string(),
            amount: 50.0,
        })
        .await
        .unwrap();

    h.dispatcher.tick().await.unwrap();

    let record = h.backend.fetch(&id).await.unwrap().unwrap();
    assert_eq!(record.status, PaymentStatus::Done);
    assert_eq!(record.processor.as_deref(), Some(FALLBACK));

    assert_eq!(h.client.settle_calls(PRIMARY).len(), 1);
    let fallback_calls = h.client.settle_calls(FALLBACK);
    assert_eq!(fallback_calls.len(), 1);
    // The retry against the fallback runs on the longer bound.
    assert_eq!(fallback_calls[0].timeout, Duration::from_millis(1_200));

    let events = h.backend.events().await;
    assert_eq!(
        event_names(&events),
        vec!["enqueued", "processing", "processor_failed", "done"]
    );
    assert!(matches!(
        &events[2].kind,
        AuditKind::ProcessorFailed { endpoint, .. } if endpoint == PRIMARY
    ));
}

#[tokio::test]
async fn both_processors_failing_yields_failed_with_both_errors_audited() {
    let h = harness();
    h.client.set_healthy(PRIMARY, true);
    h.client.refuse_settlements(PRIMARY);
    h.client.refuse_settlements(FALLBACK);

    let id = h
        .enqueuer
        .enqueue(ReceivedPayment {
            correlation_id: "c2b".to_string(),
            amount: 50.0,
        })
        .await
        .unwrap();

    h.dispatcher.tick().await.unwrap();

    let record = h.backend.fetch(&id).await.unwrap().unwrap();
    assert_eq!(record.status, PaymentStatus::Failed);
    // The terminal error is the one from the last attempt.
    assert!(record.worker_error.as_deref().unwrap().contains(FALLBACK));

    let events = h.backend.events().await;
    assert_eq!(
        event_names(&events),
        vec![
            "enqueued",
            "processing",
            "processor_failed",
            "processor_failed",
            "failed"
        ]
    );
    assert!(matches!(
        &events[2].kind,
        AuditKind::ProcessorFailed { endpoint, .. } if endpoint == PRIMARY
    ));
    assert!(matches!(
        &events[3].kind,
        AuditKind::ProcessorFailed { endpoint, .. } if endpoint == FALLBACK
    ));
}

#[tokio::test]
async fn unhealthy_primary_goes_straight_to_fallback_and_never_retries() {
    let h = harness();
    h.client.set_healthy(PRIMARY, false);
    h.client.refuse_settlements(FALLBACK);

    let id = h
        .enqueuer
        .enqueue(ReceivedPayment {
            correlation_id: "c3".to_string(),
            amount: 75.0,
        })
        .await
        .unwrap();

    h.dispatcher.tick().await.unwrap();

    let record = h.backend.fetch(&id).await.unwrap().unwrap();
    assert_eq!(record.status, PaymentStatus::Failed);
    assert!(record.worker_error.is_some());

    // The primary is never tried, and the fallback's health is never probed.
    assert_eq!(h.client.settle_calls(PRIMARY).len(), 0);
    assert_eq!(h.client.settle_calls(FALLBACK).len(), 1);
    assert_eq!(
        h.client.settle_calls(FALLBACK)[0].timeout,
        Duration::from_millis(900)
    );
    assert_eq!(h.client.probes(), 1);

    let events = h.backend.events().await;
    assert_eq!(
        event_names(&events),
        vec!["enqueued", "processing", "processor_failed", "failed"]
    );
}

#[tokio::test]
async fn duplicate_queue_entries_are_skipped_by_the_claim_guard() {
    let h = harness();
    h.client.set_healthy(PRIMARY, true);

    let id = h
        .enqueuer
        .enqueue(ReceivedPayment {
            correlation_id: "dup".to_string(),
            amount: 10.0,
        })
        .await
        .unwrap();
    h.backend.push(&id).await.unwrap();

    h.dispatcher.tick().await.unwrap();
    h.dispatcher.tick().await.unwrap();

    let record = h.backend.fetch(&id).await.unwrap().unwrap();
    assert_eq!(record.status, PaymentStatus::Done);
    assert_eq!(h.client.settle_calls(PRIMARY).len(), 1);

    let events = h.backend.events().await;
    assert_eq!(event_names(&events), vec!["enqueued", "processing", "done"]);
}

#[tokio::test]
async fn queue_timeout_and_unknown_ids_are_quiet_no_ops() {
    let h = harness();

    h.dispatcher.tick().await.unwrap();

    h.backend.push("ghost").await.unwrap();
    h.dispatcher.tick().await.unwrap();

    assert!(h.backend.events().await.is_empty());
    assert_eq!(h.client.settle_calls(PRIMARY).len(), 0);
    assert_eq!(h.client.settle_calls(FALLBACK).len(), 0);
}

#[tokio::test]
async fn run_exits_when_the_shutdown_signal_fires() {
    let h = harness();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let handle = tokio::spawn(h.dispatcher.run(shutdown_rx));
    shutdown_tx.send(()).unwrap();

    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("dispatcher did not stop")
        .unwrap();
}

#[tokio::test]
async fn summary_aggregates_totals_per_processor_and_status() {
    let h = harness();
    h.client.set_healthy(PRIMARY, true);

    for amount in [100.0, 25.0] {
        h.enqueuer
            .enqueue(ReceivedPayment {
                correlation_id: "ok".to_string(),
                amount,
            })
            .await
            .unwrap();
        h.dispatcher.tick().await.unwrap();
    }

    h.client.refuse_settlements(PRIMARY);
    h.client.refuse_settlements(FALLBACK);
    h.enqueuer
        .enqueue(ReceivedPayment {
            correlation_id: "bad".to_string(),
            amount: 5.0,
        })
        .await
        .unwrap();
    h.dispatcher.tick().await.unwrap();

    let summary = h.backend.summarize().await.unwrap();
    assert_eq!(summary.by_status.get("done"), Some(&2));
    assert_eq!(summary.by_status.get("failed"), Some(&1));

    let primary = summary.by_processor.get(PRIMARY).unwrap();
    assert_eq!(primary.total_requests, 2);
    assert_eq!(primary.total_amount, 125.0);
    assert!(!summary.by_processor.contains_key(FALLBACK));
}
