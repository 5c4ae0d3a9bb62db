use axum::routing::{get, post};
use axum::Router;
use payment_relay::clock::SystemClock;
use payment_relay::config::AppConfig;
use payment_relay::health::monitor::HealthMonitor;
use payment_relay::processors::http::HttpProcessorClient;
use payment_relay::service::dispatcher::{DispatchTuning, ProcessorEndpoints, WorkerDispatcher};
use payment_relay::service::enqueuer::Enqueuer;
use payment_relay::store::store_redis::RedisBackend;
use payment_relay::AppState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let backend = Arc::new(RedisBackend {
        client: redis::Client::open(cfg.redis_url.clone())?,
        queue_key: cfg.queue_key.clone(),
        record_prefix: cfg.record_prefix.clone(),
        stream_key: cfg.stream_key.clone(),
    });
    let clock = Arc::new(SystemClock);
    let client = Arc::new(HttpProcessorClient {
        client: reqwest::Client::new(),
    });

    let health = Arc::new(HealthMonitor::new(
        client.clone(),
        clock.clone(),
        Duration::from_millis(cfg.health_freshness_ms),
        Duration::from_millis(cfg.health_probe_timeout_ms),
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
        client,
        health,
        endpoints: ProcessorEndpoints {
            primary: cfg.processor_primary.clone(),
            fallback: cfg.processor_fallback.clone(),
        },
        tuning: DispatchTuning {
            queue_wait: Duration::from_secs(cfg.queue_wait_secs),
            settle_timeout: Duration::from_millis(cfg.settle_timeout_ms),
            fallback_retry_timeout: Duration::from_millis(cfg.fallback_retry_timeout_ms),
            error_backoff: Duration::from_millis(cfg.worker_backoff_ms),
        },
        clock,
    };

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(dispatcher.run(shutdown_rx));

    let state = AppState {
        enqueuer,
        records: backend,
    };

    let app = Router::new()
        .route(
            "/payments",
            post(payment_relay::http::handlers::payments::create_payment),
        )
        .route(
            "/payments-summary",
            get(payment_relay::http::handlers::payments::payments_summary),
        )
        .route(
            "/payments/service-health",
            get(payment_relay::http::handlers::payments::service_health),
        )
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;
    Ok(())
}

async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to install ctrl-c handler: {err}");
        return;
    }
    tracing::info!("shutdown requested");
    let _ = shutdown_tx.send(());
}
