#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub redis_url: String,
    pub processor_primary: String,
    pub processor_fallback: String,
    pub queue_key: String,
    pub record_prefix: String,
    pub stream_key: String,
    pub queue_wait_secs: u64,
    pub health_freshness_ms: u64,
    pub health_probe_timeout_ms: u64,
    pub settle_timeout_ms: u64,
    pub fallback_retry_timeout_ms: u64,
    pub worker_backoff_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379/".to_string()),
            processor_primary: std::env::var("PROCESSOR_PRIMARY")
                .unwrap_or_else(|_| "http://processor-primary".to_string()),
            processor_fallback: std::env::var("PROCESSOR_FALLBACK")
                .unwrap_or_else(|_| "http://processor-fallback".to_string()),
            queue_key: std::env::var("QUEUE_KEY").unwrap_or_else(|_| "payments:queue".to_string()),
            record_prefix: std::env::var("RECORD_KEY_PREFIX")
                .unwrap_or_else(|_| "payment:".to_string()),
            stream_key: std::env::var("AUDIT_STREAM_KEY")
                .unwrap_or_else(|_| "payments:stream".to_string()),
            queue_wait_secs: env_u64("QUEUE_WAIT_SECS", 5),
            health_freshness_ms: env_u64("HEALTH_FRESHNESS_MS", 5_000),
            health_probe_timeout_ms: env_u64("HEALTH_PROBE_TIMEOUT_MS", 1_000),
            settle_timeout_ms: env_u64("SETTLE_TIMEOUT_MS", 900),
            fallback_retry_timeout_ms: env_u64("FALLBACK_RETRY_TIMEOUT_MS", 1_200),
            worker_backoff_ms: env_u64("WORKER_BACKOFF_MS", 500),
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(default)
}
