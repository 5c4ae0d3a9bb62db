use crate::clock::Clock;
use crate::processors::ProcessorClient;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq)]
pub struct HealthStatus {
    pub healthy: bool,
    pub observed_at: DateTime<Utc>,
    pub latency_ms: Option<u64>,
}

/// Last-value health cache, one entry per processor endpoint.
///
/// An entry younger than the freshness window is returned as-is with no
/// network call; otherwise a fresh probe overwrites it. A failed probe also
/// sticks for the whole window before being retried.
pub struct HealthMonitor {
    client: Arc<dyn ProcessorClient>,
    clock: Arc<dyn Clock>,
    freshness: Duration,
    probe_timeout: Duration,
    cache: RwLock<HashMap<String, HealthStatus>>,
}

impl HealthMonitor {
    pub fn new(
        client: Arc<dyn ProcessorClient>,
        clock: Arc<dyn Clock>,
        freshness: Duration,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            client,
            clock,
            freshness,
            probe_timeout,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Never fails: an unreachable endpoint is reported unhealthy.
    pub async fn probe(&self, endpoint: &str) -> HealthStatus {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(endpoint) {
                let age = self.clock.now() - entry.observed_at;
                if age.num_milliseconds() < self.freshness.as_millis() as i64 {
                    return entry.clone();
                }
            }
        }

        let started = self.clock.now();
        let entry = match self.client.check_health(endpoint, self.probe_timeout).await {
            Ok(healthy) => {
                let latency = (self.clock.now() - started).num_milliseconds().max(0) as u64;
                HealthStatus {
                    healthy,
                    observed_at: self.clock.now(),
                    latency_ms: Some(latency),
                }
            }
            Err(err) => {
                tracing::warn!("health probe for {} failed: {}", endpoint, err);
                HealthStatus {
                    healthy: false,
                    observed_at: self.clock.now(),
                    latency_ms: None,
                }
            }
        };

        let mut cache = self.cache.write().await;
        cache.insert(endpoint.to_string(), entry.clone());
        entry
    }
}
