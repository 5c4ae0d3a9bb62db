use crate::processors::{ProcessorClient, SettleRequest};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Scriptable processor used by the test suite. Endpoints that have never
/// been given a health verdict count as unreachable; settlements succeed
/// unless the endpoint was told to refuse them.
#[derive(Default)]
pub struct MockProcessorClient {
    health: Mutex<HashMap<String, bool>>,
    refusing: Mutex<HashSet<String>>,
    settles: Mutex<Vec<SettleCall>>,
    probes: AtomicUsize,
}

#[derive(Debug, Clone)]
pub struct SettleCall {
    pub endpoint: String,
    pub request: SettleRequest,
    pub timeout: Duration,
}

impl MockProcessorClient {
    pub fn set_healthy(&self, endpoint: &str, healthy: bool) {
        self.health
            .lock()
            .expect("mock state poisoned")
            .insert(endpoint.to_string(), healthy);
    }

    pub fn refuse_settlements(&self, endpoint: &str) {
        self.refusing
            .lock()
            .expect("mock state poisoned")
            .insert(endpoint.to_string());
    }

    /// Number of health probes that actually reached the mock.
    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn settle_calls(&self, endpoint: &str) -> Vec<SettleCall> {
        self.settles
            .lock()
            .expect("mock state poisoned")
            .iter()
            .filter(|call| call.endpoint == endpoint)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ProcessorClient for MockProcessorClient {
    async fn check_health(&self, endpoint: &str, _timeout: Duration) -> Result<bool> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        match self
            .health
            .lock()
            .expect("mock state poisoned")
            .get(endpoint)
        {
            Some(healthy) => Ok(*healthy),
            None => bail!("connection refused"),
        }
    }

    async fn settle(
        &self,
        endpoint: &str,
        request: &SettleRequest,
        timeout: Duration,
    ) -> Result<serde_json::Value> {
        self.settles
            .lock()
            .expect("mock state poisoned")
            .push(SettleCall {
                endpoint: endpoint.to_string(),
                request: request.clone(),
                timeout,
            });

        if self
            .refusing
            .lock()
            .expect("mock state poisoned")
            .contains(endpoint)
        {
            bail!("settlement refused by {endpoint}");
        }

        Ok(serde_json::json!({ "settledBy": endpoint, "id": request.id.clone() }))
    }
}
