use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod http;
pub mod mock;

/// Body of one settlement call.
#[derive(Debug, Clone, Serialize)]
pub struct SettleRequest {
    pub id: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HealthBody {
    #[serde(default)]
    pub ok: bool,
}

#[async_trait]
pub trait ProcessorClient: Send + Sync {
    /// Liveness probe against one endpoint. `Err` means the endpoint could
    /// not be reached within `timeout`; a reachable endpoint reporting
    /// `ok: false` is `Ok(false)`.
    async fn check_health(&self, endpoint: &str, timeout: Duration) -> Result<bool>;

    /// One settlement attempt. Fails on non-2xx, timeout, or transport
    /// error; a malformed success body degrades to an empty object.
    async fn settle(
        &self,
        endpoint: &str,
        request: &SettleRequest,
        timeout: Duration,
    ) -> Result<serde_json::Value>;
}
