use crate::processors::{HealthBody, ProcessorClient, SettleRequest};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

#[derive(Clone)]
pub struct HttpProcessorClient {
    pub client: reqwest::Client,
}

#[async_trait]
impl ProcessorClient for HttpProcessorClient {
    async fn check_health(&self, endpoint: &str, timeout: Duration) -> Result<bool> {
        let resp = self
            .client
            .get(format!("{endpoint}/service-health"))
            .timeout(timeout)
            .send()
            .await?;

        let body: HealthBody = resp.json().await.unwrap_or_default();
        Ok(body.ok)
    }

    async fn settle(
        &self,
        endpoint: &str,
        request: &SettleRequest,
        timeout: Duration,
    ) -> Result<serde_json::Value> {
        let resp = self
            .client
            .post(format!("{endpoint}/payments"))
            .json(request)
            .timeout(timeout)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            bail!("processor returned status {status}");
        }

        Ok(resp
            .json()
            .await
            .unwrap_or_else(|_| serde_json::json!({})))
    }
}
