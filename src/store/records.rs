use crate::domain::payment::{PaymentRecord, PaymentStatus};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorTotals {
    pub total_requests: u64,
    pub total_amount: f64,
}

/// Aggregate view over the record store, served to the reporting endpoint.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentsSummary {
    pub by_processor: HashMap<String, ProcessorTotals>,
    pub by_status: HashMap<String, u64>,
}

impl PaymentsSummary {
    pub fn ingest(&mut self, record: &PaymentRecord) {
        *self
            .by_status
            .entry(record.status.as_str().to_string())
            .or_default() += 1;

        if record.status == PaymentStatus::Done {
            if let Some(processor) = &record.processor {
                let totals = self.by_processor.entry(processor.clone()).or_default();
                totals.total_requests += 1;
                totals.total_amount += record.amount;
            }
        }
    }
}

/// Durable mapping from payment id to its mutable status record.
///
/// The `mark_*` transitions write only the fields owned by that transition;
/// everything else on the record is left untouched.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create(&self, record: &PaymentRecord) -> Result<()>;

    /// `Ok(None)` when no record exists for the id.
    async fn fetch(&self, id: &str) -> Result<Option<PaymentRecord>>;

    async fn mark_processing(&self, id: &str, at: DateTime<Utc>) -> Result<()>;

    async fn mark_done(
        &self,
        id: &str,
        processor: &str,
        remote_info: &str,
        at: DateTime<Utc>,
    ) -> Result<()>;

    async fn mark_failed(&self, id: &str, error: &str, at: DateTime<Utc>) -> Result<()>;

    async fn summarize(&self) -> Result<PaymentsSummary>;
}
