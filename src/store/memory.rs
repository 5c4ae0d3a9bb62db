use crate::domain::payment::{PaymentRecord, PaymentStatus};
use crate::store::audit::{AuditEvent, AuditLog};
use crate::store::queue::WorkQueue;
use crate::store::records::{PaymentsSummary, RecordStore};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

/// In-memory backend with the same semantics as the Redis one, used by the
/// test suite and local demos.
#[derive(Default)]
pub struct MemoryBackend {
    records: Mutex<HashMap<String, PaymentRecord>>,
    queue: Mutex<VecDeque<String>>,
    queue_signal: Notify,
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryBackend {
    pub async fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().await.clone()
    }

    pub async fn queued_ids(&self) -> Vec<String> {
        self.queue.lock().await.iter().cloned().collect()
    }
}

#[async_trait]
impl RecordStore for MemoryBackend {
    async fn create(&self, record: &PaymentRecord) -> Result<()> {
        self.records
            .lock()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn fetch(&self, id: &str) -> Result<Option<PaymentRecord>> {
        Ok(self.records.lock().await.get(id).cloned())
    }

    async fn mark_processing(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(id)
            .with_context(|| format!("no payment record for {id}"))?;
        record.status = PaymentStatus::Processing;
        record.worker_started_at = Some(at);
        Ok(())
    }

    async fn mark_done(
        &self,
        id: &str,
        processor: &str,
        remote_info: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(id)
            .with_context(|| format!("no payment record for {id}"))?;
        record.status = PaymentStatus::Done;
        record.processor = Some(processor.to_string());
        record.remote_info = Some(remote_info.to_string());
        record.processed_at = Some(at);
        Ok(())
    }

    async fn mark_failed(&self, id: &str, error: &str, at: DateTime<Utc>) -> Result<()> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(id)
            .with_context(|| format!("no payment record for {id}"))?;
        record.status = PaymentStatus::Failed;
        record.worker_error = Some(error.to_string());
        record.processed_at = Some(at);
        Ok(())
    }

    async fn summarize(&self) -> Result<PaymentsSummary> {
        let records = self.records.lock().await;
        let mut summary = PaymentsSummary::default();
        for record in records.values() {
            summary.ingest(record);
        }
        Ok(summary)
    }
}

#[async_trait]
impl WorkQueue for MemoryBackend {
    async fn push(&self, id: &str) -> Result<()> {
        self.queue.lock().await.push_back(id.to_string());
        self.queue_signal.notify_one();
        Ok(())
    }

    async fn pop(&self, wait: Duration) -> Result<Option<String>> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            if let Some(id) = self.queue.lock().await.pop_front() {
                return Ok(Some(id));
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(None);
            }
            // Wake on push or deadline, then re-check the queue.
            let _ = tokio::time::timeout_at(deadline, self.queue_signal.notified()).await;
        }
    }
}

#[async_trait]
impl AuditLog for MemoryBackend {
    async fn append(&self, event: AuditEvent) -> Result<()> {
        self.events.lock().await.push(event);
        Ok(())
    }
}
