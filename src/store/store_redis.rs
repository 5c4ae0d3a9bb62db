use crate::domain::payment::{PaymentRecord, PaymentStatus};
use crate::store::audit::{AuditEvent, AuditLog};
use crate::store::queue::WorkQueue;
use crate::store::records::{PaymentsSummary, RecordStore};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use std::collections::HashMap;
use std::time::Duration;

/// Redis backend for all three persisted shapes: the work queue is a list
/// (RPUSH/BRPOP), records are one hash per id, the audit trail is a stream.
#[derive(Clone)]
pub struct RedisBackend {
    pub client: redis::Client,
    pub queue_key: String,
    pub record_prefix: String,
    pub stream_key: String,
}

impl RedisBackend {
    fn record_key(&self, id: &str) -> String {
        format!("{}{}", self.record_prefix, id)
    }

    async fn conn(&self) -> Result<redis::aio::MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl RecordStore for RedisBackend {
    async fn create(&self, record: &PaymentRecord) -> Result<()> {
        let mut conn = self.conn().await?;
        let fields = record.to_fields();
        let _: () = conn
            .hset_multiple(self.record_key(&record.id), fields.as_slice())
            .await?;
        Ok(())
    }

    async fn fetch(&self, id: &str) -> Result<Option<PaymentRecord>> {
        let mut conn = self.conn().await?;
        let fields: HashMap<String, String> = conn.hgetall(self.record_key(id)).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        Ok(Some(PaymentRecord::from_fields(id, &fields)?))
    }

    async fn mark_processing(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        let mut conn = self.conn().await?;
        let fields = [
            (
                "status".to_string(),
                PaymentStatus::Processing.as_str().to_string(),
            ),
            ("workerStartedAt".to_string(), at.timestamp_millis().to_string()),
        ];
        let _: () = conn.hset_multiple(self.record_key(id), &fields).await?;
        Ok(())
    }

    async fn mark_done(
        &self,
        id: &str,
        processor: &str,
        remote_info: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut conn = self.conn().await?;
        let fields = [
            ("status".to_string(), PaymentStatus::Done.as_str().to_string()),
            ("processor".to_string(), processor.to_string()),
            ("remoteInfo".to_string(), remote_info.to_string()),
            ("processedAt".to_string(), at.timestamp_millis().to_string()),
        ];
        let _: () = conn.hset_multiple(self.record_key(id), &fields).await?;
        Ok(())
    }

    async fn mark_failed(&self, id: &str, error: &str, at: DateTime<Utc>) -> Result<()> {
        let mut conn = self.conn().await?;
        let fields = [
            (
                "status".to_string(),
                PaymentStatus::Failed.as_str().to_string(),
            ),
            ("workerError".to_string(), error.to_string()),
            ("processedAt".to_string(), at.timestamp_millis().to_string()),
        ];
        let _: () = conn.hset_multiple(self.record_key(id), &fields).await?;
        Ok(())
    }

    async fn summarize(&self) -> Result<PaymentsSummary> {
        let mut conn = self.conn().await?;
        let pattern = format!("{}*", self.record_prefix);
        let mut summary = PaymentsSummary::default();
        let mut cursor: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(200)
                .query_async(&mut conn)
                .await?;

            for key in keys {
                let fields: HashMap<String, String> =
                    conn.hgetall(&key).await.unwrap_or_default();
                if fields.is_empty() {
                    continue;
                }
                let id = key.strip_prefix(&self.record_prefix).unwrap_or(&key);
                if let Ok(record) = PaymentRecord::from_fields(id, &fields) {
                    summary.ingest(&record);
                }
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        Ok(summary)
    }
}

#[async_trait]
impl WorkQueue for RedisBackend {
    async fn push(&self, id: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: i64 = conn.rpush(&self.queue_key, id).await?;
        Ok(())
    }

    async fn pop(&self, wait: Duration) -> Result<Option<String>> {
        let mut conn = self.conn().await?;
        let popped: Option<(String, String)> = redis::cmd("BRPOP")
            .arg(&self.queue_key)
            .arg(wait.as_secs_f64())
            .query_async(&mut conn)
            .await?;
        Ok(popped.map(|(_, id)| id))
    }
}

#[async_trait]
impl AuditLog for RedisBackend {
    async fn append(&self, event: AuditEvent) -> Result<()> {
        let mut conn = self.conn().await?;
        let mut cmd = redis::cmd("XADD");
        cmd.arg(&self.stream_key)
            .arg("MAXLEN")
            .arg("~")
            .arg(1_000_000)
            .arg("*");
        for (field, value) in event.to_fields() {
            cmd.arg(field).arg(value);
        }
        let _: String = cmd.query_async(&mut conn).await?;
        Ok(())
    }
}
