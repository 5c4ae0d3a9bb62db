use anyhow::{bail, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Intake payload. No validation happens here; whatever the caller sends is
/// stored and queued as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedPayment {
    pub correlation_id: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Queued,
    Processing,
    Done,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Queued => "queued",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Done => "done",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "queued" => Ok(PaymentStatus::Queued),
            "processing" => Ok(PaymentStatus::Processing),
            "done" => Ok(PaymentStatus::Done),
            "failed" => Ok(PaymentStatus::Failed),
            other => bail!("unknown payment status {other:?}"),
        }
    }
}

/// One record per accepted payment. `status` is the single source of truth
/// for whether the payment has been, or is being, handled.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRecord {
    pub id: String,
    pub correlation_id: String,
    pub amount: f64,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub worker_started_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
    pub processor: Option<String>,
    pub remote_info: Option<String>,
    pub worker_error: Option<String>,
}

impl PaymentRecord {
    pub fn queued(id: &str, payment: &ReceivedPayment, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            correlation_id: payment.correlation_id.clone(),
            amount: payment.amount,
            status: PaymentStatus::Queued,
            created_at,
            worker_started_at: None,
            processed_at: None,
            processor: None,
            remote_info: None,
            worker_error: None,
        }
    }

    /// Flat field-value mapping as persisted (camelCase keys, epoch-millis
    /// timestamps). Absent optionals are not written.
    pub fn to_fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("correlationId".to_string(), self.correlation_id.clone()),
            ("amount".to_string(), self.amount.to_string()),
            ("status".to_string(), self.status.as_str().to_string()),
            ("createdAt".to_string(), millis(self.created_at)),
        ];
        if let Some(at) = self.worker_started_at {
            fields.push(("workerStartedAt".to_string(), millis(at)));
        }
        if let Some(at) = self.processed_at {
            fields.push(("processedAt".to_string(), millis(at)));
        }
        if let Some(processor) = &self.processor {
            fields.push(("processor".to_string(), processor.clone()));
        }
        if let Some(info) = &self.remote_info {
            fields.push(("remoteInfo".to_string(), info.clone()));
        }
        if let Some(err) = &self.worker_error {
            fields.push(("workerError".to_string(), err.clone()));
        }
        fields
    }

    pub fn from_fields(id: &str, fields: &HashMap<String, String>) -> Result<Self> {
        let status = fields
            .get("status")
            .with_context(|| format!("payment record {id} has no status"))?;
        let created_at = fields
            .get("createdAt")
            .and_then(|v| parse_millis(v))
            .with_context(|| format!("payment record {id} has no createdAt"))?;

        Ok(Self {
            id: id.to_string(),
            correlation_id: fields.get("correlationId").cloned().unwrap_or_default(),
            amount: fields
                .get("amount")
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap_or(0.0),
            status: PaymentStatus::parse(status)?,
            created_at,
            worker_started_at: fields.get("workerStartedAt").and_then(|v| parse_millis(v)),
            processed_at: fields.get("processedAt").and_then(|v| parse_millis(v)),
            processor: fields.get("processor").cloned(),
            remote_info: fields.get("remoteInfo").cloned(),
            worker_error: fields.get("workerError").cloned(),
        })
    }
}

fn millis(at: DateTime<Utc>) -> String {
    at.timestamp_millis().to_string()
}

fn parse_millis(value: &str) -> Option<DateTime<Utc>> {
    value
        .parse::<i64>()
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
}
