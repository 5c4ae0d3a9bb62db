use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub enum AuditKind {
    Enqueued { amount: f64 },
    Processing,
    ProcessorFailed { endpoint: String, error: String },
    Failed { error: String },
    Done { processor: String },
}

impl AuditKind {
    pub fn name(&self) -> &'static str {
        match self {
            AuditKind::Enqueued { .. } => "enqueued",
            AuditKind::Processing => "processing",
            AuditKind::ProcessorFailed { .. } => "processor_failed",
            AuditKind::Failed { .. } => "failed",
            AuditKind::Done { .. } => "done",
        }
    }
}

/// One lifecycle transition. Events are only ever appended, never read back
/// by the worker; they exist for external observability tooling.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    pub payment_id: String,
    pub at: DateTime<Utc>,
    pub kind: AuditKind,
}

impl AuditEvent {
    pub fn new(payment_id: impl Into<String>, at: DateTime<Utc>, kind: AuditKind) -> Self {
        Self {
            payment_id: payment_id.into(),
            at,
            kind,
        }
    }

    /// Wire shape of one stream entry.
    pub fn to_fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("id".to_string(), self.payment_id.clone()),
            ("event".to_string(), self.kind.name().to_string()),
        ];
        match &self.kind {
            AuditKind::Enqueued { amount } => {
                fields.push(("amount".to_string(), amount.to_string()));
            }
            AuditKind::Processing => {}
            AuditKind::ProcessorFailed { endpoint, error } => {
                fields.push(("url".to_string(), endpoint.clone()));
                fields.push(("err".to_string(), error.clone()));
            }
            AuditKind::Failed { error } => {
                fields.push(("err".to_string(), error.clone()));
            }
            AuditKind::Done { processor } => {
                fields.push(("processor".to_string(), processor.clone()));
            }
        }
        fields.push(("ts".to_string(), self.at.timestamp_millis().to_string()));
        fields
    }
}

#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Appends exactly one event at the next position in the stream.
    async fn append(&self, event: AuditEvent) -> Result<()>;
}
