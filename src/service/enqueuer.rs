use crate::clock::Clock;
use crate::domain::payment::{PaymentRecord, ReceivedPayment};
use crate::store::audit::{AuditEvent, AuditKind, AuditLog};
use crate::store::queue::WorkQueue;
use crate::store::records::RecordStore;
use anyhow::Result;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct Enqueuer {
    pub records: Arc<dyn RecordStore>,
    pub queue: Arc<dyn WorkQueue>,
    pub audit: Arc<dyn AuditLog>,
    pub clock: Arc<dyn Clock>,
}

impl Enqueuer {
    /// Accept a payment for asynchronous settlement and return its assigned
    /// id. Three independent writes, not atomic; the record lands before the
    /// queue entry so a popped id should always resolve.
    pub async fn enqueue(&self, payment: ReceivedPayment) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let now = self.clock.now();
        let record = PaymentRecord::queued(&id, &payment, now);

        self.records.create(&record).await?;
        self.queue.push(&id).await?;
        self.audit
            .append(AuditEvent::new(
                &id,
                now,
                AuditKind::Enqueued {
                    amount: payment.amount,
                },
            ))
            .await?;

        Ok(id)
    }
}
