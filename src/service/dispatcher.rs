use crate::clock::Clock;
use crate::domain::payment::PaymentStatus;
use crate::health::monitor::HealthMonitor;
use crate::processors::{ProcessorClient, SettleRequest};
use crate::store::audit::{AuditEvent, AuditKind, AuditLog};
use crate::store::queue::WorkQueue;
use crate::store::records::RecordStore;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

#[derive(Debug, Clone)]
pub struct ProcessorEndpoints {
    pub primary: String,
    pub fallback: String,
}

#[derive(Debug, Clone)]
pub struct DispatchTuning {
    pub queue_wait: Duration,
    pub settle_timeout: Duration,
    pub fallback_retry_timeout: Duration,
    pub error_backoff: Duration,
}

impl Default for DispatchTuning {
    fn default() -> Self {
        Self {
            queue_wait: Duration::from_secs(5),
            settle_timeout: Duration::from_millis(900),
            fallback_retry_timeout: Duration::from_millis(1_200),
            error_backoff: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettleAttempt {
    pub endpoint: String,
    pub timeout: Duration,
}

/// The primary-then-fallback-once policy as data.
///
/// A healthy primary gets one shot, with the fallback queued behind it on a
/// longer bound. A fallback chosen over an unhealthy primary gets no second
/// try: the only remaining endpoint is the one just reported unhealthy.
pub fn settlement_attempts(
    primary_healthy: bool,
    endpoints: &ProcessorEndpoints,
    tuning: &DispatchTuning,
) -> Vec<SettleAttempt> {
    if primary_healthy {
        vec![
            SettleAttempt {
                endpoint: endpoints.primary.clone(),
                timeout: tuning.settle_timeout,
            },
            SettleAttempt {
                endpoint: endpoints.fallback.clone(),
                timeout: tuning.fallback_retry_timeout,
            },
        ]
    } else {
        vec![SettleAttempt {
            endpoint: endpoints.fallback.clone(),
            timeout: tuning.settle_timeout,
        }]
    }
}

#[derive(Debug)]
pub enum SettlementOutcome {
    Succeeded {
        endpoint: String,
        response: serde_json::Value,
    },
    Exhausted {
        errors: Vec<AttemptFailure>,
    },
}

#[derive(Debug, Clone)]
pub struct AttemptFailure {
    pub endpoint: String,
    pub error: String,
}

/// The single consumer of the work queue. Drives every record through
/// `queued -> processing -> {done | failed}`; nothing else writes those
/// transitions.
pub struct WorkerDispatcher {
    pub records: Arc<dyn RecordStore>,
    pub queue: Arc<dyn WorkQueue>,
    pub audit: Arc<dyn AuditLog>,
    pub client: Arc<dyn ProcessorClient>,
    pub health: Arc<HealthMonitor>,
    pub endpoints: ProcessorEndpoints,
    pub tuning: DispatchTuning,
    pub clock: Arc<dyn Clock>,
}

impl WorkerDispatcher {
    /// Runs until the shutdown signal fires. Shutdown is observed between
    /// iterations; the bounded queue wait keeps each iteration short.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        loop {
            match shutdown.try_recv() {
                Err(broadcast::error::TryRecvError::Empty) => {}
                _ => {
                    tracing::info!("worker dispatcher stopping");
                    break;
                }
            }

            if let Err(err) = self.tick().await {
                tracing::error!("worker loop error: {err:#}");
                tokio::time::sleep(self.tuning.error_backoff).await;
            }
        }
    }

    /// One pass: pop an id (bounded wait) and settle it. A pop timeout is a
    /// quiet no-op so the loop can re-check the shutdown signal.
    pub async fn tick(&self) -> Result<()> {
        let Some(id) = self.queue.pop(self.tuning.queue_wait).await? else {
            return Ok(());
        };
        self.process(&id).await
    }

    async fn process(&self, id: &str) -> Result<()> {
        let Some(record) = self.records.fetch(id).await? else {
            tracing::warn!("queued payment {} has no record, skipping", id);
            return Ok(());
        };

        // Claim guard against duplicate queue entries. Check-then-act: only
        // safe while this loop is the sole consumer.
        if matches!(
            record.status,
            PaymentStatus::Processing | PaymentStatus::Done
        ) {
            return Ok(());
        }

        let started = self.clock.now();
        self.records.mark_processing(id, started).await?;
        self.audit
            .append(AuditEvent::new(id, started, AuditKind::Processing))
            .await?;

        let primary = self.health.probe(&self.endpoints.primary).await;
        let attempts = settlement_attempts(primary.healthy, &self.endpoints, &self.tuning);
        let outcome = self.execute(id, record.amount, attempts).await?;

        let finished = self.clock.now();
        match outcome {
            SettlementOutcome::Succeeded { endpoint, response } => {
                self.records
                    .mark_done(id, &endpoint, &response.to_string(), finished)
                    .await?;
                self.audit
                    .append(AuditEvent::new(
                        id,
                        finished,
                        AuditKind::Done {
                            processor: endpoint,
                        },
                    ))
                    .await?;
            }
            SettlementOutcome::Exhausted { errors } => {
                let last = errors
                    .last()
                    .map(|failure| failure.error.clone())
                    .unwrap_or_default();
                self.records.mark_failed(id, &last, finished).await?;
                self.audit
                    .append(AuditEvent::new(
                        id,
                        finished,
                        AuditKind::Failed { error: last },
                    ))
                    .await?;
            }
        }

        Ok(())
    }

    /// Walks the attempt plan in order, auditing each failed attempt. The
    /// `Err` branch is for backend trouble only; settlement failures are
    /// part of the outcome.
    async fn execute(
        &self,
        id: &str,
        amount: f64,
        attempts: Vec<SettleAttempt>,
    ) -> Result<SettlementOutcome> {
        let request = SettleRequest {
            id: id.to_string(),
            amount,
        };
        let mut failures = Vec::new();

        for attempt in attempts {
            match self
                .client
                .settle(&attempt.endpoint, &request, attempt.timeout)
                .await
            {
                Ok(response) => {
                    return Ok(SettlementOutcome::Succeeded {
                        endpoint: attempt.endpoint,
                        response,
                    });
                }
                Err(err) => {
                    let failure = AttemptFailure {
                        endpoint: attempt.endpoint,
                        error: err.to_string(),
                    };
                    self.audit
                        .append(AuditEvent::new(
                            id,
                            self.clock.now(),
                            AuditKind::ProcessorFailed {
                                endpoint: failure.endpoint.clone(),
                                error: failure.error.clone(),
                            },
                        ))
                        .await?;
                    failures.push(failure);
                }
            }
        }

        Ok(SettlementOutcome::Exhausted { errors: failures })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints() -> ProcessorEndpoints {
        ProcessorEndpoints {
            primary: "http://primary".to_string(),
            fallback: "http://fallback".to_string(),
        }
    }

    #[test]
    fn healthy_primary_gets_one_fallback_retry_on_a_longer_bound() {
        let attempts = settlement_attempts(true, &endpoints(), &DispatchTuning::default());

        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].endpoint, "http://primary");
        assert_eq!(attempts[0].timeout, Duration::from_millis(900));
        assert_eq!(attempts[1].endpoint, "http://fallback");
        assert_eq!(attempts[1].timeout, Duration::from_millis(1_200));
    }

    #[test]
    fn unhealthy_primary_routes_straight_to_fallback_with_no_retry() {
        let attempts = settlement_attempts(false, &endpoints(), &DispatchTuning::default());

        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].endpoint, "http://fallback");
        assert_eq!(attempts[0].timeout, Duration::from_millis(900));
    }
}
