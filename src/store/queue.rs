use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// FIFO of pending payment ids.
///
/// `pop` removes unconditionally; there is no visibility timeout or
/// redelivery. An id popped and then abandoned is gone from the queue.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    async fn push(&self, id: &str) -> Result<()>;

    /// Blocks for at most `wait`, returning `None` on timeout so the
    /// consumer loop stays live.
    async fn pop(&self, wait: Duration) -> Result<Option<String>>;
}
