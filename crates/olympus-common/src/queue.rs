//! Dispatch queue abstraction.
//!
//! An abstract FIFO: `push(queue_name, payload)` / `blocking_pop(queue_name,
//! timeout)`. Durable across restarts of producers/consumers, not across
//! restarts of the queue service itself. No deduplication, no ordering
//! guarantee across distinct queue names.
//!
//! The Redis implementation is deliberately a plain List (`RPUSH`/`BLPOP`)
//! rather than a Stream with consumer groups: the contract calls for simple
//! FIFO with at-least-once delivery, and retry/backoff is owned by the
//! producer (sisyphus's worker loop), not by the queue itself.

use async_trait::async_trait;
use deadpool_redis::Pool;

use crate::error::AppError;

#[async_trait]
pub trait Queue: Send + Sync {
    /// Append `payload` to the right of `queue_name`.
    async fn push(&self, queue_name: &str, payload: &[u8]) -> Result<(), AppError>;

    /// Pop from the left of `queue_name`, blocking up to `timeout_secs`.
    /// Returns `None` on timeout.
    async fn blocking_pop(
        &self,
        queue_name: &str,
        timeout_secs: u64,
    ) -> Result<Option<Vec<u8>>, AppError>;
}

/// Redis-List-backed queue.
pub struct RedisQueue {
    pool: Pool,
}

impl RedisQueue {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Queue for RedisQueue {
    async fn push(&self, queue_name: &str, payload: &[u8]) -> Result<(), AppError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::QueueError(e.to_string()))?;

        redis::cmd("RPUSH")
            .arg(queue_name)
            .arg(payload)
            .query_async::<()>(&mut *conn)
            .await
            .map_err(|e| AppError::QueueError(e.to_string()))?;

        Ok(())
    }

    async fn blocking_pop(
        &self,
        queue_name: &str,
        timeout_secs: u64,
    ) -> Result<Option<Vec<u8>>, AppError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::QueueError(e.to_string()))?;

        // BLPOP replies with [key, value] or nil on timeout.
        let reply: Option<(String, Vec<u8>)> = redis::cmd("BLPOP")
            .arg(queue_name)
            .arg(timeout_secs)
            .query_async(&mut *conn)
            .await
            .map_err(|e| AppError::QueueError(e.to_string()))?;

        Ok(reply.map(|(_, payload)| payload))
    }
}

/// Exponential backoff with a cap, used by producers that must retry a
/// failed push without picking up new work in the meantime.
pub struct Backoff {
    attempt: u32,
    cap_secs: u64,
}

impl Backoff {
    pub fn new(cap_secs: u64) -> Self {
        Self {
            attempt: 0,
            cap_secs,
        }
    }

    /// Delay for the current attempt, then advance to the next.
    pub fn next_delay(&mut self) -> std::time::Duration {
        let secs = (1u64 << self.attempt.min(20)).min(self.cap_secs);
        self.attempt += 1;
        std::time::Duration::from_secs(secs)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_caps_at_limit() {
        let mut b = Backoff::new(30);
        let delays: Vec<u64> = (0..8).map(|_| b.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30, 30]);
    }
}
