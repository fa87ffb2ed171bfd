/*!
 * Concurrency and retry control for backend calls.
 *
 * `ConcurrencyLimiter` caps the number of in-flight attempts per client.
 * Waiters are served in the order they arrived, and a slot is returned when
 * its guard drops, whether the attempt succeeded or failed.
 *
 * `RetryPolicy` decides how many times a failed exchange is repeated and how
 * long to wait in between.
 */

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::errors::ClientError;

/// Default number of concurrent attempts per client
pub const DEFAULT_CONCURRENCY: usize = 2;

/// Default number of retries after the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default base backoff in milliseconds
pub const DEFAULT_BACKOFF_MS: u64 = 500;

/// FIFO-fair concurrency ceiling
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// A held slot; dropping it frees the slot for the next waiter
#[derive(Debug)]
pub struct ConcurrencySlot {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyLimiter {
    /// Limiter with `capacity` slots (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for a free slot
    pub async fn acquire(&self) -> Result<ConcurrencySlot, ClientError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| ClientError::network(format!("Concurrency limiter closed: {}", e)))?;
        Ok(ConcurrencySlot { _permit: permit })
    }

    /// Number of slots currently free
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ConcurrencyLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

/// Exponential backoff with a server-provided override for rate limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each further retry
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Whether a failure on zero-based `attempt` may be retried
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// Wait before retrying after `error` on zero-based `attempt`
    pub fn delay_for(&self, attempt: u32, error: &ClientError) -> Duration {
        if let ClientError::RateLimit {
            retry_after_secs: Some(secs),
            ..
        } = error
        {
            if *secs > 0 {
                return Duration::from_secs(*secs);
            }
        }
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}
