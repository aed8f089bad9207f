//! Jittered exponential backoff retry policy for transient transport errors.

// Layer 1: Standard library imports
use std::future::Future;
use std::time::Duration;

// Layer 2: Third-party crate imports
use rand::Rng;

// Layer 3: Internal module imports
use crate::transport::error::TransportError;

/// Bounded, jittered exponential backoff for transport calls.
///
/// Only errors where [`TransportError::is_transient`] returns `true` are
/// retried; anything else (an unknown silo, a response the callee itself
/// rejected) is returned to the caller immediately.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Base delay before the first retry.
    pub base_delay: Duration,
    /// Ceiling on the computed backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the given bounds.
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Compute the backoff delay before retry attempt number `attempt`
    /// (1-indexed: the delay before the *second* overall attempt).
    ///
    /// Full jitter: a uniformly random value in `[0, min(max_delay, base * 2^(attempt-1))]`.
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(1u32 << attempt.saturating_sub(1).min(20));
        let capped = exp.min(self.max_delay);
        if capped.is_zero() {
            return capped;
        }
        let jittered_millis = rand::thread_rng().gen_range(0..=capped.as_millis().max(1) as u64);
        Duration::from_millis(jittered_millis)
    }

    /// Run `operation`, retrying transient [`TransportError`]s up to
    /// `max_attempts` times with jittered exponential backoff between
    /// tries.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, TransportError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    tokio::time::sleep(self.backoff_for_attempt(attempt)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
