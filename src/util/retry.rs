//! Retry with exponential backoff and jitter.

use std::future::Future;
use std::time::Duration;

use crate::error::RociError;

/// Retry policy for model calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Backoff before retry number `retry` (0-based), without jitter.
    ///
    /// Always within `[0, max_backoff]`, whatever the multiplier.
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let scaled = self.initial_backoff.as_secs_f64() * self.multiplier.powi(retry as i32);
        Duration::from_secs_f64(scaled.min(self.max_backoff.as_secs_f64()).max(0.0))
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error, or
    /// the attempts are used up.
    ///
    /// A provider-supplied `retry_after_ms` replaces the computed backoff.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, RociError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RociError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut retry = 0;
        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if !err.is_retryable() || retry + 1 >= attempts {
                return Err(err);
            }

            let delay = match &err {
                RociError::RateLimited {
                    retry_after_ms: Some(ms),
                } => Duration::from_millis(*ms),
                _ => jittered(self.backoff_for(retry)),
            };
            tracing::warn!(
                attempt = retry + 1,
                max_attempts = attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retrying model call"
            );
            tokio::time::sleep(delay).await;
            retry += 1;
        }
    }
}

/// 75%-125% of `base`.
fn jittered(base: Duration) -> Duration {
    Duration::from_secs_f64(base.as_secs_f64() * (0.75 + rand_factor() * 0.5))
}

/// Pseudo-random factor in [0, 1) derived from the clock and a fresh uuid.
fn rand_factor() -> f64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos() as u128;
    let mixed = uuid::Uuid::new_v4().as_u128() ^ nanos;
    (mixed % 10_000) as f64 / 10_000.0
}
