//! Shared retry policy for flaky backend calls.
//!
//! One abstraction serves both the per-chunk extraction loop and the search
//! call so the two sites cannot drift apart: bounded attempts, delay
//! doubling each attempt, plus up to a second of random jitter so parallel
//! deployments do not hammer a rate-limited backend in lockstep.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::core::config::RetrySettings;
use crate::core::errors::ApiError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay: Duration::from_millis(settings.base_delay_ms),
            jitter: true,
        }
    }

    /// Delay before the retry following attempt `attempt` (zero-based).
    fn delay_for(&self, attempt: usize) -> Duration {
        let doubled = self.base_delay.saturating_mul(1u32 << attempt.min(16) as u32);
        if self.jitter {
            let jitter_ms = rand::rng().random_range(0..1000u64);
            doubled + Duration::from_millis(jitter_ms)
        } else {
            doubled
        }
    }

    /// Runs `op` until it succeeds or `max_attempts` is exhausted, sleeping
    /// between attempts. Returns the last error on exhaustion.
    pub async fn run<T, F, Fut>(&self, op_name: &str, mut op: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut last_err = None;
        for attempt in 0..self.max_attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    tracing::error!("{} failed (attempt {}): {}", op_name, attempt + 1, err);
                    last_err = Some(err);
                    if attempt + 1 < self.max_attempts {
                        let delay = self.delay_for(attempt);
                        tracing::info!("Retrying {} after {:.2?}", op_name, delay);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        tracing::error!("All {} attempts failed for {}", self.max_attempts, op_name);
        Err(last_err
            .unwrap_or_else(|| ApiError::Internal(format!("{op_name} failed with no attempts"))))
    }
}
