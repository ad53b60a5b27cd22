//! Retry with exponential backoff and jitter.
//!
//! Only used to *open* an upstream call. Once the first delta has been
//! observed the stream is never replayed, so content already forwarded to the
//! client is never duplicated.

use std::future::Future;
use std::time::Duration;

use crate::error::ToolturnError;

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Execute an async operation with retry.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, ToolturnError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ToolturnError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut backoff = self.initial_backoff;

        for attempt in 1..=attempts {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if !err.is_retryable() || attempt == attempts {
                return Err(err);
            }

            let sleep_for = match &err {
                ToolturnError::RateLimited {
                    retry_after_ms: Some(ms),
                } => Duration::from_millis(*ms).min(self.max_backoff),
                _ => backoff.mul_f64(0.75 + jitter_factor() * 0.5),
            };

            tracing::warn!(
                attempt,
                max_attempts = attempts,
                error = %err,
                sleep_ms = sleep_for.as_millis() as u64,
                "retrying upstream call"
            );
            tokio::time::sleep(sleep_for).await;

            backoff = Duration::from_secs_f64(
                (backoff.as_secs_f64() * self.multiplier).min(self.max_backoff.as_secs_f64()),
            );
        }

        Err(ToolturnError::InvalidState(
            "retry loop exited without a result".to_string(),
        ))
    }
}

/// Pseudo-random factor in [0, 1) derived from a fresh v4 uuid.
fn jitter_factor() -> f64 {
    let bits = uuid::Uuid::new_v4().as_u128() as u64;
    (bits % 10_000) as f64 / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn retries_retryable_errors_until_success() {
        let calls = AtomicU32::new(0);
        let value = fast_policy(3)
            .execute(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(ToolturnError::api(503, "unavailable"))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn does_not_retry_client_errors() {
        let calls = AtomicU32::new(0);
        let err = fast_policy(3)
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(ToolturnError::api(400, "bad request")) }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ToolturnError::Api { status: 400, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let err = fast_policy(2)
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err::<(), _>(ToolturnError::RateLimited {
                        retry_after_ms: Some(1),
                    })
                }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ToolturnError::RateLimited { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
