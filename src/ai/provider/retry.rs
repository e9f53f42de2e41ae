//! Retry wrapper for model clients
//!
//! Exponential backoff with jitter via `backon`. Only failures whose category
//! is retryable (rate limit, network, transient, per-attempt timeout) are
//! attempted again; everything else returns immediately.
//!
//! A `Retry-After` hint raises the wait before the next attempt to at least
//! the hinted duration (capped at `max_delay`). The attempt tops up the
//! difference between the hint and the smallest delay backon will add.

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use super::{ModelClient, ModelResponse};
use crate::config::LlmConfig;
use crate::constants::llm as llm_constants;
use crate::types::{NoteError, Result};

/// Run a future with a deadline, mapping expiry to `NoteError::Timeout`
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(NoteError::Timeout {
            operation: operation_name.to_string(),
            duration: timeout,
        }),
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts per call, first try included
    pub max_attempts: usize,
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// Deadline for one attempt
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&LlmConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            min_delay: Duration::from_millis(config.backoff_base_ms),
            max_delay: Duration::from_secs(config.backoff_max_secs),
            attempt_timeout: Duration::from_secs(
                config.timeout_secs + llm_constants::CONNECTION_TIMEOUT_SECS,
            ),
        }
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay.max(self.min_delay))
            .with_jitter()
            // backon counts retries, not attempts
            .with_max_times(self.max_attempts.saturating_sub(1))
    }

    /// Lower bound of the backoff delay after the given failed attempt (1-based)
    fn min_backoff(&self, attempt: usize) -> Duration {
        let exponent = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.min_delay
            .saturating_mul(2u32.saturating_pow(exponent))
            .min(self.max_delay.max(self.min_delay))
    }
}

/// Model client that retries retryable failures of an inner client
pub struct RetryingClient<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C: ModelClient> RetryingClient<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<C: ModelClient> ModelClient for RetryingClient<C> {
    async fn complete(&self, prompt: &str) -> Result<ModelResponse> {
        let policy = &self.policy;
        let mut attempts = 0usize;
        let attempt = || {
            attempts += 1;
            let current = attempts;
            async move {
                let result = with_timeout(
                    policy.attempt_timeout,
                    self.inner.complete(prompt),
                    "model request",
                )
                .await;

                if let Err(NoteError::Llm(e)) = &result
                    && e.is_retryable()
                    && current < policy.max_attempts
                    && let Some(hint) = e.retry_after
                {
                    let top_up = hint
                        .min(policy.max_delay)
                        .saturating_sub(policy.min_backoff(current));
                    if !top_up.is_zero() {
                        tokio::time::sleep(top_up).await;
                    }
                }
                result
            }
        };

        attempt
            .retry(self.policy.backoff())
            .when(|e: &NoteError| e.is_retryable())
            .notify(|e: &NoteError, delay: Duration| {
                warn!("Model call failed, retrying in {:?}: {}", delay, e);
            })
            .await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ErrorCategory, LlmError};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails with the queued errors, then succeeds
    struct FlakyClient {
        calls: AtomicUsize,
        failures: Mutex<Vec<LlmError>>,
    }

    impl FlakyClient {
        fn new(failures: Vec<ErrorCategory>) -> Self {
            Self::with_errors(
                failures
                    .into_iter()
                    .map(|c| LlmError::new(c, "boom"))
                    .collect(),
            )
        }

        fn with_errors(failures: Vec<LlmError>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failures: Mutex::new(failures),
            }
        }
    }

    #[async_trait]
    impl ModelClient for FlakyClient {
        async fn complete(&self, _prompt: &str) -> Result<ModelResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = {
                let mut failures = self.failures.lock().unwrap();
                (!failures.is_empty()).then(|| failures.remove(0))
            };
            match next {
                Some(error) => Err(error.into()),
                None => Ok(ModelResponse::content_only("ok")),
            }
        }

        fn name(&self) -> &str {
            "flaky"
        }

        fn model(&self) -> &str {
            "test"
        }
    }

    fn fast_policy(max_attempts: usize) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            min_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            attempt_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let client = RetryingClient::new(
            FlakyClient::new(vec![ErrorCategory::Network, ErrorCategory::Transient]),
            fast_policy(3),
        );
        let response = client.complete("p").await.unwrap();
        assert_eq!(response.content, "ok");
        assert_eq!(client.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_after_sets_floor_not_sum() {
        tokio::time::pause();
        let policy = RetryPolicy {
            max_attempts: 2,
            min_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            attempt_timeout: Duration::from_secs(30),
        };
        let hinted = LlmError::new(ErrorCategory::RateLimit, "slow down")
            .retry_after(Duration::from_secs(1));
        let client = RetryingClient::new(FlakyClient::with_errors(vec![hinted]), policy);

        let start = tokio::time::Instant::now();
        client.complete("p").await.unwrap();
        let waited = start.elapsed();

        // top-up of 900ms plus a jittered 100..200ms backoff
        assert!(waited >= Duration::from_secs(1), "waited {:?}", waited);
        assert!(waited < Duration::from_millis(1100), "waited {:?}", waited);
        assert_eq!(client.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_min_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            min_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
            attempt_timeout: Duration::from_secs(1),
        };
        assert_eq!(policy.min_backoff(1), Duration::from_millis(100));
        assert_eq!(policy.min_backoff(2), Duration::from_millis(200));
        assert_eq!(policy.min_backoff(3), Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let client = RetryingClient::new(
            FlakyClient::new(vec![ErrorCategory::RateLimit; 5]),
            fast_policy(2),
        );
        assert!(client.complete("p").await.is_err());
        assert_eq!(client.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let client = RetryingClient::new(
            FlakyClient::new(vec![ErrorCategory::Auth]),
            fast_policy(3),
        );
        let err = client.complete("p").await.unwrap_err();
        assert!(matches!(err, NoteError::Llm(ref e) if e.category == ErrorCategory::Auth));
        assert_eq!(client.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_timeout_expires() {
        let result = with_timeout(
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, NoteError>(42)
            },
            "slow operation",
        )
        .await;
        assert!(matches!(result, Err(NoteError::Timeout { .. })));
    }
}
