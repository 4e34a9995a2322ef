//! Retry engine: bounded exponential backoff for provider calls.
//!
//! Authentication failures and empty replies short-circuit; everything else
//! is retried up to `max_retries` additional attempts, waiting
//! `base_delay_ms * 2^attempt`.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use storytalk_core::ProviderError;

/// Classifies errors for the retry loop.
pub trait Retryable {
    /// `true` when retrying cannot help (bad credentials, missing config,
    /// a billed reply with no text).
    fn is_fatal(&self) -> bool;
}

impl Retryable for ProviderError {
    fn is_fatal(&self) -> bool {
        ProviderError::is_fatal(self)
    }
}

/// Retry policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Additional attempts after the first call.
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
        }
    }

    /// Delay after failed attempt `attempt` (0-indexed).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }

    /// Run `operation` until it succeeds, fails fatally, or retries run out.
    ///
    /// The last error is returned once the policy is exhausted.
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_fatal() => {
                    warn!(error = %e, "Non-retryable provider error");
                    return Err(e);
                }
                Err(e) if attempt >= self.max_retries => {
                    warn!(
                        attempts = attempt + 1,
                        error = %e,
                        "Retry policy exhausted"
                    );
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        attempt = attempt + 1,
                        of = self.max_retries + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "API call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use storytalk_core::LlmResponse;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(3, 1)
    }

    #[test]
    fn exponential_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(1_000));
        assert_eq!(policy.delay_for(1), Duration::from_millis(2_000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(4_000));
    }

    #[test]
    fn huge_attempt_saturates() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(80), Duration::from_millis(u64::MAX));
    }

    #[tokio::test]
    async fn auth_errors_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), ProviderError> = fast_policy()
            .run(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::from_status(401, "invalid x-api-key"))
            })
            .await;
        assert!(matches!(result, Err(ProviderError::Auth { .. })));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_replies_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), ProviderError> = fast_policy()
            .run(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::EmptyResponse {
                    response: Box::new(LlmResponse {
                        content: String::new(),
                        provider: "anthropic".into(),
                        model: "claude-3-5-haiku-20241022".into(),
                        usage: None,
                        latency_ms: 0,
                    }),
                })
            })
            .await;
        assert!(matches!(result, Err(ProviderError::EmptyResponse { .. })));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn generic_errors_exhaust_all_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), ProviderError> = fast_policy()
            .run(move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::Transport(format!("reset #{n}")))
            })
            .await;
        assert_eq!(counter.load(Ordering::SeqCst), 4);
        match result {
            Err(ProviderError::Transport(msg)) => assert_eq!(msg, "reset #3"),
            other => panic!("expected last transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = fast_policy()
            .run(move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ProviderError::from_status(529, "overloaded"))
                } else {
                    Ok("hello")
                }
            })
            .await;
        assert_eq!(result.unwrap(), "hello");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }
}
