//! Retry loop for provider calls.

use std::future::Future;
use std::time::Duration;

use crate::SourceError;

const BASE_DELAY: Duration = Duration::from_millis(250);
const MAX_DELAY: Duration = Duration::from_secs(4);

/// Wait between two attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    /// `base * 2^attempt`, capped at `max`; `jitter` spreads each wait over 50%..150%.
    Doubling {
        base: Duration,
        max: Duration,
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Doubling {
            base: BASE_DELAY,
            max: MAX_DELAY,
            jitter: true,
        }
    }
}

impl Backoff {
    /// Wait before retry `attempt`, counting from zero.
    pub fn delay(self, attempt: u32) -> Duration {
        let (base, max, jitter) = match self {
            Self::Fixed(delay) => return delay,
            Self::Doubling { base, max, jitter } => (base, max, jitter),
        };

        let factor = 1_u32.checked_shl(attempt).unwrap_or(u32::MAX);
        let nominal = base.saturating_mul(factor).min(max);
        if !jitter {
            return nominal;
        }
        nominal.mul_f64(fastrand::f64() + 0.5)
    }
}

/// How many times a failed call is repeated, and how long to wait in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Extra attempts after the first; zero disables retrying.
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::exponential(2)
    }
}

impl RetryConfig {
    pub fn exponential(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::default(),
        }
    }

    pub fn fixed(delay: Duration, max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Fixed(delay),
        }
    }

    pub fn no_retry() -> Self {
        Self::exponential(0)
    }

    pub fn is_enabled(&self) -> bool {
        self.max_retries > 0
    }

    /// Rate limits and network faults are retried while the budget lasts.
    pub fn should_retry(&self, error: &SourceError, attempt: u32) -> bool {
        attempt < self.max_retries && error.retryable()
    }

    /// Calls `operation` until it succeeds or [`should_retry`](Self::should_retry)
    /// gives up, returning the last error in that case.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let mut attempt = 0;
        loop {
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };
            if !self.should_retry(&error, attempt) {
                return Err(error);
            }

            let delay = self.backoff.delay(attempt);
            tracing::debug!(
                operation = label,
                attempt = attempt + 1,
                code = error.code(),
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "retrying provider call"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn doubling(jitter: bool) -> Backoff {
        Backoff::Doubling {
            base: Duration::from_millis(100),
            max: Duration::from_secs(1),
            jitter,
        }
    }

    #[test]
    fn doubling_backoff_is_capped() {
        let delays = (0..6)
            .map(|attempt| doubling(false).delay(attempt).as_millis())
            .collect::<Vec<_>>();
        assert_eq!(delays, vec![100, 200, 400, 800, 1_000, 1_000]);
        assert_eq!(doubling(false).delay(60), Duration::from_secs(1));
        assert_eq!(
            Backoff::Fixed(Duration::from_millis(5)).delay(9),
            Duration::from_millis(5)
        );
    }

    #[test]
    fn jitter_stays_within_half_band() {
        for attempt in 0..5 {
            let nominal = doubling(false).delay(attempt).as_secs_f64();
            for _ in 0..20 {
                let jittered = doubling(true).delay(attempt).as_secs_f64();
                assert!(jittered >= nominal * 0.5 && jittered <= nominal * 1.5);
            }
        }
    }

    #[test]
    fn retry_budget_and_error_kind_decide() {
        let config = RetryConfig::exponential(2);
        assert!(config.should_retry(&SourceError::network("reset"), 0));
        assert!(config.should_retry(&SourceError::rate_limited("429"), 1));
        assert!(!config.should_retry(&SourceError::rate_limited("429"), 2));
        assert!(!config.should_retry(&SourceError::invalid_symbol("nope"), 0));

        let disabled = RetryConfig::no_retry();
        assert!(!disabled.is_enabled());
        assert!(!disabled.should_retry(&SourceError::network("reset"), 0));
    }

    #[tokio::test]
    async fn flaky_call_succeeds_on_third_attempt() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::fixed(Duration::from_millis(1), 3);

        let result = config
            .run("quote", || {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    match call {
                        0 | 1 => Err(SourceError::network("flaky")),
                        _ => Ok(call),
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn invalid_symbol_is_not_retried() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::fixed(Duration::from_millis(1), 3);

        let result: Result<(), SourceError> = config
            .run("quote", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(SourceError::invalid_symbol("ZZZZ")) }
            })
            .await;

        assert_eq!(result.map_err(|e| e.code()), Err("INVALID_SYMBOL"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_budget_returns_last_error() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::fixed(Duration::from_millis(1), 2);

        let result: Result<(), SourceError> = config
            .run("history", || {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(SourceError::rate_limited(format!("attempt {call}"))) }
            })
            .await;

        assert_eq!(result.expect_err("exhausted").message(), "attempt 2");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
