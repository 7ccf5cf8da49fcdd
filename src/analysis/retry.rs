//! Exponential backoff around fallible async calls.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Result;

/// How often, and how patiently, to retry a failing call.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first try.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Cap on any single delay.
    pub max_delay: Duration,
    /// Each retry waits `initial_delay * backoff_multiplier^(attempt-1)`.
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    /// No retries.
    pub const NONE: Self = Self {
        max_attempts: 1,
        initial_delay: Duration::from_secs(0),
        max_delay: Duration::from_secs(0),
        backoff_multiplier: 1.0,
    };

    /// Three attempts: immediate → 1s → 2s.
    pub const STANDARD: Self = Self {
        max_attempts: 3,
        initial_delay: Duration::from_secs(1),
        max_delay: Duration::from_secs(30),
        backoff_multiplier: 2.0,
    };

    /// Delay to wait after failed attempt `attempt` (1-indexed), or None
    /// once attempts are exhausted.
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let multiplier = self.backoff_multiplier.powf(attempt.saturating_sub(1) as f64);
        let secs = self.initial_delay.as_secs_f64() * multiplier;
        // NaN and negative products (bad multipliers) fall back to the cap / zero.
        let capped = secs.clamp(0.0, self.max_delay.as_secs_f64());
        Some(Duration::try_from_secs_f64(capped).unwrap_or(self.max_delay))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy runs out of attempts. `op` receives the 1-indexed attempt number.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        let error = match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if !error.is_retryable() {
            tracing::debug!(attempt, %error, "non-retryable failure");
            return Err(error);
        }
        let Some(delay) = policy.delay_for_attempt(attempt) else {
            tracing::warn!(attempt, max_attempts = policy.max_attempts, %error, "retries exhausted");
            return Err(error);
        };

        tracing::warn!(
            attempt,
            max_attempts = policy.max_attempts,
            ?delay,
            %error,
            "retryable failure, backing off"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn standard_schedule() {
        let p = RetryPolicy::STANDARD;
        assert_eq!(p.delay_for_attempt(1), Some(Duration::from_secs(1)));
        assert_eq!(p.delay_for_attempt(2), Some(Duration::from_secs(2)));
        assert_eq!(p.delay_for_attempt(3), None);
    }

    #[test]
    fn delay_is_capped() {
        let p = RetryPolicy {
            max_attempts: 10,
            initial_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(15),
            backoff_multiplier: 3.0,
        };
        assert_eq!(p.delay_for_attempt(4), Some(Duration::from_secs(15)));
    }

    #[test]
    fn nonsense_multiplier_never_panics() {
        let negative = RetryPolicy { backoff_multiplier: -2.0, ..RetryPolicy::STANDARD };
        assert_eq!(negative.delay_for_attempt(2), Some(Duration::ZERO));
        assert_eq!(negative.delay_for_attempt(1), Some(Duration::from_secs(1)));

        let nan = RetryPolicy { backoff_multiplier: f64::NAN, ..RetryPolicy::STANDARD };
        assert_eq!(nan.delay_for_attempt(2), Some(RetryPolicy::STANDARD.max_delay));
    }

    #[test]
    fn none_never_retries() {
        assert_eq!(RetryPolicy::NONE.delay_for_attempt(1), None);
    }

    #[tokio::test]
    async fn non_retryable_error_stops_immediately() {
        let mut calls = 0;
        let result: Result<()> = retry(&RetryPolicy::STANDARD, |_| {
            calls += 1;
            async { Err(Error::NotFound("Document 1".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_error_is_retried() {
        let mut calls = 0;
        let result = retry(&RetryPolicy::STANDARD, |attempt| {
            calls += 1;
            async move {
                if attempt < 3 {
                    Err(Error::Generation("503 Service Unavailable".into()))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls, 3);
    }
}
