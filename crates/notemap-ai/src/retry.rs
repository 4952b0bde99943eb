//! Retry with exponential backoff for oracle calls

use super::bridge::{AnalysisOracle, AnalysisRequest, AnalysisResult, OracleError};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Retry configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Maximum delay between attempts.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay after the given (1-based) failed attempt, within `[0, max_delay]`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let delay = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let max = self.max_delay.as_secs_f64();
        if delay.is_nan() {
            return self.max_delay;
        }
        Duration::from_secs_f64(delay.clamp(0.0, max))
    }

    /// Run `f` until it succeeds, fails with a non-retryable error, or the
    /// attempts are used up. The last error is returned.
    pub async fn execute<F, Fut, T>(&self, mut f: F) -> Result<T, OracleError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, OracleError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match f().await {
                Ok(result) => return Ok(result),
                Err(e) if !e.is_retryable() || attempt >= max_attempts => return Err(e),
                Err(e) => {
                    let delay = self.delay_for_attempt(attempt);
                    tracing::debug!(
                        attempt = attempt,
                        max_attempts = max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying oracle call after failure: {}",
                        e
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// One oracle call under a per-attempt timeout, retried per `policy`.
pub async fn analyze_with_retry(
    oracle: &dyn AnalysisOracle,
    request: &AnalysisRequest,
    timeout: Duration,
    policy: &RetryPolicy,
) -> Result<AnalysisResult, OracleError> {
    policy
        .execute(move || async move {
            match tokio::time::timeout(timeout, oracle.analyze(request)).await {
                Ok(result) => result,
                Err(_) => Err(OracleError::Timeout(timeout)),
            }
        })
        .await
}
