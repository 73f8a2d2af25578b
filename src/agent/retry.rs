//! Retry policy and call deadlines for external collaborators.
//!
//! A [`RetryPolicy`] is a plain value: attempts plus a backoff curve. Each
//! collaborator adapter owns one and runs its calls through
//! [`RetryPolicy::run`], so the policy can be tested without any provider
//! or orchestrator in the picture.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::config::SearchConfig;
use crate::error::AgentError;

/// Default multiplier between consecutive backoff delays.
const DEFAULT_MULTIPLIER: f64 = 2.0;
/// Default upper bound for a single backoff delay.
const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);

/// How many times to try an external call and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included. Never less than 1.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_backoff: Duration,
    /// Growth factor applied per further attempt.
    pub multiplier: f64,
    /// Upper bound for any single delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            multiplier: DEFAULT_MULTIPLIER,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Creates an exponential policy.
    #[must_use]
    pub const fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts: if max_attempts == 0 { 1 } else { max_attempts },
            initial_backoff,
            multiplier: DEFAULT_MULTIPLIER,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }

    /// A policy that never retries.
    #[must_use]
    pub const fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Builds the policy described by `max_retries` and `initial_backoff`.
    #[must_use]
    pub const fn from_config(config: &SearchConfig) -> Self {
        Self::new(config.max_retries, config.initial_backoff)
    }

    /// Delay to wait after failed attempt number `attempt` (0-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let scaled = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = scaled.min(self.max_backoff.as_secs_f64());
        if capped.is_finite() && capped > 0.0 {
            Duration::from_secs_f64(capped)
        } else {
            Duration::ZERO
        }
    }

    /// Runs `call` until it succeeds, fails permanently, or attempts run out.
    ///
    /// Only [`AgentError::is_retryable`] errors are retried; the last error
    /// is returned when every attempt failed.
    ///
    /// # Errors
    ///
    /// Returns the error of the final attempt.
    pub async fn run<F, Fut, T>(&self, operation: &str, mut call: F) -> Result<T, AgentError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AgentError>>,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() || attempt + 1 >= self.max_attempts => return Err(e),
                Err(e) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        operation,
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        backoff_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "retrying after transient error"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}

/// Runs `call` with a deadline.
///
/// An elapsed deadline becomes [`AgentError::Timeout`], which callers treat
/// exactly like a provider failure.
///
/// # Errors
///
/// Returns the call's own error, or [`AgentError::Timeout`].
pub async fn with_timeout<Fut, T>(limit: Duration, call: Fut) -> Result<T, AgentError>
where
    Fut: Future<Output = Result<T, AgentError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| AgentError::Timeout { timeout: limit })?
}
