//! Long-poll waiting and bounded retry
//!
//! Provider operations that complete asynchronously (certificate issuance,
//! distribution propagation, invalidation completion) are awaited with
//! [`wait_until`]: a periodic re-check against a hard ceiling. Operations
//! that may fail transiently are wrapped in [`retry`].

use crate::error::{CloudError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Outcome of a single readiness check.
#[derive(Debug, Clone, PartialEq)]
pub enum PollState<T> {
    /// The resource reached the desired state.
    Ready(T),
    /// Not yet; carries the observed status for logging.
    Pending(String),
}

/// Polling interval and ceiling for one long-poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl WaitPolicy {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

/// Re-run `check` every `policy.interval` until it reports [`PollState::Ready`].
///
/// The first check runs immediately. Errors from `check` abort the wait.
/// Once `policy.timeout` has elapsed without success a
/// [`CloudError::Timeout`] naming `what` is returned.
pub async fn wait_until<T, F, Fut>(what: &str, policy: WaitPolicy, mut check: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollState<T>>>,
{
    let deadline = Instant::now() + policy.timeout;

    loop {
        match check().await? {
            PollState::Ready(value) => return Ok(value),
            PollState::Pending(status) => {
                tracing::info!("🔄 waiting for {}: status is {}", what, status);
            }
        }

        if Instant::now() + policy.interval > deadline {
            return Err(CloudError::Timeout(format!(
                "{} not ready after {} seconds",
                what,
                policy.timeout.as_secs()
            )));
        }
        sleep(policy.interval).await;
    }
}

/// Retry configuration for provider operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,

    /// Delay between attempts
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::ZERO,
        }
    }
}

/// Run `op` up to `config.max_attempts` times, returning the first success
/// or the error of the last attempt.
pub async fn retry<T, F, Fut>(what: &str, config: RetryConfig, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                tracing::warn!(
                    "{} failed (attempt {}/{}): {}",
                    what,
                    attempt,
                    attempts,
                    e
                );
                attempt += 1;
                if !config.delay.is_zero() {
                    sleep(config.delay).await;
                }
            }
            Err(e) => return Err(e),
        }
    }
}
