//! Retry policies and a generic retry loop for non-persistent calls.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed,
    /// `delay × attempt` before the retry following attempt `n`.
    Linear,
}

/// Retry budget for one step or call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Never less than 1.
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff: Backoff,
    /// Overall budget for all attempts and delays together.
    pub timeout: Duration,
}

impl RetryPolicy {
    /// Health-check listing: a few quick tries, then give up.
    pub fn cross_check() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
            backoff: Backoff::Linear,
            timeout: Duration::from_secs(30),
        }
    }

    /// Building the alert: mostly pure, one retry.
    pub fn build() -> Self {
        Self {
            max_attempts: 2,
            delay: Duration::from_secs(1),
            backoff: Backoff::Fixed,
            timeout: Duration::from_secs(60),
        }
    }

    /// Delivering the alert: must get through extended upstream outages.
    pub fn dispatch() -> Self {
        Self {
            max_attempts: 20,
            delay: Duration::from_secs(5),
            backoff: Backoff::Linear,
            timeout: Duration::from_secs(30 * 60),
        }
    }

    /// Delay to wait after `attempt` (1-based) failed.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Linear => self.delay.saturating_mul(attempt.max(1)),
        }
    }

    pub fn attempt_limit(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Why [`retry`] gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    Exhausted { attempts: u32, last: E },
    TimedOut { attempts: u32 },
}

/// Run `op` until it succeeds, the attempt limit is hit, or the policy's
/// timeout elapses. `op` receives the 1-based attempt number.
pub async fn retry<T, E, F, Fut>(label: &str, policy: &RetryPolicy, mut op: F) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let limit = policy.attempt_limit();
    let mut attempts = 0u32;

    let outcome = tokio::time::timeout(policy.timeout, async {
        loop {
            attempts += 1;
            match op(attempts).await {
                Ok(value) => return Ok(value),
                Err(err) if attempts >= limit => return Err(err),
                Err(err) => {
                    let delay = policy.delay_after(attempts);
                    warn!(
                        "{} failed (attempt {}/{}), retrying in {:?}: {}",
                        label, attempts, limit, delay, err
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    })
    .await;

    match outcome {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(last)) => Err(RetryError::Exhausted { attempts, last }),
        Err(_) => Err(RetryError::TimedOut { attempts }),
    }
}
