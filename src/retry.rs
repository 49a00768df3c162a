use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::ServiceError;

/// Delay schedule between attempts. `attempt` is zero-based.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// `base × 2^attempt`, capped at `max`
    Exponential { base: Duration, max: Duration },
    /// `step × (attempt + 1)`
    Linear { step: Duration },
}

impl Backoff {
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Exponential { base, max } => {
                let factor = 2u32.saturating_pow(attempt);
                base.saturating_mul(factor).min(max)
            }
            Backoff::Linear { step } => step.saturating_mul(attempt.saturating_add(1)),
        }
    }
}

/// Every attempt failed; carries the last error.
#[derive(Debug)]
pub struct RetryExhausted {
    pub attempts: u32,
    pub last_error: ServiceError,
}

/// Bounded retry loop around one remote call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
    /// Wait the server-suggested delay on rate-limit errors
    pub honor_retry_after: bool,
}

impl RetryPolicy {
    /// Exponential 1s..30s, honoring server retry hints.
    pub fn translation(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Exponential {
                base: Duration::from_secs(1),
                max: Duration::from_secs(30),
            },
            honor_retry_after: true,
        }
    }

    /// Linear 1s, 2s, 3s...
    pub fn content(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Linear {
                step: Duration::from_secs(1),
            },
            honor_retry_after: false,
        }
    }

    /// How long to wait after `error` on `attempt` before trying again.
    pub fn delay_for(&self, attempt: u32, error: &ServiceError) -> Duration {
        match error.retry_after {
            Some(hint) if self.honor_retry_after && error.is_rate_limited() => hint,
            _ => self.backoff.delay(attempt),
        }
    }

    /// Run `operation` until it succeeds or the attempt budget is spent.
    ///
    /// Rate-limited failures count against the same budget as any other
    /// failure. No wait follows the final attempt.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, RetryExhausted>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            let error = match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            warn!(
                operation = label,
                attempt = attempt + 1,
                max_attempts = attempts,
                kind = ?error.kind,
                error = %error,
                "Remote call failed"
            );

            if attempt + 1 >= attempts {
                return Err(RetryExhausted {
                    attempts,
                    last_error: error,
                });
            }

            let delay = self.delay_for(attempt, &error);
            warn!(operation = label, delay_ms = delay.as_millis() as u64, "Waiting before retry");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
