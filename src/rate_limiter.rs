use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::ThrottleSettings;
use crate::error::{Error, Result};
use crate::token_bucket::TokenBucket;

/// Async gate in front of outbound translation calls.
///
/// `acquire` never fails: it waits for the bucket to refill. Waiters queue on
/// the mutex, so tokens are handed out in arrival order.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    bucket: Arc<Mutex<TokenBucket>>,
}

impl RateLimiter {
    pub fn new(capacity: u32, refill_per_second: f64) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::Config("rate limiter capacity must be at least 1".to_string()));
        }
        if refill_per_second.is_nan() || refill_per_second <= 0.0 {
            return Err(Error::Config("rate limiter refill rate must be positive".to_string()));
        }

        Ok(Self {
            bucket: Arc::new(Mutex::new(TokenBucket::new(capacity, refill_per_second))),
        })
    }

    pub fn from_settings(settings: &ThrottleSettings) -> Result<Self> {
        Self::new(settings.capacity, settings.refill_per_second())
    }

    /// Wait for a token and debit it. Returns how long the caller waited.
    pub async fn acquire(&self) -> Duration {
        let mut bucket = self.bucket.lock().await;
        let mut waited = Duration::ZERO;

        while let Some(wait) = bucket.time_until_available() {
            debug!(wait_ms = wait.as_millis() as u64, "Rate limiter out of tokens, waiting");
            tokio::time::sleep(wait).await;
            waited += wait;
        }

        bucket.try_consume();
        waited
    }

    pub async fn available_tokens(&self) -> f64 {
        self.bucket.lock().await.available_tokens()
    }
}
