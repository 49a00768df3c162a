use std::time::Duration;
use tokio::time::Instant;

/// Continuous-refill token bucket. Time comes from tokio's clock so paused
/// test runtimes can drive it.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: u32,
    tokens: f64,
    refill_rate: f64, // tokens per second
    last_refill: Instant,
}

impl TokenBucket {
    /// A bucket that starts full.
    pub fn new(capacity: u32, refill_rate: f64) -> Self {
        Self {
            capacity,
            tokens: capacity as f64,
            refill_rate,
            last_refill: Instant::now(),
        }
    }

    /// Take one token if a whole one is available.
    pub fn try_consume(&mut self) -> bool {
        self.refill();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    pub fn available_tokens(&mut self) -> f64 {
        self.refill();
        self.tokens
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill);

        let tokens_to_add = self.refill_rate * elapsed.as_secs_f64();
        self.tokens = (self.tokens + tokens_to_add).min(self.capacity as f64);
        self.last_refill = now;
    }

    /// How long until one whole token exists, or `None` if one already does.
    pub fn time_until_available(&mut self) -> Option<Duration> {
        self.refill();

        if self.tokens >= 1.0 {
            return None;
        }

        let seconds_to_wait = (1.0 - self.tokens) / self.refill_rate;
        Some(Duration::from_secs_f64(seconds_to_wait))
    }
}
