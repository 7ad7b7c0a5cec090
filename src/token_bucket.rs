use std::time::{Duration, Instant};

/// Classic token bucket. Time is passed in by the caller so the owning
/// limiter can drive it from an injected clock.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: u32,
    tokens: f64,
    refill_rate: f64, // tokens per second
    last_refill: Instant,
}

impl TokenBucket {
    /// Creates a full bucket.
    pub fn new(capacity: u32, refill_rate: f64, now: Instant) -> Self {
        Self {
            capacity,
            tokens: capacity as f64,
            refill_rate,
            last_refill: now,
        }
    }

    /// Takes one token if available.
    pub fn allow(&mut self, now: Instant) -> bool {
        self.consume(1, now)
    }

    pub fn consume(&mut self, tokens: u32, now: Instant) -> bool {
        self.refill(now);

        if self.tokens >= tokens as f64 {
            self.tokens -= tokens as f64;
            true
        } else {
            false
        }
    }

    pub fn available_tokens(&mut self, now: Instant) -> u32 {
        self.refill(now);
        self.tokens.floor() as u32
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    fn refill(&mut self, now: Instant) {
        // A clock that went backwards adds nothing.
        let elapsed = now.saturating_duration_since(self.last_refill);
        if elapsed.is_zero() {
            return;
        }

        let tokens_to_add = self.refill_rate * elapsed.as_secs_f64();
        self.tokens = (self.tokens + tokens_to_add).min(self.capacity as f64);
        self.last_refill = now;
    }

    pub fn time_until_available(&mut self, required_tokens: u32, now: Instant) -> Option<Duration> {
        self.refill(now);

        if self.tokens >= required_tokens as f64 {
            return None;
        }
        if self.refill_rate <= 0.0 {
            return Some(Duration::MAX);
        }

        let tokens_needed = required_tokens as f64 - self.tokens;
        Some(Duration::from_secs_f64(tokens_needed / self.refill_rate))
    }
}
