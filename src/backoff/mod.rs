use rand::Rng;
use std::time::Duration;

/// Exponential backoff with a cap and uniform jitter.
///
/// `delay(attempt)` grows as `base * 2^attempt` up to `max`, then a random
/// jitter in `[0, 0.1 * raw)` is added so that many callers retrying the same
/// target do not wake in lockstep. Pure apart from the jitter draw.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    base_delay: Duration,
    max_delay: Duration,
}

impl BackoffPolicy {
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
        }
    }

    /// Delay before the attempt following `attempt` (zero-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u128.saturating_pow(attempt);
        let raw_ms = self
            .base_delay
            .as_millis()
            .saturating_mul(factor)
            .min(self.max_delay.as_millis()) as u64;
        let jitter_ms = (rand::thread_rng().gen_range(0.0..0.1) * raw_ms as f64) as u64;
        Duration::from_millis(raw_ms + jitter_ms)
    }
}
