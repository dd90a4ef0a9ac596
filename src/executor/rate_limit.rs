use super::status::{StandardStatusPolicy, StatusPolicy};
use crate::backoff::BackoffPolicy;
use std::time::Duration;

const TOO_MANY_REQUESTS: u16 = 429;

/// Delay before the first re-attempt of a rate-limited call that carried no
/// wait hint. Rate-limit windows usually clear quickly, so the exponential
/// ramp only kicks in from the second retry on.
const RATE_LIMIT_FIRST_DELAY: Duration = Duration::from_secs(1);

/// Status policy that special-cases rate limiting on top of a standard
/// retryable set.
///
/// A 429 is always retryable, whatever the configured set says. When the
/// responder supplies a wait hint it is honored exactly in place of the
/// computed backoff; the server knows its own window better than we do.
#[derive(Debug, Clone, Default)]
pub struct RateLimitPolicy {
    inner: StandardStatusPolicy,
}

impl RateLimitPolicy {
    pub fn new(inner: StandardStatusPolicy) -> Self {
        Self { inner }
    }
}

impl StatusPolicy for RateLimitPolicy {
    fn should_retry(&self, status: u16) -> bool {
        status == TOO_MANY_REQUESTS || self.inner.should_retry(status)
    }

    fn retry_delay(
        &self,
        attempt: u32,
        status: u16,
        wait_hint_secs: Option<u64>,
        backoff: &BackoffPolicy,
    ) -> Duration {
        if status != TOO_MANY_REQUESTS {
            return self.inner.retry_delay(attempt, status, wait_hint_secs, backoff);
        }

        if let Some(secs) = wait_hint_secs {
            return Duration::from_secs(secs);
        }

        if attempt == 0 {
            return RATE_LIMIT_FIRST_DELAY;
        }

        self.inner.retry_delay(attempt, status, None, backoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backoff() -> BackoffPolicy {
        BackoffPolicy::new(Duration::from_secs(1), Duration::from_secs(60))
    }

    #[test]
    fn test_rate_limited_always_retryable() {
        // Even with an empty retryable set, 429 stays retryable.
        let policy = RateLimitPolicy::new(StandardStatusPolicy::new(Default::default()));
        assert!(policy.should_retry(429));
        assert!(!policy.should_retry(500));

        let policy = RateLimitPolicy::default();
        assert!(policy.should_retry(429));
        assert!(policy.should_retry(503));
        assert!(!policy.should_retry(404));
    }

    #[test]
    fn test_wait_hint_overrides_backoff() {
        let policy = RateLimitPolicy::default();
        let delay = policy.retry_delay(0, 429, Some(5), &backoff());
        assert_eq!(delay, Duration::from_secs(5));

        // Hint wins on later attempts too.
        let delay = policy.retry_delay(3, 429, Some(7), &backoff());
        assert_eq!(delay, Duration::from_secs(7));
    }

    #[test]
    fn test_first_attempt_without_hint_uses_fixed_delay() {
        let policy = RateLimitPolicy::default();
        let delay = policy.retry_delay(0, 429, None, &backoff());
        assert_eq!(delay, Duration::from_secs(1));
    }

    #[test]
    fn test_later_attempts_without_hint_fall_back_to_backoff() {
        let policy = RateLimitPolicy::default();
        let delay = policy.retry_delay(2, 429, None, &backoff());
        // raw = 1s * 2^2, plus at most 10% jitter
        assert!(delay >= Duration::from_secs(4));
        assert!(delay <= Duration::from_millis(4400));
    }

    #[test]
    fn test_other_statuses_delegate_to_inner_policy() {
        let policy = RateLimitPolicy::default();
        let delay = policy.retry_delay(1, 503, Some(30), &backoff());
        // A wait hint on a non-429 response is ignored by the standard policy.
        assert!(delay >= Duration::from_secs(2));
        assert!(delay <= Duration::from_millis(2200));
    }
}
