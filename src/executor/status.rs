use super::{check_deadline, wait_within, Deadline};
use crate::backoff::BackoffPolicy;
use crate::config::RetryConfig;
use crate::error::{CallError, Result};
use crate::events::{CallEvent, EventSink, RetryReason, TracingSink};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// A response as the status-aware layers see it: a status code plus an
/// optional server wait hint in whole seconds.
pub trait AttemptResponse {
    fn status(&self) -> u16;

    /// Server-provided wait hint, when present.
    fn retry_after_secs(&self) -> Option<u64> {
        None
    }
}

/// One layer's retry decisions: whether a status warrants another attempt,
/// and how long to wait before it.
pub trait StatusPolicy: Send + Sync {
    fn should_retry(&self, status: u16) -> bool;

    fn retry_delay(
        &self,
        attempt: u32,
        status: u16,
        wait_hint_secs: Option<u64>,
        backoff: &BackoffPolicy,
    ) -> Duration;
}

/// Retries on a fixed set of status codes using plain exponential backoff.
#[derive(Debug, Clone)]
pub struct StandardStatusPolicy {
    retryable: HashSet<u16>,
}

impl StandardStatusPolicy {
    pub fn new(retryable: HashSet<u16>) -> Self {
        Self { retryable }
    }
}

impl Default for StandardStatusPolicy {
    fn default() -> Self {
        Self::new([408, 429, 500, 502, 503, 504].into_iter().collect())
    }
}

impl StatusPolicy for StandardStatusPolicy {
    fn should_retry(&self, status: u16) -> bool {
        self.retryable.contains(&status)
    }

    fn retry_delay(
        &self,
        attempt: u32,
        _status: u16,
        _wait_hint_secs: Option<u64>,
        backoff: &BackoffPolicy,
    ) -> Duration {
        backoff.delay(attempt)
    }
}

/// Extends the retry loop to responses: a retryable status is treated like a
/// transient outcome and retried after a policy-chosen delay.
///
/// Exhaustion is deliberately asymmetric. A sequence that keeps *raising*
/// transient errors ends in [`CallError::ExhaustedRetries`]; a sequence that
/// keeps *returning* retryable statuses ends by handing back the last
/// response as a value. Callers must therefore check status codes even on an
/// `Ok` result. Non-retryable statuses, including client errors, return
/// immediately and untouched.
pub struct StatusAwareExecutor<P: StatusPolicy = StandardStatusPolicy> {
    config: RetryConfig,
    backoff: BackoffPolicy,
    policy: P,
    events: Arc<dyn EventSink>,
}

impl StatusAwareExecutor<StandardStatusPolicy> {
    /// Create an executor with the default retryable status set
    pub fn new(config: RetryConfig) -> Self {
        Self::with_policy(config, StandardStatusPolicy::default(), Arc::new(TracingSink))
    }
}

impl<P: StatusPolicy> StatusAwareExecutor<P> {
    /// Create an executor with a custom status policy and event sink
    pub fn with_policy(config: RetryConfig, policy: P, events: Arc<dyn EventSink>) -> Self {
        let backoff = BackoffPolicy::new(config.base_delay(), config.max_delay());
        Self {
            config,
            backoff,
            policy,
            events,
        }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Execute an operation, retrying on transient errors and retryable
    /// status codes
    pub async fn execute<F, Fut, R>(&self, operation: F) -> Result<R>
    where
        R: AttemptResponse,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        self.execute_with_deadline(operation, None).await
    }

    /// Execute an operation under an overall deadline
    pub async fn execute_with_deadline<F, Fut, R>(
        &self,
        mut operation: F,
        deadline: Option<&Deadline>,
    ) -> Result<R>
    where
        R: AttemptResponse,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        let mut attempt = 0u32;
        let mut total_wait = Duration::ZERO;

        loop {
            check_deadline(deadline, &self.events)?;
            self.events.emit(&CallEvent::AttemptStarted { attempt });

            match operation().await {
                Ok(response) => {
                    let status = response.status();
                    if !self.policy.should_retry(status) {
                        return Ok(response);
                    }

                    if attempt >= self.config.max_retries {
                        // Status exhaustion hands the caller the final,
                        // still-failing response; only raised errors exhaust
                        // to an error.
                        self.events.emit(&CallEvent::RetriesExhausted {
                            attempts: attempt + 1,
                            total_wait,
                        });
                        return Ok(response);
                    }

                    let delay = self.policy.retry_delay(
                        attempt,
                        status,
                        response.retry_after_secs(),
                        &self.backoff,
                    );
                    self.events.emit(&CallEvent::RetryScheduled {
                        attempt,
                        delay,
                        reason: RetryReason::RetryableStatus(status),
                    });
                    wait_within(delay, deadline, &self.events).await?;
                    total_wait += delay;
                    attempt += 1;
                }
                Err(err) if err.is_transient() => {
                    if attempt >= self.config.max_retries {
                        let attempts = attempt + 1;
                        self.events.emit(&CallEvent::RetriesExhausted {
                            attempts,
                            total_wait,
                        });
                        return Err(CallError::ExhaustedRetries {
                            attempts,
                            total_wait,
                            source: Box::new(err),
                        });
                    }

                    let delay = self.backoff.delay(attempt);
                    self.events.emit(&CallEvent::RetryScheduled {
                        attempt,
                        delay,
                        reason: RetryReason::TransientError(err.to_string()),
                    });
                    wait_within(delay, deadline, &self.events).await?;
                    total_wait += delay;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
