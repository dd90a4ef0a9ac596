use super::{check_deadline, wait_within, Deadline};
use crate::backoff::BackoffPolicy;
use crate::config::RetryConfig;
use crate::error::{CallError, Result};
use crate::events::{CallEvent, EventSink, RetryReason, TracingSink};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Retries transient failures with exponential backoff.
///
/// An operation is invoked up to `max_retries + 1` times. Transient errors
/// are absorbed and retried after a backoff wait; anything else propagates
/// immediately. When the budget runs out the last transient error is wrapped
/// in [`CallError::ExhaustedRetries`] with its cause preserved.
pub struct RetryExecutor {
    config: RetryConfig,
    backoff: BackoffPolicy,
    events: Arc<dyn EventSink>,
}

impl RetryExecutor {
    /// Create a new retry executor
    pub fn new(config: RetryConfig) -> Self {
        Self::with_events(config, Arc::new(TracingSink))
    }

    /// Create a retry executor with a custom event sink
    pub fn with_events(config: RetryConfig, events: Arc<dyn EventSink>) -> Self {
        let backoff = BackoffPolicy::new(config.base_delay(), config.max_delay());
        Self {
            config,
            backoff,
            events,
        }
    }

    /// Execute an operation with retries
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.execute_with_deadline(operation, None).await
    }

    /// Execute an operation with retries under an overall deadline
    pub async fn execute_with_deadline<F, Fut, T>(
        &self,
        mut operation: F,
        deadline: Option<&Deadline>,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        let mut total_wait = Duration::ZERO;

        loop {
            check_deadline(deadline, &self.events)?;
            self.events.emit(&CallEvent::AttemptStarted { attempt });

            match operation().await {
                Ok(value) => return Ok(value),
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
