use std::time::Duration;
use tracing::{debug, info, warn};

/// Why a retry was scheduled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    /// The operation raised a transient failure.
    TransientError(String),
    /// The response carried a retryable status code.
    RetryableStatus(u16),
}

/// A single retry or breaker decision, emitted as it happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    AttemptStarted {
        attempt: u32,
    },
    RetryScheduled {
        attempt: u32,
        delay: Duration,
        reason: RetryReason,
    },
    RetriesExhausted {
        attempts: u32,
        total_wait: Duration,
    },
    CircuitOpened {
        target: String,
        failures: u32,
    },
    CircuitHalfOpened {
        target: String,
    },
    CircuitClosed {
        target: String,
    },
    CallRejected {
        target: String,
        retry_in: Duration,
    },
    DeadlineExceeded {
        elapsed: Duration,
    },
}

/// Sink for retry and breaker decisions.
///
/// Passed through configuration rather than read from a process-wide logger,
/// so callers can substitute a recording sink and assert on decisions
/// deterministically.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &CallEvent);
}

/// Default sink: forwards every decision to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &CallEvent) {
        match event {
            CallEvent::AttemptStarted { attempt } => {
                debug!(attempt, "Executing call attempt");
            }
            CallEvent::RetryScheduled {
                attempt,
                delay,
                reason,
            } => {
                debug!(
                    attempt,
                    wait_ms = delay.as_millis() as u64,
                    reason = ?reason,
                    "Attempt failed, retrying after backoff"
                );
            }
            CallEvent::RetriesExhausted {
                attempts,
                total_wait,
            } => {
                warn!(
                    attempts,
                    total_wait_ms = total_wait.as_millis() as u64,
                    "Call failed after max retries"
                );
            }
            CallEvent::CircuitOpened { target, failures } => {
                warn!(
                    target = %target,
                    consecutive_failures = failures,
                    "Circuit breaker opening"
                );
            }
            CallEvent::CircuitHalfOpened { target } => {
                info!(target = %target, "Circuit breaker transitioning to half-open");
            }
            CallEvent::CircuitClosed { target } => {
                info!(target = %target, "Circuit breaker closing");
            }
            CallEvent::CallRejected { target, retry_in } => {
                debug!(
                    target = %target,
                    retry_in_ms = retry_in.as_millis() as u64,
                    "Circuit breaker open, rejecting call"
                );
            }
            CallEvent::DeadlineExceeded { elapsed } => {
                warn!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Deadline exceeded, aborting retry sequence"
                );
            }
        }
    }
}
