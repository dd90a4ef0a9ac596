use std::time::Duration;
use thiserror::Error;

/// Result type for resilient call operations
pub type Result<T> = std::result::Result<T, CallError>;

/// Outcomes of a guarded call attempt or sequence.
///
/// Note the asymmetry with retryable status codes: a response whose status
/// exhausts the retry budget is returned as a *value*, never as one of these
/// variants. Only exception-style failures surface here.
#[derive(Error, Debug)]
pub enum CallError {
    /// A failure likely to clear on retry: connection reset, timeout, or
    /// anything the caller marks as transient.
    #[error("transient failure: {reason}")]
    Transient {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A failure retrying cannot fix; propagated immediately without retry.
    #[error("fatal failure: {reason}")]
    Fatal {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The retry budget for transient failures ran out. Wraps the last
    /// underlying cause and reports how long the sequence spent waiting.
    #[error("retries exhausted after {attempts} attempts ({total_wait:?} spent waiting)")]
    ExhaustedRetries {
        attempts: u32,
        total_wait: Duration,
        #[source]
        source: Box<CallError>,
    },

    /// The breaker for this target is open; the operation was not invoked.
    #[error("circuit open for '{target}', retry in {retry_in:?}")]
    CircuitOpen { target: String, retry_in: Duration },

    /// The caller's deadline elapsed during the retry sequence.
    #[error("deadline exceeded after {elapsed:?}")]
    DeadlineExceeded { elapsed: Duration },

    #[error("configuration error: {0}")]
    Config(String),
}

impl CallError {
    /// Transient failure from a plain reason.
    pub fn transient(reason: impl Into<String>) -> Self {
        CallError::Transient {
            reason: reason.into(),
            source: None,
        }
    }

    /// Transient failure preserving the underlying cause.
    pub fn transient_from(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        CallError::Transient {
            reason: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Fatal failure from a plain reason.
    pub fn fatal(reason: impl Into<String>) -> Self {
        CallError::Fatal {
            reason: reason.into(),
            source: None,
        }
    }

    /// Fatal failure preserving the underlying cause.
    pub fn fatal_from(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        CallError::Fatal {
            reason: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Whether the retry loop may absorb this failure and try again.
    pub fn is_transient(&self) -> bool {
        matches!(self, CallError::Transient { .. })
    }
}
