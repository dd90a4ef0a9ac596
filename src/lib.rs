//! Resilient-call layer for outbound HTTP: retries with capped, jittered
//! exponential backoff, rate-limit awareness, and per-target circuit
//! breaking, composed as independent strategy layers around a caller-supplied
//! attempt.
//!
//! One asymmetry is load-bearing and easy to misreproduce: when the retry
//! budget is exhausted by *raised* transient errors the layer returns
//! [`CallError::ExhaustedRetries`], but when it is exhausted by *retryable
//! status codes* the layer returns the last response as a plain value.
//! Callers must check status codes even on `Ok` results.

pub mod backoff;
pub mod circuit_breaker;
pub mod config;
pub mod error;
pub mod events;
pub mod executor;
pub mod http;

pub use backoff::BackoffPolicy;
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerMetrics, CircuitState, ResilienceService};
pub use config::{CircuitBreakerConfig, ResilienceConfig, RetryConfig};
pub use error::{CallError, Result};
pub use events::{CallEvent, EventSink, RetryReason, TracingSink};
pub use executor::{
    AttemptResponse, Deadline, RateLimitPolicy, RetryExecutor, StandardStatusPolicy,
    StatusAwareExecutor, StatusPolicy,
};
pub use http::classify_reqwest_error;

/// Initialize tracing/logging
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "resilience=debug".into()),
        )
        .with_target(false)
        .compact()
        .init();
}
