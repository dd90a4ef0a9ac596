use super::breaker::CircuitBreaker;
use super::types::{CircuitBreakerMetrics, CircuitState};
use crate::config::ResilienceConfig;
use crate::error::{CallError, Result};
use crate::events::{EventSink, TracingSink};
use crate::executor::{
    AttemptResponse, Deadline, RateLimitPolicy, StandardStatusPolicy, StatusAwareExecutor,
    StatusPolicy,
};
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// The outermost layer: per-target circuit breaking around rate-limit-aware,
/// status-aware, retrying execution.
///
/// One service instance is built per process and shared; breaker state for a
/// target is shared by every concurrent caller of that target. The breaker
/// tracks infrastructure health, not business outcomes: a non-retryable
/// error status (say a 404) counts as a success for circuit purposes, while
/// a response that exhausted the retry budget on a retryable status counts
/// as a failure even though it is returned as a value.
#[derive(Clone)]
pub struct ResilienceService {
    executor: Arc<StatusAwareExecutor<RateLimitPolicy>>,
    breakers: Arc<DashMap<String, Arc<CircuitBreaker>>>,
    config: ResilienceConfig,
    events: Arc<dyn EventSink>,
}

impl ResilienceService {
    /// Create a service with the default tracing event sink
    pub fn new(config: ResilienceConfig) -> Self {
        Self::with_events(config, Arc::new(TracingSink))
    }

    /// Create a service with a custom event sink
    pub fn with_events(config: ResilienceConfig, events: Arc<dyn EventSink>) -> Self {
        let policy = RateLimitPolicy::new(StandardStatusPolicy::new(config.status_code_set()));
        let executor = Arc::new(StatusAwareExecutor::with_policy(
            config.retry.clone(),
            policy,
            events.clone(),
        ));
        Self {
            executor,
            breakers: Arc::new(DashMap::new()),
            config,
            events,
        }
    }

    fn get_or_create_breaker(&self, target: &str) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(target.to_string())
            .or_insert_with(|| {
                debug!(target = target, "Creating circuit breaker");
                Arc::new(CircuitBreaker::new(
                    target.to_string(),
                    self.config.circuit_breaker.clone(),
                    self.events.clone(),
                ))
            })
            .clone()
    }

    /// Execute one logical call against `target` through the full stack
    pub async fn execute<F, Fut, R>(&self, target: &str, operation: F) -> Result<R>
    where
        R: AttemptResponse,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        self.execute_with_deadline(target, operation, None).await
    }

    /// Execute one logical call with an overall deadline on the whole retry
    /// sequence
    pub async fn execute_with_deadline<F, Fut, R>(
        &self,
        target: &str,
        operation: F,
        deadline: Option<Duration>,
    ) -> Result<R>
    where
        R: AttemptResponse,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        let breaker = self.get_or_create_breaker(target);
        breaker.try_acquire().await?;

        let deadline = deadline.map(Deadline::after);
        match self
            .executor
            .execute_with_deadline(operation, deadline.as_ref())
            .await
        {
            Ok(response) => {
                // A response that is still retryable after exhaustion is an
                // infrastructure failure, even though it surfaces as a value.
                if self.executor.policy().should_retry(response.status()) {
                    breaker.record_failure().await;
                } else {
                    breaker.record_success().await;
                }
                Ok(response)
            }
            Err(err @ CallError::DeadlineExceeded { .. }) => {
                // The caller ran out of patience; that says nothing about
                // target health.
                Err(err)
            }
            Err(err) => {
                breaker.record_failure().await;
                Err(err)
            }
        }
    }

    /// Circuit state for a target (`Closed` if none exists yet)
    pub async fn state(&self, target: &str) -> CircuitState {
        if let Some(breaker) = self.breakers.get(target) {
            breaker.state().await
        } else {
            CircuitState::Closed
        }
    }

    /// Breaker metrics for a target
    pub async fn metrics(&self, target: &str) -> Option<CircuitBreakerMetrics> {
        if let Some(breaker) = self.breakers.get(target) {
            Some(breaker.metrics().await)
        } else {
            None
        }
    }

    /// All targets with a breaker
    pub fn targets(&self) -> Vec<String> {
        self.breakers.iter().map(|e| e.key().clone()).collect()
    }

    /// Metrics and state for every known target
    pub async fn all_metrics(&self) -> Vec<(String, CircuitBreakerMetrics, CircuitState)> {
        let mut results = Vec::new();
        for entry in self.breakers.iter() {
            let target = entry.key().clone();
            let breaker = entry.value().clone();
            let metrics = breaker.metrics().await;
            let state = breaker.state().await;
            results.push((target, metrics, state));
        }
        results
    }

    /// Force a target's breaker back to closed
    pub async fn reset(&self, target: &str) {
        if let Some(breaker) = self.breakers.get(target) {
            breaker.reset().await;
        }
    }
}
