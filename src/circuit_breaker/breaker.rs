use super::types::{CircuitBreakerMetrics, CircuitState};
use crate::config::CircuitBreakerConfig;
use crate::error::{CallError, Result};
use crate::events::{CallEvent, EventSink};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Circuit breaker for a single logical target.
///
/// State is shared by every concurrent caller of that target; all reads and
/// writes happen under one lock so racing callers cannot apply a transition
/// twice. The `Open -> HalfOpen` transition is evaluated lazily by whichever
/// caller arrives first after the cooldown, inside the same write guard.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: Arc<RwLock<State>>,
    target: String,
    events: Arc<dyn EventSink>,
}

#[derive(Debug)]
struct State {
    circuit_state: CircuitState,
    /// Consecutive failures while closed
    failure_count: u32,
    /// Consecutive successes while half-open
    success_count: u32,
    /// When the circuit last opened
    opened_at: Option<Instant>,
    metrics: CircuitBreakerMetrics,
}

impl CircuitBreaker {
    /// Create a new circuit breaker for a target
    pub fn new(target: String, config: CircuitBreakerConfig, events: Arc<dyn EventSink>) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(State {
                circuit_state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                opened_at: None,
                metrics: CircuitBreakerMetrics::default(),
            })),
            target,
            events,
        }
    }

    /// Gate one call. `Err(CircuitOpen)` means the operation must not run.
    pub async fn try_acquire(&self) -> Result<()> {
        let mut state = self.state.write().await;

        match state.circuit_state {
            CircuitState::Closed | CircuitState::HalfOpen => {
                state.metrics.total_calls += 1;
                Ok(())
            }
            CircuitState::Open => {
                let opened_at = match state.opened_at {
                    Some(t) => t,
                    None => {
                        // Open without a timestamp should not happen; reject
                        // for a full cooldown and restamp.
                        warn!(target = %self.target, "Circuit open without opened_at timestamp");
                        state.opened_at = Some(Instant::now());
                        state.metrics.rejected_calls += 1;
                        return Err(CallError::CircuitOpen {
                            target: self.target.clone(),
                            retry_in: self.config.cooldown(),
                        });
                    }
                };

                if opened_at.elapsed() >= self.config.cooldown() {
                    self.transition_to_half_open(&mut state);
                    state.metrics.total_calls += 1;
                    Ok(())
                } else {
                    let retry_in = self.config.cooldown() - opened_at.elapsed();
                    state.metrics.rejected_calls += 1;
                    self.events.emit(&CallEvent::CallRejected {
                        target: self.target.clone(),
                        retry_in,
                    });
                    Err(CallError::CircuitOpen {
                        target: self.target.clone(),
                        retry_in,
                    })
                }
            }
        }
    }

    /// Record a call the breaker counts as healthy
    pub async fn record_success(&self) {
        let mut state = self.state.write().await;
        state.metrics.successful_calls += 1;

        match state.circuit_state {
            CircuitState::Closed => {
                state.failure_count = 0;
            }
            CircuitState::HalfOpen => {
                state.success_count += 1;
                debug!(
                    target = %self.target,
                    success_count = state.success_count,
                    threshold = self.config.success_threshold,
                    "Half-open probe succeeded"
                );
                if state.success_count >= self.config.success_threshold {
                    self.transition_to_closed(&mut state);
                }
            }
            CircuitState::Open => {
                // A call acquired in half-open can resolve after another
                // probe already reopened the circuit.
                debug!(target = %self.target, "Success recorded while circuit open");
            }
        }
    }

    /// Record a call the breaker counts as an infrastructure failure
    pub async fn record_failure(&self) {
        let mut state = self.state.write().await;
        state.metrics.failed_calls += 1;

        match state.circuit_state {
            CircuitState::Closed => {
                state.failure_count += 1;
                debug!(
                    target = %self.target,
                    failure_count = state.failure_count,
                    threshold = self.config.failure_threshold,
                    "Call failed in closed state"
                );
                if state.failure_count >= self.config.failure_threshold {
                    self.transition_to_open(&mut state);
                }
            }
            CircuitState::HalfOpen => {
                warn!(target = %self.target, "Half-open probe failed, reopening circuit");
                self.transition_to_open(&mut state);
            }
            CircuitState::Open => {
                // Late failure from a call admitted before the circuit
                // opened; refresh the cooldown window.
                state.opened_at = Some(Instant::now());
            }
        }
    }

    /// Get current state
    pub async fn state(&self) -> CircuitState {
        self.state.read().await.circuit_state
    }

    /// Get metrics
    pub async fn metrics(&self) -> CircuitBreakerMetrics {
        self.state.read().await.metrics.clone()
    }

    /// Force the breaker back to closed with cleared counters
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        state.circuit_state = CircuitState::Closed;
        state.failure_count = 0;
        state.success_count = 0;
        state.opened_at = None;
    }

    fn transition_to_open(&self, state: &mut State) {
        self.events.emit(&CallEvent::CircuitOpened {
            target: self.target.clone(),
            failures: state.failure_count,
        });
        state.circuit_state = CircuitState::Open;
        state.opened_at = Some(Instant::now());
        state.failure_count = 0;
        state.success_count = 0;
        state.metrics.circuit_opened_count += 1;
    }

    fn transition_to_half_open(&self, state: &mut State) {
        self.events.emit(&CallEvent::CircuitHalfOpened {
            target: self.target.clone(),
        });
        state.circuit_state = CircuitState::HalfOpen;
        state.failure_count = 0;
        state.success_count = 0;
        state.metrics.circuit_half_opened_count += 1;
    }

    fn transition_to_closed(&self, state: &mut State) {
        self.events.emit(&CallEvent::CircuitClosed {
            target: self.target.clone(),
        });
        state.circuit_state = CircuitState::Closed;
        state.opened_at = None;
        state.failure_count = 0;
        state.success_count = 0;
        state.metrics.circuit_closed_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TracingSink;
    use std::time::Duration;

    fn breaker(config: CircuitBreakerConfig) -> CircuitBreaker {
        CircuitBreaker::new("test-target".to_string(), config, Arc::new(TracingSink))
    }

    #[tokio::test]
    async fn test_breaker_starts_closed() {
        let cb = breaker(CircuitBreakerConfig::default());
        assert_eq!(cb.state().await, CircuitState::Closed);
        assert!(cb.try_acquire().await.is_ok());
    }

    #[tokio::test]
    async fn test_opens_after_threshold_failures() {
        let cb = breaker(CircuitBreakerConfig {
            failure_threshold: 5,
            ..Default::default()
        });

        for _ in 0..5 {
            assert!(cb.try_acquire().await.is_ok());
            cb.record_failure().await;
        }

        assert_eq!(cb.state().await, CircuitState::Open);
        let err = cb.try_acquire().await.unwrap_err();
        match err {
            CallError::CircuitOpen { target, retry_in } => {
                assert_eq!(target, "test-target");
                assert!(retry_in <= Duration::from_secs(60));
            }
            other => panic!("expected CircuitOpen, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_success_resets_failure_count() {
        let cb = breaker(CircuitBreakerConfig {
            failure_threshold: 3,
            ..Default::default()
        });

        for _ in 0..2 {
            assert!(cb.try_acquire().await.is_ok());
            cb.record_failure().await;
        }

        assert!(cb.try_acquire().await.is_ok());
        cb.record_success().await;
        assert_eq!(cb.state().await, CircuitState::Closed);

        // A fresh run of failures is needed to open.
        for _ in 0..3 {
            assert!(cb.try_acquire().await.is_ok());
            cb.record_failure().await;
        }
        assert_eq!(cb.state().await, CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_transitions_to_half_open_lazily() {
        let cb = breaker(CircuitBreakerConfig {
            failure_threshold: 1,
            cooldown_secs: 60,
            ..Default::default()
        });

        assert!(cb.try_acquire().await.is_ok());
        cb.record_failure().await;
        assert_eq!(cb.state().await, CircuitState::Open);

        // Within cooldown: still rejected, state untouched.
        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(cb.try_acquire().await.is_err());
        assert_eq!(cb.state().await, CircuitState::Open);

        // Past cooldown: the next caller performs the transition.
        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(cb.try_acquire().await.is_ok());
        assert_eq!(cb.state().await, CircuitState::HalfOpen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_closes_after_success_requirement() {
        let cb = breaker(CircuitBreakerConfig {
            failure_threshold: 1,
            success_threshold: 3,
            cooldown_secs: 1,
        });

        assert!(cb.try_acquire().await.is_ok());
        cb.record_failure().await;
        tokio::time::advance(Duration::from_secs(2)).await;

        for i in 0..3 {
            assert!(cb.try_acquire().await.is_ok());
            cb.record_success().await;
            if i < 2 {
                assert_eq!(cb.state().await, CircuitState::HalfOpen);
            }
        }

        assert_eq!(cb.state().await, CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_failure_reopens_immediately() {
        let cb = breaker(CircuitBreakerConfig {
            failure_threshold: 1,
            cooldown_secs: 1,
            ..Default::default()
        });

        assert!(cb.try_acquire().await.is_ok());
        cb.record_failure().await;
        tokio::time::advance(Duration::from_secs(2)).await;

        assert!(cb.try_acquire().await.is_ok());
        assert_eq!(cb.state().await, CircuitState::HalfOpen);
        cb.record_success().await;

        // One failure wipes the probe progress.
        assert!(cb.try_acquire().await.is_ok());
        cb.record_failure().await;
        assert_eq!(cb.state().await, CircuitState::Open);
        assert!(cb.try_acquire().await.is_err());
    }

    #[tokio::test]
    async fn test_reset_returns_to_closed() {
        let cb = breaker(CircuitBreakerConfig {
            failure_threshold: 1,
            ..Default::default()
        });

        assert!(cb.try_acquire().await.is_ok());
        cb.record_failure().await;
        assert_eq!(cb.state().await, CircuitState::Open);

        cb.reset().await;
        assert_eq!(cb.state().await, CircuitState::Closed);
        assert!(cb.try_acquire().await.is_ok());
    }

    #[tokio::test]
    async fn test_metrics_tracking() {
        let cb = breaker(CircuitBreakerConfig {
            failure_threshold: 2,
            ..Default::default()
        });

        assert!(cb.try_acquire().await.is_ok());
        cb.record_success().await;
        assert!(cb.try_acquire().await.is_ok());
        cb.record_failure().await;
        assert!(cb.try_acquire().await.is_ok());
        cb.record_failure().await;

        assert_eq!(cb.state().await, CircuitState::Open);
        assert!(cb.try_acquire().await.is_err());

        let metrics = cb.metrics().await;
        assert_eq!(metrics.total_calls, 3);
        assert_eq!(metrics.successful_calls, 1);
        assert_eq!(metrics.failed_calls, 2);
        assert_eq!(metrics.rejected_calls, 1);
        assert_eq!(metrics.circuit_opened_count, 1);
    }
}
