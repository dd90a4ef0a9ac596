use serde::{Deserialize, Serialize};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CircuitState {
    /// Circuit is closed, calls flow normally
    Closed,
    /// Circuit is open, calls are rejected without reaching the target
    Open,
    /// Circuit is half-open, probing the target before fully resuming
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "Closed"),
            CircuitState::Open => write!(f, "Open"),
            CircuitState::HalfOpen => write!(f, "HalfOpen"),
        }
    }
}

/// Per-target circuit breaker counters
#[derive(Debug, Clone, Default)]
pub struct CircuitBreakerMetrics {
    /// Total number of calls that passed the gate
    pub total_calls: u64,
    /// Calls the breaker counted as successes
    pub successful_calls: u64,
    /// Calls the breaker counted as failures
    pub failed_calls: u64,
    /// Calls rejected while the circuit was open
    pub rejected_calls: u64,
    /// Number of times the circuit opened
    pub circuit_opened_count: u64,
    /// Number of times the circuit closed
    pub circuit_closed_count: u64,
    /// Number of times the circuit half-opened
    pub circuit_half_opened_count: u64,
}
