pub mod breaker;
pub mod service;
pub mod types;

pub use breaker::CircuitBreaker;
pub use service::ResilienceService;
pub use types::{CircuitBreakerMetrics, CircuitState};
