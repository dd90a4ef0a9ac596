pub mod rate_limit;
pub mod retry;
pub mod status;

pub use rate_limit::RateLimitPolicy;
pub use retry::RetryExecutor;
pub use status::{AttemptResponse, StandardStatusPolicy, StatusAwareExecutor, StatusPolicy};

use crate::error::{CallError, Result};
use crate::events::{CallEvent, EventSink};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// A whole-sequence time budget for one logical call.
///
/// Checked before each attempt and before each backoff wait. A wait that
/// would outlive the deadline aborts the retry loop with
/// [`CallError::DeadlineExceeded`] instead of sleeping, so a caller's budget
/// is never silently overrun by a long backoff.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started_at: Instant,
    expires_at: Instant,
}

impl Deadline {
    /// Deadline expiring `budget` from now.
    pub fn after(budget: Duration) -> Self {
        let now = Instant::now();
        Self {
            started_at: now,
            expires_at: now + budget,
        }
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Time left before expiry; zero once expired.
    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    /// Time since the deadline was created.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Whether a wait of `delay` would run past this deadline.
    pub fn outlived_by(&self, delay: Duration) -> bool {
        delay >= self.remaining()
    }
}

/// Sleep for `delay`, unless doing so would run past the deadline.
pub(crate) async fn wait_within(
    delay: Duration,
    deadline: Option<&Deadline>,
    events: &Arc<dyn EventSink>,
) -> Result<()> {
    if let Some(deadline) = deadline {
        if deadline.outlived_by(delay) {
            let elapsed = deadline.elapsed();
            events.emit(&CallEvent::DeadlineExceeded { elapsed });
            return Err(CallError::DeadlineExceeded { elapsed });
        }
    }
    tokio::time::sleep(delay).await;
    Ok(())
}

/// Deadline expiry check at an attempt boundary.
pub(crate) fn check_deadline(deadline: Option<&Deadline>, events: &Arc<dyn EventSink>) -> Result<()> {
    if let Some(deadline) = deadline {
        if deadline.expired() {
            let elapsed = deadline.elapsed();
            events.emit(&CallEvent::DeadlineExceeded { elapsed });
            return Err(CallError::DeadlineExceeded { elapsed });
        }
    }
    Ok(())
}
