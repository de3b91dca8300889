//! Process-wide throttle coordination for the authorization query
//! service.
//!
//! A single "blocked until" deadline is shared by every caller in the
//! process (intentionally cross-run, to protect the shared upstream
//! service from aggregate overload). The deadline is extended on every
//! rate-limit signal and cleared on every successful call.

use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

/// Shared rate-limit coordinator gating outbound authorization queries.
///
/// Uses [`tokio::time::Instant`] so tests can run under a paused clock.
#[derive(Debug, Default)]
pub struct ThrottleCoordinator {
    blocked_until: RwLock<Option<Instant>>,
}

impl ThrottleCoordinator {
    /// Creates an unblocked coordinator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no throttle deadline is active.
    ///
    /// Loops rather than sleeping once: the deadline may be extended by
    /// another caller while this one is waiting.
    pub async fn wait_until_clear(&self) {
        loop {
            let deadline = *self.blocked_until.read().await;
            match deadline {
                Some(until) if until > Instant::now() => {
                    debug!(
                        remaining_ms = (until - Instant::now()).as_millis() as u64,
                        "waiting out throttle window"
                    );
                    tokio::time::sleep_until(until).await;
                }
                _ => return,
            }
        }
    }

    /// Extends the shared deadline to at least `duration` from now.
    ///
    /// Monotonic: never shortens an already-later deadline set by a
    /// concurrent caller.
    pub async fn block_for(&self, duration: Duration) {
        let candidate = Instant::now() + duration;
        let mut blocked = self.blocked_until.write().await;
        let extended = match *blocked {
            Some(current) if current >= candidate => current,
            _ => candidate,
        };
        *blocked = Some(extended);
        debug!(block_ms = duration.as_millis() as u64, "throttle window extended");
    }

    /// Clears the deadline. Called on every successful request.
    pub async fn clear(&self) {
        let mut blocked = self.blocked_until.write().await;
        *blocked = None;
    }

    /// Returns whether a deadline is currently active.
    pub async fn is_blocked(&self) -> bool {
        self.blocked_remaining().await.is_some()
    }

    /// Time left on the active deadline, if any.
    pub async fn blocked_remaining(&self) -> Option<Duration> {
        let deadline = *self.blocked_until.read().await;
        deadline.and_then(|until| until.checked_duration_since(Instant::now()))
    }
}
