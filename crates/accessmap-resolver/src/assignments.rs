//! Rate-limit-aware, paginated role-assignment retrieval.
//!
//! Wraps a [`RoleAssignmentSource`] with the shared
//! [`ThrottleCoordinator`]: every page fetch first waits out any active
//! throttle window, a throttled response extends the window for the
//! whole process, and a successful response clears it.

use std::sync::Arc;

use accessmap_core::{AccessError, Result, RoleAssignmentRecord};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::config::RetryConfig;
use crate::throttle::ThrottleCoordinator;
use crate::traits::{AssignmentPage, RoleAssignmentSource};

/// Fetches all role assignments for a set of principals, following
/// continuation tokens and coordinating with the process-wide throttle.
#[derive(Debug)]
pub struct RoleAssignmentQueryClient<S> {
    source: Arc<S>,
    throttle: Arc<ThrottleCoordinator>,
    retry: RetryConfig,
}

impl<S: RoleAssignmentSource> RoleAssignmentQueryClient<S> {
    /// Creates a client over the given source and shared throttle.
    pub fn new(source: Arc<S>, throttle: Arc<ThrottleCoordinator>, retry: RetryConfig) -> Self {
        Self {
            source,
            throttle,
            retry,
        }
    }

    /// Fetches every role assignment for the given principal ids.
    ///
    /// Records arrive in upstream page order. Principal ids that are not
    /// valid GUIDs are dropped with a warning rather than sent upstream;
    /// an empty (or fully invalid) id set short-circuits to an empty
    /// result with no query issued.
    #[instrument(skip(self, principal_ids, cancel), fields(principal_count = principal_ids.len()))]
    pub async fn fetch_all(
        &self,
        principal_ids: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<RoleAssignmentRecord>> {
        let valid_ids: Vec<String> = principal_ids
            .iter()
            .filter(|id| match validate_principal_id(id) {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "dropping principal id from assignment query");
                    false
                }
            })
            .cloned()
            .collect();

        if valid_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        let mut continuation: Option<String> = None;
        let mut page = 0u32;

        loop {
            let fetched = self
                .fetch_page(&valid_ids, continuation.as_deref(), cancel)
                .await?;
            page += 1;
            debug!(page, records = fetched.records.len(), "assignment page received");
            records.extend(fetched.records);

            match fetched.continuation {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }

        Ok(records)
    }

    /// Fetches one page, retrying throttled and transient responses.
    ///
    /// A throttled response extends the shared window by the server's
    /// hint (or this client's backoff schedule when no hint is given),
    /// so concurrent callers back off together. Only a successful
    /// response clears the window.
    async fn fetch_page(
        &self,
        principal_ids: &[String],
        continuation: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<AssignmentPage> {
        let mut attempt = 0u32;
        loop {
            self.throttle.wait_until_clear().await;
            if cancel.is_cancelled() {
                return Err(AccessError::Aborted);
            }

            match self.source.query_page(principal_ids, continuation).await {
                Ok(fetched) => {
                    self.throttle.clear().await;
                    return Ok(fetched);
                }
                Err(AccessError::Throttled { retry_after }) => {
                    attempt += 1;
                    if attempt >= self.retry.max_attempts {
                        return Err(AccessError::RetriesExhausted { attempts: attempt });
                    }
                    let window = retry_after.unwrap_or_else(|| self.retry.delay_for(attempt - 1));
                    warn!(
                        attempt,
                        window_ms = window.as_millis() as u64,
                        hinted = retry_after.is_some(),
                        "assignment query throttled"
                    );
                    self.throttle.block_for(window).await;
                }
                Err(e) if e.is_transient() => {
                    attempt += 1;
                    if attempt >= self.retry.max_attempts {
                        return Err(AccessError::RetriesExhausted { attempts: attempt });
                    }
                    let delay = self.retry.delay_for(attempt - 1);
                    debug!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "retrying assignment page");
                    tokio::select! {
                        () = cancel.cancelled() => return Err(AccessError::Aborted),
                        () = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Checks that a principal id is a well-formed GUID; the upstream
/// filter grammar rejects anything else.
fn validate_principal_id(id: &str) -> Result<()> {
    match Uuid::parse_str(id) {
        Ok(_) => Ok(()),
        Err(_) => Err(AccessError::InvalidPrincipalId { id: id.to_string() }),
    }
}
