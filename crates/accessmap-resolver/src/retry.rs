//! Bounded retry loop for transient errors, shared by the hierarchy
//! resolver and the end-to-end orchestrator.

use accessmap_core::{AccessError, Result};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::RetryConfig;

/// Runs `operation`, retrying transient failures with bounded
/// exponential backoff. Cancellation is observed between attempts and
/// during backoff waits.
pub(crate) async fn with_retry<T, F, Fut>(
    retry: &RetryConfig,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        if cancel.is_cancelled() {
            return Err(AccessError::Aborted);
        }

        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() => {
                attempt += 1;
                if attempt >= retry.max_attempts {
                    return Err(AccessError::RetriesExhausted { attempts: attempt });
                }

                let delay = retry.delay_for(attempt - 1);
                debug!(
                    attempt,
                    max_attempts = retry.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "retrying after transient error"
                );
                tokio::select! {
                    () = cancel.cancelled() => return Err(AccessError::Aborted),
                    () = tokio::time::sleep(delay) => {}
                }
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn succeeds_first_try() {
        let calls = AtomicUsize::new(0);
        let result = with_retry(&RetryConfig::for_testing(), &CancellationToken::new(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(42) }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let calls = AtomicUsize::new(0);
        let result = with_retry(&RetryConfig::for_testing(), &CancellationToken::new(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(AccessError::transient("blip"))
                } else {
                    Ok("done")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_permanent_errors() {
        let calls = AtomicUsize::new(0);
        let result: Result<()> =
            with_retry(&RetryConfig::for_testing(), &CancellationToken::new(), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(AccessError::Api {
                        code: "Forbidden".into(),
                        message: "denied".into(),
                    })
                }
            })
            .await;
        assert!(matches!(result, Err(AccessError::Api { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_attempt_cap() {
        let calls = AtomicUsize::new(0);
        let retry = RetryConfig::for_testing();
        let result: Result<()> = with_retry(&retry, &CancellationToken::new(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AccessError::transient("still down")) }
        })
        .await;
        assert!(matches!(
            result,
            Err(AccessError::RetriesExhausted { attempts: 3 })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), retry.max_attempts as usize);
    }

    #[tokio::test]
    async fn cancellation_aborts_backoff_wait() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result: Result<()> = with_retry(&RetryConfig::for_testing(), &cancel, || async {
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(AccessError::Aborted)));
    }
}
