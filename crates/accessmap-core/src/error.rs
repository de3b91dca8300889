//! Error types for effective-access resolution.
//!
//! Errors are classified as transient or permanent; retry loops only act
//! on transient errors (network blips and rate-limit signals).

use std::time::Duration;

use thiserror::Error;

/// Result type alias using [`AccessError`].
pub type Result<T> = std::result::Result<T, AccessError>;

/// Errors that can occur while resolving effective access.
#[derive(Debug, Error)]
pub enum AccessError {
    /// Transient upstream failure (network blip, 5xx response).
    #[error("transient upstream error: {message}")]
    Transient { message: String },

    /// Rate-limit signal from an upstream service, with the optional
    /// server-provided retry hint.
    #[error("rate limited by upstream service (retry hint: {retry_after:?})")]
    Throttled { retry_after: Option<Duration> },

    /// A principal id that is not a well-formed identifier. The query
    /// client drops these with a warning instead of failing the batch.
    #[error("invalid principal id: {id}")]
    InvalidPrincipalId { id: String },

    /// Cancellation was requested mid-run.
    #[error("resolution aborted")]
    Aborted,

    /// A bounded retry loop exhausted its attempt cap.
    #[error("retries exhausted after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    /// The directory could not answer the membership lookup for this
    /// identity at all. Zero memberships is NOT this error.
    #[error("identity {object_id} cannot be resolved in the directory")]
    UnresolvableIdentity { object_id: String },

    /// Permanent upstream API error.
    #[error("upstream API error: {code} - {message}")]
    Api { code: String, message: String },

    /// Configuration validation error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Terminal failure of a whole resolution run. Carries the counts a
    /// user sees instead of the raw transport error.
    #[error(
        "resolution failed during {phase}: {resolved_groups} groups resolved, {failed_groups} failed"
    )]
    ResolutionFailed {
        phase: String,
        resolved_groups: usize,
        failed_groups: usize,
        #[source]
        source: Box<AccessError>,
    },
}

impl AccessError {
    /// Returns true if the error is transient and the operation may be
    /// retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::Throttled { .. })
    }

    /// Convenience constructor for transient errors.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(AccessError::transient("connection reset").is_transient());
        assert!(AccessError::Throttled { retry_after: None }.is_transient());
        assert!(!AccessError::Aborted.is_transient());
        assert!(!AccessError::RetriesExhausted { attempts: 5 }.is_transient());
        assert!(!AccessError::Api {
            code: "Forbidden".into(),
            message: "nope".into(),
        }
        .is_transient());
    }

    #[test]
    fn resolution_failed_display_reports_counts_not_transport() {
        let err = AccessError::ResolutionFailed {
            phase: "QueryingAssignments".into(),
            resolved_groups: 12,
            failed_groups: 3,
            source: Box::new(AccessError::transient("socket closed")),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("12 groups resolved"));
        assert!(rendered.contains("3 failed"));
        assert!(!rendered.contains("socket closed"));
    }

    #[test]
    fn throttled_carries_retry_hint() {
        let err = AccessError::Throttled {
            retry_after: Some(Duration::from_secs(30)),
        };
        assert!(err.to_string().contains("30"));
    }
}
