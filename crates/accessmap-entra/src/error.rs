//! Error types for the Entra ID and Azure RBAC backends.

use std::time::Duration;

use thiserror::Error;

use accessmap_core::AccessError;

/// Result type alias using [`EntraError`].
pub type EntraResult<T> = Result<T, EntraError>;

/// Errors that can occur when talking to Microsoft Graph or Azure
/// Resource Manager.
#[derive(Debug, Error)]
pub enum EntraError {
    /// Configuration validation error.
    #[error("configuration error: {0}")]
    Config(String),

    /// OAuth2 authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Rate limit response (HTTP 429), with the Retry-After hint when
    /// the server sent one.
    #[error("rate limited, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Transient upstream failure (HTTP 502/503/504).
    #[error("service unavailable (status {status})")]
    Unavailable { status: u16 },

    /// Resource not found (HTTP 404).
    #[error("resource not found: {0}")]
    NotFound(String),

    /// API error response.
    #[error("API error: {code} - {message}")]
    Api { code: String, message: String },

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

/// Maps backend errors onto the resolver's classification: 429 becomes
/// a throttle signal with its hint, 5xx and transport errors become
/// transient, everything else is permanent.
impl From<EntraError> for AccessError {
    fn from(err: EntraError) -> Self {
        match err {
            EntraError::RateLimited { retry_after_secs } => AccessError::Throttled {
                retry_after: retry_after_secs.map(Duration::from_secs),
            },
            EntraError::Unavailable { status } => {
                AccessError::transient(format!("upstream unavailable (status {status})"))
            }
            EntraError::Http(e) => AccessError::transient(format!("HTTP error: {e}")),
            EntraError::Config(msg) => AccessError::Config(msg),
            EntraError::Auth(msg) => AccessError::Api {
                code: "AuthenticationFailed".to_string(),
                message: msg,
            },
            EntraError::NotFound(what) => AccessError::Api {
                code: "NotFound".to_string(),
                message: what,
            },
            EntraError::Api { code, message } => AccessError::Api { code, message },
            EntraError::Json(e) => AccessError::Api {
                code: "InvalidResponse".to_string(),
                message: e.to_string(),
            },
            EntraError::Url(e) => AccessError::Config(format!("invalid URL: {e}")),
        }
    }
}
