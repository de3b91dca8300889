//! Authenticated HTTP client with response classification.
//!
//! Performs a single attempt per call and maps the response onto the
//! error taxonomy; retry and throttle policy belong to the resolver,
//! which needs to coordinate them across callers.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use crate::{EntraError, EntraResult, TokenCache};

/// Paginated Microsoft Graph response.
#[derive(Debug, Deserialize)]
pub struct ODataPage<T> {
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

/// Paginated Azure Resource Manager response.
#[derive(Debug, Deserialize)]
pub struct ArmPage<T> {
    pub value: Vec<T>,
    #[serde(rename = "nextLink")]
    pub next_link: Option<String>,
}

/// Error body shared by Graph (OData) and ARM responses.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// Bearer-authenticated GET client for Graph and ARM.
#[derive(Debug)]
pub struct ApiClient {
    http_client: reqwest::Client,
    token_cache: Arc<TokenCache>,
}

impl ApiClient {
    /// Creates a client with a 30 second request timeout.
    pub fn new(token_cache: Arc<TokenCache>) -> EntraResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| EntraError::Config(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http_client,
            token_cache,
        })
    }

    /// Performs a GET with token injection for the given scope and
    /// classifies the response.
    ///
    /// The URL is parsed up front so a malformed continuation link is
    /// rejected before a token is ever requested.
    #[instrument(skip(self, scope))]
    pub async fn get<T: DeserializeOwned>(&self, url: &str, scope: &str) -> EntraResult<T> {
        let url = Url::parse(url)?;
        let token = self.token_cache.get_token(scope).await?;

        let response = self
            .http_client
            .get(url.clone())
            .bearer_auth(&token)
            .send()
            .await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = parse_retry_after(response.headers());
            debug!(?retry_after_secs, "rate limited");
            return Err(EntraError::RateLimited { retry_after_secs });
        }

        if matches!(
            status,
            reqwest::StatusCode::BAD_GATEWAY
                | reqwest::StatusCode::SERVICE_UNAVAILABLE
                | reqwest::StatusCode::GATEWAY_TIMEOUT
        ) {
            return Err(EntraError::Unavailable {
                status: status.as_u16(),
            });
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(EntraError::NotFound(url.to_string()));
        }

        if status.is_success() {
            return response.json().await.map_err(EntraError::from);
        }

        let body = response.text().await.unwrap_or_default();
        if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(&body) {
            return Err(EntraError::Api {
                code: envelope.error.code,
                message: envelope.error.message,
            });
        }
        Err(EntraError::Api {
            code: status.to_string(),
            message: body,
        })
    }
}

/// Parses the numeric form of a Retry-After header.
fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}
