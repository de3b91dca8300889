//! OAuth2 client-credentials authentication.
//!
//! Tokens are cached per scope: Graph and ARM requests use different
//! audiences and therefore different tokens.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::{CloudEnvironment, EntraCredentials, EntraError, EntraResult};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_expired(&self, grace_period: Duration) -> bool {
        Utc::now() + grace_period >= self.expires_at
    }
}

/// Per-scope OAuth2 token cache using the client-credentials flow.
#[derive(Debug)]
pub struct TokenCache {
    credentials: EntraCredentials,
    login_endpoint: String,
    tenant_id: String,
    http_client: reqwest::Client,
    cached: RwLock<HashMap<String, CachedToken>>,
    /// Grace period before expiry to trigger refresh (default: 5 minutes).
    grace_period: Duration,
}

impl TokenCache {
    /// Creates a token cache for the given tenant and cloud.
    pub fn new(credentials: EntraCredentials, cloud: &CloudEnvironment, tenant_id: String) -> Self {
        Self {
            credentials,
            login_endpoint: cloud.login_endpoint().to_string(),
            tenant_id,
            http_client: reqwest::Client::new(),
            cached: RwLock::new(HashMap::new()),
            grace_period: Duration::minutes(5),
        }
    }

    /// Gets a valid access token for the scope, refreshing if necessary.
    #[instrument(skip(self, scope), fields(tenant_id = %self.tenant_id))]
    pub async fn get_token(&self, scope: &str) -> EntraResult<String> {
        {
            let cache = self.cached.read().await;
            if let Some(token) = cache.get(scope) {
                if !token.is_expired(self.grace_period) {
                    return Ok(token.access_token.clone());
                }
            }
        }

        debug!(scope, "acquiring access token");
        let new_token = self.acquire_token(scope).await?;
        let access_token = new_token.access_token.clone();
        self.cached
            .write()
            .await
            .insert(scope.to_string(), new_token);
        Ok(access_token)
    }

    async fn acquire_token(&self, scope: &str) -> EntraResult<CachedToken> {
        let token_url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.login_endpoint, self.tenant_id
        );

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", &self.credentials.client_id),
            ("client_secret", self.credentials.client_secret.expose_secret()),
            ("scope", scope),
        ];

        let response = self
            .http_client
            .post(&token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| EntraError::Auth(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EntraError::Auth(format!(
                "token request failed with status {status}: {body}"
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| EntraError::Auth(format!("malformed token response: {e}")))?;

        Ok(CachedToken {
            access_token: token_response.access_token,
            expires_at: Utc::now() + Duration::seconds(token_response.expires_in),
        })
    }

    /// Invalidates all cached tokens, forcing a refresh on next use.
    pub async fn invalidate(&self) {
        self.cached.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cached_token_expiry_respects_grace_period() {
        let token = CachedToken {
            access_token: "t".to_string(),
            expires_at: Utc::now() + Duration::minutes(10),
        };
        assert!(!token.is_expired(Duration::minutes(5)));
        assert!(token.is_expired(Duration::minutes(15)));
    }

    #[test]
    fn already_expired_token_is_expired_with_zero_grace() {
        let token = CachedToken {
            access_token: "t".to_string(),
            expires_at: Utc::now() - Duration::minutes(1),
        };
        assert!(token.is_expired(Duration::minutes(0)));
    }
}
