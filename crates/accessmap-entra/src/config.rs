//! Configuration for the Entra ID and Azure RBAC backends.

use secrecy::SecretString;

/// Azure cloud environment, selecting the Graph, login, and ARM
/// endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloudEnvironment {
    /// Global Azure cloud.
    Public,
    /// Azure Government (US).
    UsGovernment,
    /// Azure operated by 21Vianet (China).
    China,
    /// Custom endpoints, used for sovereign deployments and tests.
    Custom {
        graph_endpoint: String,
        login_endpoint: String,
        arm_endpoint: String,
    },
}

impl CloudEnvironment {
    /// Microsoft Graph base endpoint.
    #[must_use]
    pub fn graph_endpoint(&self) -> &str {
        match self {
            Self::Public => "https://graph.microsoft.com",
            Self::UsGovernment => "https://graph.microsoft.us",
            Self::China => "https://microsoftgraph.chinacloudapi.cn",
            Self::Custom { graph_endpoint, .. } => graph_endpoint,
        }
    }

    /// OAuth2 login endpoint.
    #[must_use]
    pub fn login_endpoint(&self) -> &str {
        match self {
            Self::Public => "https://login.microsoftonline.com",
            Self::UsGovernment => "https://login.microsoftonline.us",
            Self::China => "https://login.chinacloudapi.cn",
            Self::Custom { login_endpoint, .. } => login_endpoint,
        }
    }

    /// Azure Resource Manager base endpoint.
    #[must_use]
    pub fn arm_endpoint(&self) -> &str {
        match self {
            Self::Public => "https://management.azure.com",
            Self::UsGovernment => "https://management.usgovcloudapi.net",
            Self::China => "https://management.chinacloudapi.cn",
            Self::Custom { arm_endpoint, .. } => arm_endpoint,
        }
    }

    /// OAuth2 scope for Graph requests.
    #[must_use]
    pub fn graph_scope(&self) -> String {
        format!("{}/.default", self.graph_endpoint())
    }

    /// OAuth2 scope for ARM requests.
    #[must_use]
    pub fn arm_scope(&self) -> String {
        format!("{}/.default", self.arm_endpoint())
    }
}

/// Client credentials for the OAuth2 client-credentials flow.
#[derive(Debug, Clone)]
pub struct EntraCredentials {
    /// Application (client) id.
    pub client_id: String,
    /// Client secret, redacted in debug output.
    pub client_secret: SecretString,
}

impl EntraCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: SecretString::from(client_secret.into()),
        }
    }
}

/// Backend configuration.
#[derive(Debug, Clone)]
pub struct EntraConfig {
    /// Entra tenant id.
    pub tenant_id: String,
    /// Azure subscription to query role assignments in.
    pub subscription_id: String,
    /// Cloud environment (default: Public).
    pub cloud: CloudEnvironment,
    /// Graph API version (default: "v1.0").
    pub graph_api_version: String,
    /// ARM authorization API version (default: "2022-04-01").
    pub arm_api_version: String,
    /// Page size requested from Graph list endpoints (default: 100).
    pub page_size: usize,
}

impl EntraConfig {
    /// Creates a configuration with default versions against the public
    /// cloud.
    pub fn new(tenant_id: impl Into<String>, subscription_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            subscription_id: subscription_id.into(),
            cloud: CloudEnvironment::Public,
            graph_api_version: "v1.0".to_string(),
            arm_api_version: "2022-04-01".to_string(),
            page_size: 100,
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.tenant_id.trim().is_empty() {
            return Err("tenant_id must not be empty".to_string());
        }
        if self.subscription_id.trim().is_empty() {
            return Err("subscription_id must not be empty".to_string());
        }
        if self.graph_api_version.trim().is_empty() || self.arm_api_version.trim().is_empty() {
            return Err("API versions must not be empty".to_string());
        }
        if self.page_size == 0 || self.page_size > 999 {
            return Err("page_size must be between 1 and 999".to_string());
        }
        Ok(())
    }

    /// Graph base URL including the API version.
    #[must_use]
    pub fn graph_base_url(&self) -> String {
        format!("{}/{}", self.cloud.graph_endpoint(), self.graph_api_version)
    }
}
