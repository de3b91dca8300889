//! Azure Resource Manager implementation of the role-assignment source.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use accessmap_core::{AccessError, Result, RoleAssignmentRecord};
use accessmap_resolver::traits::{AssignmentPage, RoleAssignmentSource};

use crate::client::{ApiClient, ArmPage};
use crate::{EntraConfig, EntraError, EntraResult};

#[derive(Debug, Deserialize)]
struct RoleAssignmentResource {
    id: String,
    properties: RoleAssignmentProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleAssignmentProperties {
    principal_id: String,
    principal_type: Option<String>,
    role_definition_id: String,
    scope: String,
}

#[derive(Debug, Deserialize)]
struct RoleDefinitionResource {
    properties: RoleDefinitionProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleDefinitionProperties {
    role_name: String,
}

/// Role-assignment queries against the ARM authorization API.
///
/// Role definition names are cached for the lifetime of the source;
/// definitions are immutable enough that a stale name is harmless.
#[derive(Debug)]
pub struct ArmRoleAssignments {
    client: Arc<ApiClient>,
    config: EntraConfig,
    role_names: RwLock<HashMap<String, String>>,
}

impl ArmRoleAssignments {
    /// Creates a source over the given client. Fails on invalid
    /// configuration.
    pub fn new(client: Arc<ApiClient>, config: EntraConfig) -> EntraResult<Self> {
        config.validate().map_err(EntraError::Config)?;
        Ok(Self {
            client,
            config,
            role_names: RwLock::new(HashMap::new()),
        })
    }

    /// Builds the first-page URL with a single disjunction filter over
    /// all principal ids.
    fn first_page_url(&self, principal_ids: &[String]) -> String {
        let filter = principal_ids
            .iter()
            .map(|id| format!("principalId eq '{id}'"))
            .collect::<Vec<_>>()
            .join(" or ");
        format!(
            "{}/subscriptions/{}/providers/Microsoft.Authorization/roleAssignments?api-version={}&$filter={}",
            self.config.cloud.arm_endpoint(),
            self.config.subscription_id,
            self.config.arm_api_version,
            urlencoding::encode(&filter)
        )
    }

    /// Resolves a role definition's display name, consulting the cache
    /// first. Falls back to the definition id's last path segment when
    /// the lookup fails.
    async fn role_name(&self, role_definition_id: &str) -> String {
        if let Some(name) = self.role_names.read().await.get(role_definition_id) {
            return name.clone();
        }

        let url = format!(
            "{}{}?api-version={}",
            self.config.cloud.arm_endpoint(),
            role_definition_id,
            self.config.arm_api_version
        );
        let name = match self
            .client
            .get::<RoleDefinitionResource>(&url, &self.config.cloud.arm_scope())
            .await
        {
            Ok(definition) => definition.properties.role_name,
            Err(e) => {
                warn!(role_definition_id, error = %e, "role definition lookup failed, using id");
                role_definition_id
                    .rsplit('/')
                    .next()
                    .unwrap_or(role_definition_id)
                    .to_string()
            }
        };

        self.role_names
            .write()
            .await
            .insert(role_definition_id.to_string(), name.clone());
        name
    }
}

#[async_trait]
impl RoleAssignmentSource for ArmRoleAssignments {
    #[instrument(skip(self, principal_ids, continuation), fields(principal_count = principal_ids.len(), continued = continuation.is_some()))]
    async fn query_page(
        &self,
        principal_ids: &[String],
        continuation: Option<&str>,
    ) -> Result<AssignmentPage> {
        // The continuation token is the nextLink URL the service handed
        // back, used verbatim.
        let url = match continuation {
            Some(next) => next.to_string(),
            None => self.first_page_url(principal_ids),
        };

        let page: ArmPage<RoleAssignmentResource> = self
            .client
            .get(&url, &self.config.cloud.arm_scope())
            .await
            .map_err(AccessError::from)?;

        debug!(records = page.value.len(), has_next = page.next_link.is_some(), "assignment page fetched");

        let mut records = Vec::with_capacity(page.value.len());
        for resource in page.value {
            let role_name = self.role_name(&resource.properties.role_definition_id).await;
            records.push(RoleAssignmentRecord {
                id: resource.id,
                principal_id: resource.properties.principal_id,
                principal_type: resource
                    .properties
                    .principal_type
                    .unwrap_or_else(|| "Unknown".to_string()),
                role_definition_id: resource.properties.role_definition_id,
                role_name,
                scope: resource.properties.scope,
            });
        }

        Ok(AssignmentPage {
            records,
            continuation: page.next_link,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CloudEnvironment, EntraCredentials, TokenCache};

    fn source() -> ArmRoleAssignments {
        let cache = Arc::new(TokenCache::new(
            EntraCredentials::new("client", "secret"),
            &CloudEnvironment::Public,
            "tenant-1".to_string(),
        ));
        let client = Arc::new(ApiClient::new(cache).unwrap());
        ArmRoleAssignments::new(client, EntraConfig::new("tenant-1", "sub-1")).unwrap()
    }

    #[test]
    fn first_page_url_encodes_disjunction_filter() {
        let url = source().first_page_url(&["p-1".to_string(), "p-2".to_string()]);
        assert!(url.starts_with(
            "https://management.azure.com/subscriptions/sub-1/providers/Microsoft.Authorization/roleAssignments?api-version=2022-04-01&$filter="
        ));
        assert!(url.contains("principalId%20eq%20%27p-1%27%20or%20principalId%20eq%20%27p-2%27"));
    }
}
