//! Microsoft Graph implementation of the directory service.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use accessmap_core::{AccessError, GroupNode, Identity, IdentityKind, Result};
use accessmap_resolver::traits::DirectoryService;

use crate::client::{ApiClient, ODataPage};
use crate::{EntraConfig, EntraError, EntraResult};

#[derive(Debug, Deserialize)]
struct GroupRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GroupSummary {
    id: String,
    #[serde(rename = "displayName")]
    display_name: Option<String>,
    description: Option<String>,
}

/// Directory lookups backed by Microsoft Graph.
#[derive(Debug)]
pub struct GraphDirectory {
    client: Arc<ApiClient>,
    config: EntraConfig,
}

impl GraphDirectory {
    /// Creates a directory over the given client. Fails on invalid
    /// configuration.
    pub fn new(client: Arc<ApiClient>, config: EntraConfig) -> EntraResult<Self> {
        config.validate().map_err(EntraError::Config)?;
        Ok(Self { client, config })
    }

    /// Resolves the Graph collection segment for an identity kind.
    ///
    /// Managed identities are service principals in the directory, so
    /// all three principal kinds share that endpoint.
    fn collection_for(kind: IdentityKind) -> &'static str {
        match kind {
            IdentityKind::User => "users",
            IdentityKind::Group => "groups",
            IdentityKind::ServicePrincipal
            | IdentityKind::UserAssignedManagedIdentity
            | IdentityKind::SystemAssignedManagedIdentity => "servicePrincipals",
        }
    }

    /// Fetches all direct "member of" group ids for an object, following
    /// `@odata.nextLink` pages.
    async fn member_of_ids(&self, collection: &str, object_id: &str) -> EntraResult<Vec<String>> {
        let scope = self.config.cloud.graph_scope();
        let mut url = format!(
            "{}/{}/{}/memberOf/microsoft.graph.group?$select=id&$top={}",
            self.config.graph_base_url(),
            collection,
            object_id,
            self.config.page_size
        );

        let mut ids = Vec::new();
        loop {
            let page: ODataPage<GroupRef> = self.client.get(&url, &scope).await?;
            ids.extend(page.value.into_iter().map(|g| g.id));
            match page.next_link {
                Some(next) => url = next,
                None => break,
            }
        }
        Ok(ids)
    }
}

#[async_trait]
impl DirectoryService for GraphDirectory {
    #[instrument(skip(self, identity), fields(object_id = %identity.object_id, kind = ?identity.kind))]
    async fn direct_memberships(&self, identity: &Identity) -> Result<Vec<String>> {
        let collection = Self::collection_for(identity.kind);
        match self.member_of_ids(collection, &identity.object_id).await {
            Ok(ids) => {
                debug!(count = ids.len(), "direct memberships fetched");
                Ok(ids)
            }
            // The object itself is unknown to the directory; distinct
            // from an empty membership list.
            Err(EntraError::NotFound(_)) => Err(AccessError::UnresolvableIdentity {
                object_id: identity.object_id.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    async fn group_info(&self, group_id: &str) -> Result<GroupNode> {
        let scope = self.config.cloud.graph_scope();
        let url = format!(
            "{}/groups/{}?$select=id,displayName,description",
            self.config.graph_base_url(),
            group_id
        );
        let summary: GroupSummary = self.client.get(&url, &scope).await.map_err(AccessError::from)?;
        let parent_ids = self
            .member_of_ids("groups", group_id)
            .await
            .map_err(AccessError::from)?;

        Ok(GroupNode {
            display_name: summary.display_name.unwrap_or_else(|| summary.id.clone()),
            id: summary.id,
            description: summary.description,
            parent_ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_principal_kinds_map_to_a_collection() {
        assert_eq!(GraphDirectory::collection_for(IdentityKind::User), "users");
        assert_eq!(GraphDirectory::collection_for(IdentityKind::Group), "groups");
        for kind in [
            IdentityKind::ServicePrincipal,
            IdentityKind::UserAssignedManagedIdentity,
            IdentityKind::SystemAssignedManagedIdentity,
        ] {
            assert_eq!(GraphDirectory::collection_for(kind), "servicePrincipals");
        }
    }
}
