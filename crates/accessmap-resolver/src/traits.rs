//! Collaborator contracts consumed by the resolver core.
//!
//! Implementations live outside this crate (see `accessmap-entra` for
//! the Microsoft Graph / ARM implementations); tests use in-memory
//! fakes.

use async_trait::async_trait;

use accessmap_core::{GroupNode, Identity, Result, RoleAssignmentRecord};

/// Directory-service lookups: group metadata and direct memberships.
#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// Returns the ids of the groups the identity is a direct member of.
    ///
    /// Implementations select the lookup path from the identity kind
    /// (users, groups and service principals use different endpoints);
    /// the core treats all kinds as the same logical capability.
    ///
    /// Zero memberships is a legitimate answer. An identity the
    /// directory cannot answer for at all fails with
    /// [`accessmap_core::AccessError::UnresolvableIdentity`].
    async fn direct_memberships(&self, identity: &Identity) -> Result<Vec<String>>;

    /// Returns a group's display metadata and direct parent group ids.
    async fn group_info(&self, group_id: &str) -> Result<GroupNode>;
}

/// One page of role-assignment records.
#[derive(Debug, Clone, Default)]
pub struct AssignmentPage {
    /// Records in this page.
    pub records: Vec<RoleAssignmentRecord>,
    /// Continuation token for the next page; `None` on the last page.
    pub continuation: Option<String>,
}

/// Authorization query service: paginated role-assignment queries
/// filtered by principal id.
#[async_trait]
pub trait RoleAssignmentSource: Send + Sync {
    /// Fetches one page of role assignments for the given principal
    /// ids, building a single disjunction filter over all of them.
    ///
    /// A rate-limited request must fail with
    /// [`accessmap_core::AccessError::Throttled`] carrying the server's
    /// retry hint when present, distinctly from other failures.
    async fn query_page(
        &self,
        principal_ids: &[String],
        continuation: Option<&str>,
    ) -> Result<AssignmentPage>;
}
