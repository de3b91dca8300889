//! Value types shared between the resolver core and its collaborators.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Identity kind, a closed set matched exhaustively where a
/// membership-lookup strategy is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKind {
    /// Directory user.
    User,
    /// Security group (groups can themselves be members of groups).
    Group,
    /// Application service principal.
    ServicePrincipal,
    /// User-assigned managed identity.
    UserAssignedManagedIdentity,
    /// System-assigned managed identity.
    SystemAssignedManagedIdentity,
}

/// A directory identity whose effective access is being resolved.
///
/// Immutable once resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    /// Directory object id (opaque string key).
    pub object_id: String,
    /// Identity kind.
    pub kind: IdentityKind,
    /// Display name.
    pub display_name: String,
    /// Primary email address, if any.
    pub email: Option<String>,
    /// Application (client) id for service principals.
    pub application_id: Option<String>,
}

/// A security group's display metadata plus its direct "member of"
/// parent group ids.
///
/// Created by directory lookups and cached per resolution run in a map
/// keyed by id; each id is populated at most once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupNode {
    /// Directory object id.
    pub id: String,
    /// Group display name.
    pub display_name: String,
    /// Group description.
    pub description: Option<String>,
    /// Ids of the groups this group is a direct member of.
    pub parent_ids: Vec<String>,
}

impl GroupNode {
    /// A placeholder node for a group whose fetch failed under the
    /// treat-as-leaf policy: known only by id, with no parent edges.
    #[must_use]
    pub fn unresolved_leaf(id: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: id.to_string(),
            description: None,
            parent_ids: Vec::new(),
        }
    }
}

/// A role assignment bound to a principal at some scope.
///
/// Produced only by the role-assignment query client; immutable value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignmentRecord {
    /// Assignment id.
    pub id: String,
    /// The principal (identity or group) the assignment is bound to.
    pub principal_id: String,
    /// Principal type as reported by the authorization service.
    pub principal_type: String,
    /// Role definition id.
    pub role_definition_id: String,
    /// Human-readable role name.
    pub role_name: String,
    /// Scope the role applies at.
    pub scope: String,
}

/// Output of transitive group resolution.
///
/// Invariant: every id in `direct_group_ids` and `transitive_group_ids`
/// has an entry in `group_info`.
#[derive(Debug, Clone, Default)]
pub struct ResolvedGroupSet {
    /// Deduplicated direct memberships, in order of first occurrence.
    pub direct_group_ids: Vec<String>,
    /// Every group reachable via "member of" edges, excluding the
    /// direct set.
    pub transitive_group_ids: HashSet<String>,
    /// Metadata for every visited group, keyed by id.
    pub group_info: HashMap<String, GroupNode>,
    /// Groups whose metadata fetch failed and were recorded as leaves
    /// (only populated under the treat-as-leaf failure policy).
    pub failed_group_ids: Vec<String>,
}

impl ResolvedGroupSet {
    /// Total number of groups visited, including failed leaves.
    #[must_use]
    pub fn visited_count(&self) -> usize {
        self.group_info.len()
    }
}

/// A group rendered with its role assignments and the groups it is a
/// member of, one subtree per discovery path.
///
/// Built once per report, not cached across runs.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityGroupView {
    /// Directory object id.
    pub id: String,
    /// Group display name.
    pub display_name: String,
    /// Group description.
    pub description: Option<String>,
    /// Role assignments whose principal is this group.
    pub role_assignments: Vec<RoleAssignmentRecord>,
    /// Groups this group is a member of, rendered per path.
    pub parent_groups: Vec<SecurityGroupView>,
}

impl SecurityGroupView {
    /// Number of views in this subtree, counting this node.
    ///
    /// A group reachable via two paths counts twice; this is the
    /// per-path tree, not the flat set.
    #[must_use]
    pub fn subtree_size(&self) -> usize {
        1 + self
            .parent_groups
            .iter()
            .map(SecurityGroupView::subtree_size)
            .sum::<usize>()
    }
}

/// The final per-identity report.
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveAccessReport {
    /// The identity the report is about.
    pub identity: Identity,
    /// Role assignments bound directly to the identity.
    pub identity_assignments: Vec<RoleAssignmentRecord>,
    /// Direct group memberships as top-level entries; transitive groups
    /// appear nested under their discovering parents.
    pub direct_groups: Vec<SecurityGroupView>,
    /// Groups fully resolved from the directory.
    pub resolved_group_count: usize,
    /// Groups recorded as unresolved leaves.
    pub failed_group_count: usize,
}
