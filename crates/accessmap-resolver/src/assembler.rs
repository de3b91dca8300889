//! Builds the per-group membership trees for the final report.
//!
//! Each direct group becomes the root of one tree; a group's "member
//! of" parents are rendered as children of its view. The visited set is
//! per root-to-node path: a group reached through two different branches
//! is rendered under each (a diamond shows up twice), while an edge back
//! to a group already on the current path is skipped, which terminates
//! cycles.

use std::collections::{HashMap, HashSet};

use accessmap_core::{GroupNode, ResolvedGroupSet, RoleAssignmentRecord, SecurityGroupView};
use tracing::debug;

/// Builds one view tree per direct group, in direct-membership order.
///
/// Assignments are attached to every view whose group id matches their
/// principal id. Parent ids without an entry in the resolved metadata
/// are skipped.
#[must_use]
pub fn build_views(
    resolved: &ResolvedGroupSet,
    assignments: &[RoleAssignmentRecord],
) -> Vec<SecurityGroupView> {
    let mut by_principal: HashMap<&str, Vec<&RoleAssignmentRecord>> = HashMap::new();
    for assignment in assignments {
        by_principal
            .entry(assignment.principal_id.as_str())
            .or_default()
            .push(assignment);
    }

    let views: Vec<SecurityGroupView> = resolved
        .direct_group_ids
        .iter()
        .filter_map(|id| build_subtree(id, resolved, &by_principal))
        .collect();

    debug!(
        roots = views.len(),
        total_nodes = views.iter().map(SecurityGroupView::subtree_size).sum::<usize>(),
        "membership trees assembled"
    );
    views
}

struct Frame {
    view: SecurityGroupView,
    parent_ids: Vec<String>,
    next_parent: usize,
}

impl Frame {
    fn new(node: &GroupNode, by_principal: &HashMap<&str, Vec<&RoleAssignmentRecord>>) -> Self {
        let role_assignments = by_principal
            .get(node.id.as_str())
            .map(|records| records.iter().map(|r| (*r).clone()).collect())
            .unwrap_or_default();
        Self {
            view: SecurityGroupView {
                id: node.id.clone(),
                display_name: node.display_name.clone(),
                description: node.description.clone(),
                role_assignments,
                parent_groups: Vec::new(),
            },
            parent_ids: node.parent_ids.clone(),
            next_parent: 0,
        }
    }
}

/// Depth-first rendering with an explicit frame stack; `on_path` holds
/// the ids of the current root-to-node path only.
fn build_subtree(
    root_id: &str,
    resolved: &ResolvedGroupSet,
    by_principal: &HashMap<&str, Vec<&RoleAssignmentRecord>>,
) -> Option<SecurityGroupView> {
    let root = resolved.group_info.get(root_id)?;

    let mut on_path: HashSet<String> = HashSet::new();
    on_path.insert(root_id.to_string());
    let mut stack = vec![Frame::new(root, by_principal)];
    let mut completed: Option<SecurityGroupView> = None;

    loop {
        let next_parent_id = {
            let top = match stack.last_mut() {
                Some(top) => top,
                None => break,
            };
            if let Some(child) = completed.take() {
                top.view.parent_groups.push(child);
            }
            if top.next_parent < top.parent_ids.len() {
                let id = top.parent_ids[top.next_parent].clone();
                top.next_parent += 1;
                Some(id)
            } else {
                None
            }
        };

        match next_parent_id {
            Some(parent_id) => {
                // Back-edge into the current path: cycle, stop here.
                if on_path.contains(&parent_id) {
                    continue;
                }
                if let Some(node) = resolved.group_info.get(&parent_id) {
                    on_path.insert(parent_id);
                    stack.push(Frame::new(node, by_principal));
                }
            }
            None => {
                if let Some(frame) = stack.pop() {
                    on_path.remove(&frame.view.id);
                    completed = Some(frame.view);
                }
            }
        }
    }

    completed
}
