//! In-memory fakes shared by the resolver integration tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use accessmap_core::{AccessError, GroupNode, Identity, IdentityKind, Result, RoleAssignmentRecord};
use accessmap_resolver::traits::{AssignmentPage, DirectoryService, RoleAssignmentSource};

pub fn guid(n: u8) -> String {
    format!("00000000-0000-0000-0000-0000000000{n:02x}")
}

pub fn user(object_id: &str) -> Identity {
    Identity {
        object_id: object_id.to_string(),
        kind: IdentityKind::User,
        display_name: "Test User".to_string(),
        email: Some("user@example.test".to_string()),
        application_id: None,
    }
}

pub fn assignment(id: &str, principal_id: &str, role: &str) -> RoleAssignmentRecord {
    RoleAssignmentRecord {
        id: id.to_string(),
        principal_id: principal_id.to_string(),
        principal_type: "Group".to_string(),
        role_definition_id: format!("rd-{role}"),
        role_name: role.to_string(),
        scope: "/subscriptions/sub-1".to_string(),
    }
}

/// Scriptable directory backed by an in-memory membership graph.
#[derive(Default)]
pub struct MockDirectory {
    memberships: HashMap<String, Vec<String>>,
    groups: HashMap<String, GroupNode>,
    /// Number of transient failures to serve before a group lookup
    /// succeeds.
    transient_failures: Mutex<HashMap<String, u32>>,
    /// Group ids whose lookup always fails permanently.
    broken_groups: Vec<String>,
    /// Simulated per-lookup latency, to give parallel workers overlap.
    latency: Option<Duration>,
    pub membership_calls: AtomicUsize,
    pub group_calls: Mutex<HashMap<String, usize>>,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_membership(mut self, object_id: &str, group_ids: &[&str]) -> Self {
        self.memberships.insert(
            object_id.to_string(),
            group_ids.iter().map(|g| g.to_string()).collect(),
        );
        self
    }

    pub fn with_group(mut self, id: &str, parent_ids: &[&str]) -> Self {
        self.groups.insert(
            id.to_string(),
            GroupNode {
                id: id.to_string(),
                display_name: format!("Group {id}"),
                description: None,
                parent_ids: parent_ids.iter().map(|p| p.to_string()).collect(),
            },
        );
        self
    }

    pub fn fail_group_transiently(self, id: &str, times: u32) -> Self {
        self.transient_failures
            .lock()
            .unwrap()
            .insert(id.to_string(), times);
        self
    }

    pub fn break_group(mut self, id: &str) -> Self {
        self.broken_groups.push(id.to_string());
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn group_call_count(&self, id: &str) -> usize {
        self.group_calls
            .lock()
            .unwrap()
            .get(id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl DirectoryService for MockDirectory {
    async fn direct_memberships(&self, identity: &Identity) -> Result<Vec<String>> {
        self.membership_calls.fetch_add(1, Ordering::SeqCst);
        match self.memberships.get(&identity.object_id) {
            Some(groups) => Ok(groups.clone()),
            None => Err(AccessError::UnresolvableIdentity {
                object_id: identity.object_id.clone(),
            }),
        }
    }

    async fn group_info(&self, group_id: &str) -> Result<GroupNode> {
        *self
            .group_calls
            .lock()
            .unwrap()
            .entry(group_id.to_string())
            .or_insert(0) += 1;

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.broken_groups.iter().any(|g| g == group_id) {
            return Err(AccessError::Api {
                code: "Request_ResourceNotFound".to_string(),
                message: format!("group {group_id} not found"),
            });
        }

        {
            let mut failures = self.transient_failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(group_id) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(AccessError::transient("simulated directory blip"));
                }
            }
        }

        self.groups
            .get(group_id)
            .cloned()
            .ok_or_else(|| AccessError::Api {
                code: "Request_ResourceNotFound".to_string(),
                message: format!("group {group_id} not found"),
            })
    }
}

/// Assignment source serving fixed-size pages from an in-memory list,
/// optionally prefixed by scripted errors.
pub struct MockAssignmentSource {
    assignments: Vec<RoleAssignmentRecord>,
    page_size: usize,
    scripted_errors: Mutex<VecDeque<AccessError>>,
    pub calls: AtomicUsize,
    /// Clock readings at each successful page served, for asserting
    /// throttle gating.
    pub success_times: Mutex<Vec<tokio::time::Instant>>,
}

impl MockAssignmentSource {
    pub fn new(assignments: Vec<RoleAssignmentRecord>, page_size: usize) -> Self {
        Self {
            assignments,
            page_size,
            scripted_errors: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            success_times: Mutex::new(Vec::new()),
        }
    }

    pub fn with_errors(self, errors: Vec<AccessError>) -> Self {
        *self.scripted_errors.lock().unwrap() = errors.into();
        self
    }
}

#[async_trait]
impl RoleAssignmentSource for MockAssignmentSource {
    async fn query_page(
        &self,
        principal_ids: &[String],
        continuation: Option<&str>,
    ) -> Result<AssignmentPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(err) = self.scripted_errors.lock().unwrap().pop_front() {
            return Err(err);
        }

        let matching: Vec<RoleAssignmentRecord> = self
            .assignments
            .iter()
            .filter(|a| principal_ids.iter().any(|p| *p == a.principal_id))
            .cloned()
            .collect();

        let offset: usize = match continuation {
            Some(token) => token.parse().map_err(|_| AccessError::Api {
                code: "InvalidSkipToken".to_string(),
                message: format!("bad continuation token: {token}"),
            })?,
            None => 0,
        };

        let page: Vec<RoleAssignmentRecord> = matching
            .iter()
            .skip(offset)
            .take(self.page_size)
            .cloned()
            .collect();
        let next = offset + page.len();
        let continuation = (next < matching.len()).then(|| next.to_string());

        self.success_times
            .lock()
            .unwrap()
            .push(tokio::time::Instant::now());

        Ok(AssignmentPage {
            records: page,
            continuation,
        })
    }
}
