//! End-to-end effective-access resolution.
//!
//! Drives one run through its phases: direct memberships, transitive
//! closure, role-assignment retrieval, and tree assembly. A failure in
//! any phase is wrapped in [`AccessError::ResolutionFailed`] carrying
//! the phase name and the group counts reached so far; cancellation
//! propagates as [`AccessError::Aborted`] unwrapped.

use std::fmt;
use std::sync::Arc;

use accessmap_core::{AccessError, EffectiveAccessReport, Identity, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::assembler::build_views;
use crate::assignments::RoleAssignmentQueryClient;
use crate::config::{ResolverConfig, RetryConfig};
use crate::hierarchy::GroupHierarchyResolver;
use crate::retry::with_retry;
use crate::throttle::ThrottleCoordinator;
use crate::traits::{DirectoryService, RoleAssignmentSource};

/// Phase of a resolution run, used in logs and failure reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionPhase {
    Idle,
    ResolvingDirectGroups,
    ResolvingTransitiveClosure,
    QueryingAssignments,
    Assembling,
    Complete,
    Failed,
}

impl fmt::Display for ResolutionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::ResolvingDirectGroups => "ResolvingDirectGroups",
            Self::ResolvingTransitiveClosure => "ResolvingTransitiveClosure",
            Self::QueryingAssignments => "QueryingAssignments",
            Self::Assembling => "Assembling",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// Resolves an identity's effective access end to end.
///
/// Stateless between runs apart from the shared throttle; safe to call
/// concurrently for different identities.
#[derive(Debug)]
pub struct AccessResolver<D, S> {
    directory: Arc<D>,
    hierarchy: GroupHierarchyResolver<D>,
    assignments: RoleAssignmentQueryClient<S>,
    retry: RetryConfig,
}

impl<D, S> AccessResolver<D, S>
where
    D: DirectoryService + 'static,
    S: RoleAssignmentSource + 'static,
{
    /// Creates a resolver. Fails if the configuration is invalid.
    pub fn new(
        directory: Arc<D>,
        source: Arc<S>,
        throttle: Arc<ThrottleCoordinator>,
        config: ResolverConfig,
    ) -> Result<Self> {
        let retry = config.retry.clone();
        let hierarchy = GroupHierarchyResolver::new(Arc::clone(&directory), config)?;
        let assignments = RoleAssignmentQueryClient::new(source, throttle, retry.clone());
        Ok(Self {
            directory,
            hierarchy,
            assignments,
            retry,
        })
    }

    /// Resolves the identity's effective access report.
    #[instrument(skip(self, identity, cancel), fields(object_id = %identity.object_id, kind = ?identity.kind))]
    pub async fn resolve(
        &self,
        identity: &Identity,
        cancel: &CancellationToken,
    ) -> Result<EffectiveAccessReport> {
        let phase = ResolutionPhase::ResolvingDirectGroups;
        debug!(%phase, "resolving direct memberships");
        let direct = with_retry(&self.retry, cancel, || {
            self.directory.direct_memberships(identity)
        })
        .await
        .map_err(|e| fail(phase, 0, 0, e))?;

        let phase = ResolutionPhase::ResolvingTransitiveClosure;
        debug!(%phase, direct = direct.len(), "expanding group hierarchy");
        let resolved = self
            .hierarchy
            .resolve_transitive_groups(&direct, cancel)
            .await
            .map_err(|e| fail(phase, 0, 0, e))?;

        let resolved_count = resolved
            .group_info
            .len()
            .saturating_sub(resolved.failed_group_ids.len());
        let failed_count = resolved.failed_group_ids.len();

        let phase = ResolutionPhase::QueryingAssignments;
        debug!(
            %phase,
            principals = 1 + resolved.group_info.len(),
            "querying role assignments"
        );
        let mut principal_ids = Vec::with_capacity(1 + resolved.group_info.len());
        principal_ids.push(identity.object_id.clone());
        principal_ids.extend(resolved.direct_group_ids.iter().cloned());
        principal_ids.extend(resolved.transitive_group_ids.iter().cloned());
        let records = self
            .assignments
            .fetch_all(&principal_ids, cancel)
            .await
            .map_err(|e| fail(phase, resolved_count, failed_count, e))?;

        let phase = ResolutionPhase::Assembling;
        debug!(%phase, assignments = records.len(), "assembling report");
        let identity_assignments = records
            .iter()
            .filter(|r| r.principal_id == identity.object_id)
            .cloned()
            .collect();
        let direct_groups = build_views(&resolved, &records);

        info!(
            phase = %ResolutionPhase::Complete,
            direct = resolved.direct_group_ids.len(),
            transitive = resolved.transitive_group_ids.len(),
            failed = failed_count,
            assignments = records.len(),
            "resolution complete"
        );

        Ok(EffectiveAccessReport {
            identity: identity.clone(),
            identity_assignments,
            direct_groups,
            resolved_group_count: resolved_count,
            failed_group_count: failed_count,
        })
    }
}

/// Wraps a phase failure; cancellation passes through untouched so
/// callers can tell an abort from an upstream failure.
fn fail(
    phase: ResolutionPhase,
    resolved_groups: usize,
    failed_groups: usize,
    source: AccessError,
) -> AccessError {
    if matches!(source, AccessError::Aborted) {
        return AccessError::Aborted;
    }
    tracing::warn!(%phase, error = %source, "resolution phase failed");
    AccessError::ResolutionFailed {
        phase: phase.to_string(),
        resolved_groups,
        failed_groups,
        source: Box::new(source),
    }
}
