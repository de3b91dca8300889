//! Transitive security-group resolution.
//!
//! Breadth-first expansion over the "member of" edge (group to its
//! parents). Every dequeued id is claimed through an insert-if-absent
//! into the run's visited set; a failed claim skips the id, which is
//! what guarantees termination on cyclic graphs and at most one
//! directory fetch per group.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use accessmap_core::{AccessError, GroupNode, ResolvedGroupSet, Result};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::config::{NodeFailurePolicy, ResolutionMode, ResolverConfig, RetryConfig};
use crate::retry::with_retry;
use crate::traits::DirectoryService;

/// Expands direct group memberships into the full transitive closure.
#[derive(Debug)]
pub struct GroupHierarchyResolver<D> {
    directory: Arc<D>,
    config: ResolverConfig,
}

/// Discovery queue plus claim state, behind one lock so that claiming a
/// node and counting it in-flight are a single atomic step.
struct Frontier {
    queue: VecDeque<String>,
    visited: HashSet<String>,
    in_flight: usize,
}

enum Claim {
    /// Successfully claimed this id; the claimer owns its fetch.
    Node(String),
    /// Queue is empty but siblings may still enqueue new work.
    Pending,
    /// Queue is empty and nothing is in flight: the run is complete.
    Drained,
}

/// Shared state for one resolution run. Scoped per run: a cancelled or
/// failed run leaves nothing behind for a retry to reuse.
struct RunState<D> {
    directory: Arc<D>,
    retry: RetryConfig,
    policy: NodeFailurePolicy,
    frontier: Mutex<Frontier>,
    info: Mutex<HashMap<String, GroupNode>>,
    failed: Mutex<Vec<String>>,
    notify: Notify,
    cancel: CancellationToken,
}

impl<D: DirectoryService + 'static> GroupHierarchyResolver<D> {
    /// Creates a resolver over the given directory.
    pub fn new(directory: Arc<D>, config: ResolverConfig) -> Result<Self> {
        config.validate().map_err(AccessError::Config)?;
        Ok(Self { directory, config })
    }

    /// Resolves the transitive closure of the given direct group ids.
    ///
    /// Duplicate direct ids are deduplicated before seeding. The
    /// returned `transitive_group_ids` excludes the direct set; both
    /// sets have entries in `group_info`. Sequential and parallel modes
    /// produce identical sets.
    #[instrument(
        skip(self, direct_group_ids, cancel),
        fields(direct_count = direct_group_ids.len(), mode = ?self.config.mode)
    )]
    pub async fn resolve_transitive_groups(
        &self,
        direct_group_ids: &[String],
        cancel: &CancellationToken,
    ) -> Result<ResolvedGroupSet> {
        let mut seen = HashSet::new();
        let direct: Vec<String> = direct_group_ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();

        if direct.is_empty() {
            return Ok(ResolvedGroupSet::default());
        }

        let state = Arc::new(RunState {
            directory: Arc::clone(&self.directory),
            retry: self.config.retry.clone(),
            policy: self.config.failure_policy,
            frontier: Mutex::new(Frontier {
                queue: direct.iter().cloned().collect(),
                visited: HashSet::new(),
                in_flight: 0,
            }),
            info: Mutex::new(HashMap::new()),
            failed: Mutex::new(Vec::new()),
            notify: Notify::new(),
            cancel: cancel.child_token(),
        });

        match self.config.mode {
            ResolutionMode::Sequential => worker(Arc::clone(&state)).await?,
            ResolutionMode::Parallel => {
                let mut workers = JoinSet::new();
                for _ in 0..self.config.worker_count {
                    workers.spawn(worker(Arc::clone(&state)));
                }

                let mut failure: Option<AccessError> = None;
                while let Some(joined) = workers.join_next().await {
                    match joined {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            // Keep the root cause over the Aborted of
                            // siblings it cancelled.
                            let replace = match (&failure, &e) {
                                (None, _) => true,
                                (Some(AccessError::Aborted), other) => {
                                    !matches!(other, AccessError::Aborted)
                                }
                                _ => false,
                            };
                            if replace {
                                failure = Some(e);
                            }
                        }
                        Err(join_err) => {
                            failure.get_or_insert(AccessError::transient(format!(
                                "resolver worker panicked: {join_err}"
                            )));
                        }
                    }
                }
                if let Some(e) = failure {
                    return Err(e);
                }
            }
        }

        let group_info = std::mem::take(&mut *state.info.lock().await);
        let failed_group_ids = std::mem::take(&mut *state.failed.lock().await);
        let visited = std::mem::take(&mut state.frontier.lock().await.visited);

        let direct_set: HashSet<&str> = direct.iter().map(String::as_str).collect();
        let transitive_group_ids: HashSet<String> = visited
            .into_iter()
            .filter(|id| !direct_set.contains(id.as_str()))
            .collect();

        debug!(
            direct = direct.len(),
            transitive = transitive_group_ids.len(),
            failed = failed_group_ids.len(),
            "transitive closure resolved"
        );

        Ok(ResolvedGroupSet {
            direct_group_ids: direct,
            transitive_group_ids,
            group_info,
            failed_group_ids,
        })
    }
}

/// One drain loop. Sequential mode runs a single instance inline;
/// parallel mode spawns a fixed pool of them over the same state.
async fn worker<D: DirectoryService + 'static>(state: Arc<RunState<D>>) -> Result<()> {
    loop {
        // Register for wakeups before checking the queue, so a
        // completion that lands between the claim and the wait still
        // wakes this worker.
        let notified = state.notify.notified();

        if state.cancel.is_cancelled() {
            return Err(AccessError::Aborted);
        }

        match state.claim_next().await {
            Claim::Node(id) => state.process(&id).await?,
            Claim::Drained => {
                state.notify.notify_waiters();
                return Ok(());
            }
            Claim::Pending => {
                tokio::select! {
                    () = notified => {}
                    () = state.cancel.cancelled() => return Err(AccessError::Aborted),
                }
            }
        }
    }
}

impl<D: DirectoryService + 'static> RunState<D> {
    /// Pops ids until one is successfully claimed (inserted into the
    /// visited set). Claiming and the in-flight increment happen under
    /// the same lock, so a sibling seeing an empty queue can trust the
    /// in-flight count.
    async fn claim_next(&self) -> Claim {
        let mut frontier = self.frontier.lock().await;
        while let Some(id) = frontier.queue.pop_front() {
            if frontier.visited.insert(id.clone()) {
                frontier.in_flight += 1;
                return Claim::Node(id);
            }
        }
        if frontier.in_flight == 0 {
            Claim::Drained
        } else {
            Claim::Pending
        }
    }

    /// Records the outcome of a claimed fetch: enqueues newly seen
    /// parents and releases the in-flight slot.
    async fn complete(&self, parents: Vec<String>) {
        {
            let mut frontier = self.frontier.lock().await;
            frontier.in_flight -= 1;
            for parent in parents {
                if !frontier.visited.contains(&parent) {
                    frontier.queue.push_back(parent);
                }
            }
        }
        self.notify.notify_waiters();
    }

    async fn process(&self, id: &str) -> Result<()> {
        let fetched = with_retry(&self.retry, &self.cancel, || {
            let directory = Arc::clone(&self.directory);
            let id = id.to_string();
            async move { directory.group_info(&id).await }
        })
        .await;

        match fetched {
            Ok(node) => {
                debug!(group_id = %id, parents = node.parent_ids.len(), "group resolved");
                let parents = node.parent_ids.clone();
                // Keyed by the claimed id: each id is populated at most once.
                self.info.lock().await.insert(id.to_string(), node);
                self.complete(parents).await;
                Ok(())
            }
            Err(AccessError::Aborted) => {
                self.complete(Vec::new()).await;
                Err(AccessError::Aborted)
            }
            Err(e) => match self.policy {
                NodeFailurePolicy::TreatAsLeaf => {
                    warn!(group_id = %id, error = %e, "recording unresolvable group as leaf");
                    self.info
                        .lock()
                        .await
                        .insert(id.to_string(), GroupNode::unresolved_leaf(id));
                    self.failed.lock().await.push(id.to_string());
                    self.complete(Vec::new()).await;
                    Ok(())
                }
                NodeFailurePolicy::FailResolution => {
                    self.complete(Vec::new()).await;
                    // Stop siblings; the run is failing.
                    self.cancel.cancel();
                    Err(e)
                }
            },
        }
    }
}
