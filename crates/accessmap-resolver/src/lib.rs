//! Effective-access resolution core.
//!
//! Given an identity's direct security-group memberships, this crate
//! expands them into the full transitive closure over "member of" edges
//! (cycle-safe, sequential or parallel), fetches role assignments for
//! the identity and every resolved group through a rate-limit-aware
//! paginated query client, and assembles the result into per-identity
//! group trees with assignments attached.
//!
//! Collaborators (the directory service and the authorization query
//! service) are injected through the traits in [`traits`]; HTTP
//! implementations live in the `accessmap-entra` crate.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use accessmap_core::{Identity, IdentityKind};
//! use accessmap_resolver::{AccessResolver, ResolverConfig, ThrottleCoordinator};
//! use tokio_util::sync::CancellationToken;
//!
//! # use accessmap_resolver::traits::{DirectoryService, RoleAssignmentSource};
//! # async fn example<D, S>(directory: Arc<D>, source: Arc<S>)
//! # -> accessmap_core::Result<()>
//! # where D: DirectoryService + 'static, S: RoleAssignmentSource + 'static {
//! let throttle = Arc::new(ThrottleCoordinator::new());
//! let resolver = AccessResolver::new(directory, source, throttle, ResolverConfig::default())?;
//!
//! let identity = Identity {
//!     object_id: "7c9e6679-7425-40de-944b-e07fc1f90ae7".to_string(),
//!     kind: IdentityKind::User,
//!     display_name: "Avery Reed".to_string(),
//!     email: None,
//!     application_id: None,
//! };
//! let report = resolver.resolve(&identity, &CancellationToken::new()).await?;
//! println!("{} direct groups", report.direct_groups.len());
//! # Ok(())
//! # }
//! ```

mod assembler;
mod assignments;
mod config;
mod hierarchy;
mod resolution;
mod retry;
mod throttle;
pub mod traits;

// Re-exports
pub use assembler::build_views;
pub use assignments::RoleAssignmentQueryClient;
pub use config::{NodeFailurePolicy, ResolutionMode, ResolverConfig, RetryConfig};
pub use hierarchy::GroupHierarchyResolver;
pub use resolution::{AccessResolver, ResolutionPhase};
pub use throttle::ThrottleCoordinator;
pub use traits::{AssignmentPage, DirectoryService, RoleAssignmentSource};
