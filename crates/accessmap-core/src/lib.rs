//! accessmap Core Library
//!
//! Shared types for effective-access resolution: identities, group nodes,
//! role-assignment records, and the error taxonomy used across the
//! resolver and its collaborator implementations.
//!
//! # Modules
//!
//! - [`types`] - Value types (Identity, GroupNode, RoleAssignmentRecord, views)
//! - [`error`] - Standardized error type (`AccessError`) with transient
//!   classification for retry logic

pub mod error;
pub mod types;

// Re-export main types for convenient access
pub use error::{AccessError, Result};
pub use types::{
    EffectiveAccessReport, GroupNode, Identity, IdentityKind, ResolvedGroupSet,
    RoleAssignmentRecord, SecurityGroupView,
};
