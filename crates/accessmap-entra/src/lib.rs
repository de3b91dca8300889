//! Microsoft Entra ID and Azure RBAC backends for effective-access
//! resolution.
//!
//! Implements the `accessmap-resolver` collaborator traits over the
//! Microsoft Graph API (directory lookups) and the Azure Resource
//! Manager authorization API (role assignments). Retry and throttle
//! policy live in the resolver; this crate authenticates, builds
//! requests, and classifies responses so the resolver can tell a
//! rate-limit signal from a transient or permanent failure.

mod auth;
mod authz;
mod client;
mod config;
mod directory;
mod error;

pub use auth::TokenCache;
pub use authz::ArmRoleAssignments;
pub use client::ApiClient;
pub use config::{CloudEnvironment, EntraConfig, EntraCredentials};
pub use directory::GraphDirectory;
pub use error::{EntraError, EntraResult};
