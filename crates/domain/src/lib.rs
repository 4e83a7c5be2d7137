//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod assignment;
mod audit;
mod filter;
mod hierarchy;
mod matrix;
mod permission;
mod registry;
mod role;
mod scope;
mod team;

pub use assignment::{AssignmentId, RoleAssignment, ValidityWindow};
pub use audit::AuditAction;
pub use filter::FilterSpec;
pub use hierarchy::{RoleDeletePolicy, RoleRemoval, RoleTree};
pub use matrix::{ClampedEntry, MatrixUpdate, PermissionMatrix};
pub use permission::{Capability, PermissionDecision, PermissionEntry, PermissionGrant};
pub use registry::{PermissionRegistry, ResourceDefinition};
pub use role::{Role, RoleDraft, RoleId};
pub use scope::Scope;
pub use team::{TeamLink, derive_team_links, derive_team_links_for_subjects};
