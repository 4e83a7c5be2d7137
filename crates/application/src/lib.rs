//! Application services and ports.

#![forbid(unsafe_code)]

mod authorization_context;
mod authorization_engine;
mod authorization_ports;
mod hierarchy_service;
mod permission_checker;
mod permission_matrix_service;
mod role_assignment_service;
mod scope_resolver;
mod team_linker;
mod tenant_locks;

#[cfg(test)]
mod test_support;

pub use authorization_context::AuthorizationContext;
pub use authorization_engine::AuthorizationEngine;
pub use authorization_ports::{
    AuditEvent, AuditLogEntry, AuditLogQuery, AuditLogRepository, AuditRepository,
    AuthorizationChangeRepository, AuthorizationStore, PermissionCache, PermissionCacheKey,
    PermissionEntryRepository, RoleAssignmentRepository, RoleRepository, TeamLinkReplacement,
    TeamLinkRepository, TenantChangeSet,
};
pub use hierarchy_service::{HierarchyService, RoleDeletion, UpdateRoleInput};
pub use permission_checker::{PermissionChecker, PermissionCheckerConfig};
pub use permission_matrix_service::{PermissionMatrixService, SetEntryInput};
pub use role_assignment_service::{AssignRoleInput, RoleAssignmentService};
pub use scope_resolver::ScopeResolver;
pub use team_linker::TeamLinker;
pub use tenant_locks::TenantLocks;
