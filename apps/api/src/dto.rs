mod access;
mod assignments;
mod audit;
mod health;
mod permissions;
mod roles;
mod team_links;

pub use access::{
    AccessDecisionResponse, CheckAccessRequest, RecordFilterResponse, ResolveScopeRequest,
    TeamMembersQuery, TeamMembersResponse,
};
pub use assignments::{
    ActiveRolesQuery, ActiveRolesResponse, AssignRoleRequest, AssignmentListQuery,
    RoleAssignmentResponse, UpdateAssignmentValidityRequest,
};
pub use audit::{AuditLogEntryResponse, AuditLogQueryParams};
pub use health::{HealthDependencyStatus, HealthResponse};
pub use permissions::{
    EffectivePermissionRequest, PermissionEntryResponse, PermissionGrantResponse,
    PermissionRegistryResponse, SetPermissionEntryRequest,
};
pub use roles::{
    CreateRoleRequest, DeleteRoleQuery, ReparentRoleRequest, RoleDeletionResponse,
    RoleLineageQuery, RoleResponse, UpdateRoleRequest,
};
pub use team_links::{TeamLinkRebuildResponse, TeamLinkResponse};
