mod audit;
mod cache;
mod store;

pub use audit::{AuditEvent, AuditLogEntry, AuditLogQuery, AuditLogRepository, AuditRepository};
pub use cache::{PermissionCache, PermissionCacheKey};
pub use store::{
    AuthorizationChangeRepository, AuthorizationStore, PermissionEntryRepository,
    RoleAssignmentRepository, RoleRepository, TeamLinkReplacement, TeamLinkRepository,
    TenantChangeSet,
};
