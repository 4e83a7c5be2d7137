use std::collections::BTreeSet;

use async_trait::async_trait;
use rolegraph_core::{AppResult, TenantId};
use rolegraph_domain::{
    AssignmentId, Capability, PermissionEntry, Role, RoleAssignment, RoleId, TeamLink,
};

/// Repository port for reading tenant roles.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Lists every role of the tenant.
    async fn list_roles(&self, tenant_id: TenantId) -> AppResult<Vec<Role>>;

    /// Finds one role of the tenant.
    async fn find_role(&self, tenant_id: TenantId, role_id: RoleId) -> AppResult<Option<Role>>;

    /// Returns the tenant owning a role id, across all tenants.
    async fn locate_role(&self, role_id: RoleId) -> AppResult<Option<TenantId>>;
}

/// Repository port for reading permission matrix rows.
#[async_trait]
pub trait PermissionEntryRepository: Send + Sync {
    /// Lists every matrix row of the tenant.
    async fn list_entries(&self, tenant_id: TenantId) -> AppResult<Vec<PermissionEntry>>;

    /// Lists matrix rows of one role.
    async fn list_entries_for_role(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
    ) -> AppResult<Vec<PermissionEntry>>;

    /// Lists rows of one capability across a role set.
    async fn list_entries_for_roles(
        &self,
        tenant_id: TenantId,
        role_ids: &[RoleId],
        capability: &Capability,
    ) -> AppResult<Vec<PermissionEntry>>;
}

/// Repository port for reading role assignments.
#[async_trait]
pub trait RoleAssignmentRepository: Send + Sync {
    /// Lists every assignment of the tenant.
    async fn list_assignments(&self, tenant_id: TenantId) -> AppResult<Vec<RoleAssignment>>;

    /// Lists assignments of one subject, active or not.
    async fn list_assignments_for_subject(
        &self,
        tenant_id: TenantId,
        subject: &str,
    ) -> AppResult<Vec<RoleAssignment>>;

    /// Finds one assignment.
    async fn find_assignment(
        &self,
        tenant_id: TenantId,
        assignment_id: AssignmentId,
    ) -> AppResult<Option<RoleAssignment>>;
}

/// Repository port for reading derived team links.
#[async_trait]
pub trait TeamLinkRepository: Send + Sync {
    /// Lists every team link of the tenant.
    async fn list_team_links(&self, tenant_id: TenantId) -> AppResult<Vec<TeamLink>>;
}

/// Replacement of derived team links carried by a change set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TeamLinkReplacement {
    /// Team links stay as they are.
    #[default]
    Unchanged,
    /// Every link whose leader or member is one of the subjects is replaced by `links`.
    Subjects {
        /// Subjects whose links are replaced.
        subjects: BTreeSet<String>,
        /// New links; each involves at least one of the subjects.
        links: BTreeSet<TeamLink>,
    },
    /// Every link of the tenant is replaced by `links`.
    Tenant {
        /// New links.
        links: BTreeSet<TeamLink>,
    },
}

/// All writes of one mutation, committed together or not at all.
///
/// Stores apply the parts in this order: role upserts (parents first), assignment
/// deletes and upserts, entry deletes and upserts, role deletes (leaves first), then
/// the team link replacement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TenantChangeSet {
    /// Roles to insert or overwrite.
    pub upsert_roles: Vec<Role>,
    /// Roles to delete.
    pub delete_roles: Vec<RoleId>,
    /// Matrix rows to insert or overwrite.
    pub upsert_entries: Vec<PermissionEntry>,
    /// Matrix rows to delete.
    pub delete_entries: Vec<(RoleId, Capability)>,
    /// Assignments to insert or overwrite.
    pub upsert_assignments: Vec<RoleAssignment>,
    /// Assignments to delete.
    pub delete_assignments: Vec<AssignmentId>,
    /// Derived team link replacement.
    pub team_links: TeamLinkReplacement,
}

impl TenantChangeSet {
    /// Returns whether the change set writes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.upsert_roles.is_empty()
            && self.delete_roles.is_empty()
            && self.upsert_entries.is_empty()
            && self.delete_entries.is_empty()
            && self.upsert_assignments.is_empty()
            && self.delete_assignments.is_empty()
            && self.team_links == TeamLinkReplacement::Unchanged
    }
}

/// Port for committing a mutation atomically.
///
/// Readers must observe either none or all of a change set.
#[async_trait]
pub trait AuthorizationChangeRepository: Send + Sync {
    /// Commits every part of the change set in one unit.
    async fn apply_changes(&self, tenant_id: TenantId, changes: TenantChangeSet) -> AppResult<()>;
}

/// Complete storage surface used by the engine.
pub trait AuthorizationStore:
    RoleRepository
    + PermissionEntryRepository
    + RoleAssignmentRepository
    + TeamLinkRepository
    + AuthorizationChangeRepository
{
}

impl<T> AuthorizationStore for T where
    T: RoleRepository
        + PermissionEntryRepository
        + RoleAssignmentRepository
        + TeamLinkRepository
        + AuthorizationChangeRepository
{
}
