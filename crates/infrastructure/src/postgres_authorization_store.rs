use std::collections::BTreeSet;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::debug;

use rolegraph_application::{
    AuthorizationChangeRepository, PermissionEntryRepository, RoleAssignmentRepository,
    RoleRepository, TeamLinkReplacement, TeamLinkRepository, TenantChangeSet,
};
use rolegraph_core::{AppError, AppResult, TenantId};
use rolegraph_domain::{
    AssignmentId, Capability, PermissionEntry, PermissionGrant, Role, RoleAssignment, RoleId,
    Scope, TeamLink,
};

mod assignments;
mod changes;
mod entries;
mod roles;
mod team_links;

/// PostgreSQL-backed authorization store.
///
/// Change sets run in one transaction holding a tenant advisory lock, which
/// serializes writers of a tenant across processes.
#[derive(Clone)]
pub struct PostgresAuthorizationStore {
    pool: PgPool,
}

impl PostgresAuthorizationStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: uuid::Uuid,
    tenant_id: uuid::Uuid,
    name: String,
    code: String,
    parent_id: Option<uuid::Uuid>,
    level: i32,
    is_position: bool,
    display_order: i32,
}

impl RoleRow {
    fn into_role(self) -> AppResult<Role> {
        let level = u32::try_from(self.level).map_err(|error| {
            AppError::Internal(format!("invalid level for role '{}': {error}", self.id))
        })?;

        Role::restore(
            RoleId::from_uuid(self.id),
            TenantId::from_uuid(self.tenant_id),
            self.name,
            self.code,
            self.parent_id.map(RoleId::from_uuid),
            level,
            self.is_position,
            self.display_order,
        )
    }
}

#[derive(Debug, FromRow)]
struct EntryRow {
    tenant_id: uuid::Uuid,
    role_id: uuid::Uuid,
    resource: String,
    action: String,
    enabled: bool,
    scope: String,
}

impl EntryRow {
    fn into_entry(self) -> AppResult<PermissionEntry> {
        let scope = Scope::from_str(self.scope.as_str()).map_err(|error| {
            AppError::Internal(format!(
                "invalid stored scope for role '{}': {error}",
                self.role_id
            ))
        })?;

        Ok(PermissionEntry {
            tenant_id: TenantId::from_uuid(self.tenant_id),
            role_id: RoleId::from_uuid(self.role_id),
            capability: Capability::new(self.resource, self.action),
            grant: PermissionGrant::new(self.enabled, scope),
        })
    }
}

#[derive(Debug, FromRow)]
struct AssignmentRow {
    id: uuid::Uuid,
    tenant_id: uuid::Uuid,
    subject: String,
    role_id: uuid::Uuid,
    valid_from: Option<DateTime<Utc>>,
    valid_until: Option<DateTime<Utc>>,
    assigned_by: String,
    assigned_at: DateTime<Utc>,
}

impl AssignmentRow {
    fn into_assignment(self) -> AppResult<RoleAssignment> {
        RoleAssignment::restore(
            AssignmentId::from_uuid(self.id),
            TenantId::from_uuid(self.tenant_id),
            self.subject,
            RoleId::from_uuid(self.role_id),
            self.valid_from,
            self.valid_until,
            self.assigned_by,
            self.assigned_at,
        )
    }
}

#[derive(Debug, FromRow)]
struct TeamLinkRow {
    leader_subject: String,
    member_subject: String,
    resource: String,
}

fn role_uuids(role_ids: &[RoleId]) -> Vec<uuid::Uuid> {
    role_ids.iter().map(RoleId::as_uuid).collect()
}

#[async_trait]
impl RoleRepository for PostgresAuthorizationStore {
    async fn list_roles(&self, tenant_id: TenantId) -> AppResult<Vec<Role>> {
        self.list_roles_impl(tenant_id).await
    }

    async fn find_role(&self, tenant_id: TenantId, role_id: RoleId) -> AppResult<Option<Role>> {
        self.find_role_impl(tenant_id, role_id).await
    }

    async fn locate_role(&self, role_id: RoleId) -> AppResult<Option<TenantId>> {
        self.locate_role_impl(role_id).await
    }
}

#[async_trait]
impl PermissionEntryRepository for PostgresAuthorizationStore {
    async fn list_entries(&self, tenant_id: TenantId) -> AppResult<Vec<PermissionEntry>> {
        self.list_entries_impl(tenant_id, None).await
    }

    async fn list_entries_for_role(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
    ) -> AppResult<Vec<PermissionEntry>> {
        self.list_entries_impl(tenant_id, Some(role_id)).await
    }

    async fn list_entries_for_roles(
        &self,
        tenant_id: TenantId,
        role_ids: &[RoleId],
        capability: &Capability,
    ) -> AppResult<Vec<PermissionEntry>> {
        self.list_entries_for_roles_impl(tenant_id, role_ids, capability)
            .await
    }
}

#[async_trait]
impl RoleAssignmentRepository for PostgresAuthorizationStore {
    async fn list_assignments(&self, tenant_id: TenantId) -> AppResult<Vec<RoleAssignment>> {
        self.list_assignments_impl(tenant_id, None).await
    }

    async fn list_assignments_for_subject(
        &self,
        tenant_id: TenantId,
        subject: &str,
    ) -> AppResult<Vec<RoleAssignment>> {
        self.list_assignments_impl(tenant_id, Some(subject)).await
    }

    async fn find_assignment(
        &self,
        tenant_id: TenantId,
        assignment_id: AssignmentId,
    ) -> AppResult<Option<RoleAssignment>> {
        self.find_assignment_impl(tenant_id, assignment_id).await
    }
}

#[async_trait]
impl TeamLinkRepository for PostgresAuthorizationStore {
    async fn list_team_links(&self, tenant_id: TenantId) -> AppResult<Vec<TeamLink>> {
        self.list_team_links_impl(tenant_id).await
    }
}

#[async_trait]
impl AuthorizationChangeRepository for PostgresAuthorizationStore {
    async fn apply_changes(&self, tenant_id: TenantId, changes: TenantChangeSet) -> AppResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        lock_tenant(&mut transaction, tenant_id).await?;
        changes::apply_change_set(&mut transaction, tenant_id, changes).await?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;
        debug!(tenant_id = %tenant_id, "authorization change set committed");

        Ok(())
    }
}

async fn lock_tenant(
    transaction: &mut Transaction<'_, Postgres>,
    tenant_id: TenantId,
) -> AppResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::TEXT, 0))")
        .bind(tenant_id.to_string())
        .execute(&mut **transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to lock tenant '{tenant_id}' for authorization changes: {error}"
            ))
        })?;

    Ok(())
}
