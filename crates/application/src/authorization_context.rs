use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rolegraph_core::{AppError, AppResult, Principal, TenantId};
use rolegraph_domain::{
    AuditAction, ClampedEntry, PermissionMatrix, PermissionRegistry, RoleAssignment, RoleId,
    RoleTree, derive_team_links_for_subjects,
};
use tracing::{info, warn};

use crate::tenant_locks::TenantLocks;
use crate::{
    AuditEvent, AuditRepository, AuthorizationStore, PermissionCache, TeamLinkReplacement,
    TenantChangeSet,
};

/// Shared adapters and process state the authorization services work on.
#[derive(Clone)]
pub struct AuthorizationContext {
    store: Arc<dyn AuthorizationStore>,
    cache: Arc<dyn PermissionCache>,
    audit_repository: Arc<dyn AuditRepository>,
    registry: Arc<PermissionRegistry>,
    locks: TenantLocks,
}

impl AuthorizationContext {
    /// Creates a context with a fresh tenant lock table.
    #[must_use]
    pub fn new(
        store: Arc<dyn AuthorizationStore>,
        cache: Arc<dyn PermissionCache>,
        audit_repository: Arc<dyn AuditRepository>,
        registry: Arc<PermissionRegistry>,
    ) -> Self {
        Self {
            store,
            cache,
            audit_repository,
            registry,
            locks: TenantLocks::new(),
        }
    }

    /// Returns the permission registry.
    #[must_use]
    pub fn registry(&self) -> &PermissionRegistry {
        self.registry.as_ref()
    }

    pub(crate) fn store(&self) -> &dyn AuthorizationStore {
        self.store.as_ref()
    }

    pub(crate) fn cache(&self) -> &dyn PermissionCache {
        self.cache.as_ref()
    }

    pub(crate) fn audit_repository(&self) -> &dyn AuditRepository {
        self.audit_repository.as_ref()
    }

    pub(crate) fn locks(&self) -> &TenantLocks {
        &self.locks
    }

    /// Loads every role, matrix row and assignment of a tenant.
    pub(crate) async fn load_snapshot(&self, tenant_id: TenantId) -> AppResult<TenantSnapshot> {
        let roles = self.store.list_roles(tenant_id).await?;
        let entries = self.store.list_entries(tenant_id).await?;
        let assignments = self.store.list_assignments(tenant_id).await?;

        Ok(TenantSnapshot {
            tree: RoleTree::from_roles(tenant_id, roles)?,
            matrix: PermissionMatrix::from_entries(tenant_id, entries)?,
            assignments,
        })
    }

    /// Commits a mutation, invalidates cached decisions, then records audit events.
    ///
    /// Callers hold the tenant write lock.
    pub(crate) async fn commit(&self, tenant_id: TenantId, mutation: Mutation) -> AppResult<()> {
        let Mutation {
            changes,
            invalidated_roles,
            events,
        } = mutation;

        if !changes.is_empty() {
            self.store.apply_changes(tenant_id, changes).await?;
        }

        if !invalidated_roles.is_empty() {
            let role_ids: Vec<RoleId> = invalidated_roles.into_iter().collect();
            self.invalidate(tenant_id, &role_ids).await?;
        }

        for event in events {
            info!(
                tenant_id = %tenant_id,
                action = event.action.as_str(),
                resource_id = %event.resource_id,
                "authorization state changed"
            );
            self.audit_repository.append_event(event).await?;
        }

        Ok(())
    }

    async fn invalidate(&self, tenant_id: TenantId, role_ids: &[RoleId]) -> AppResult<()> {
        let Err(error) = self.cache.invalidate_roles(tenant_id, role_ids).await else {
            return Ok(());
        };

        warn!(
            tenant_id = %tenant_id,
            roles = role_ids.len(),
            error = %error,
            "role cache invalidation failed, flushing tenant"
        );

        self.cache
            .invalidate_tenant(tenant_id)
            .await
            .map_err(|tenant_error| {
                AppError::Internal(format!(
                    "permission cache invalidation failed for tenant '{tenant_id}': {error}; tenant flush failed: {tenant_error}"
                ))
            })
    }
}

/// One consistent read of a tenant's authorization state.
#[derive(Debug, Clone)]
pub(crate) struct TenantSnapshot {
    pub(crate) tree: RoleTree,
    pub(crate) matrix: PermissionMatrix,
    pub(crate) assignments: Vec<RoleAssignment>,
}

impl TenantSnapshot {
    /// Returns the subjects holding any of the roles, active or not.
    pub(crate) fn holders_of(&self, role_ids: &BTreeSet<RoleId>) -> BTreeSet<String> {
        self.assignments
            .iter()
            .filter(|assignment| role_ids.contains(&assignment.role_id()))
            .map(|assignment| assignment.subject().to_owned())
            .collect()
    }

    /// Recomputes the team links of the subjects from the current state.
    pub(crate) fn team_links_for(
        &self,
        subjects: BTreeSet<String>,
        now: DateTime<Utc>,
    ) -> TeamLinkReplacement {
        if subjects.is_empty() {
            return TeamLinkReplacement::Unchanged;
        }

        let links = derive_team_links_for_subjects(
            &self.tree,
            &self.matrix,
            &self.assignments,
            now,
            &subjects,
        );

        TeamLinkReplacement::Subjects { subjects, links }
    }

    /// Returns the members a leader sees for a resource from assignments active at `now`.
    pub(crate) fn team_members_of(
        &self,
        leader_subject: &str,
        resource: &str,
        now: DateTime<Utc>,
    ) -> BTreeSet<String> {
        let subjects = BTreeSet::from([leader_subject.to_owned()]);

        derive_team_links_for_subjects(
            &self.tree,
            &self.matrix,
            &self.assignments,
            now,
            &subjects,
        )
        .into_iter()
        .filter(|link| link.leader_subject == leader_subject && link.resource == resource)
        .map(|link| link.member_subject)
        .collect()
    }
}

/// Writes, invalidations and audit events of one mutation.
#[derive(Debug, Default)]
pub(crate) struct Mutation {
    pub(crate) changes: TenantChangeSet,
    pub(crate) invalidated_roles: BTreeSet<RoleId>,
    pub(crate) events: Vec<AuditEvent>,
}

/// Builds an audit event attributed to the actor.
pub(crate) fn audit_event(
    actor: &Principal,
    action: AuditAction,
    resource_type: &str,
    resource_id: impl Into<String>,
    detail: String,
) -> AuditEvent {
    AuditEvent {
        tenant_id: actor.tenant_id(),
        subject: actor.subject().to_owned(),
        action,
        resource_type: resource_type.to_owned(),
        resource_id: resource_id.into(),
        detail: Some(detail),
    }
}

/// Builds one audit event per automatically narrowed entry.
pub(crate) fn clamp_events(actor: &Principal, clamped: &[ClampedEntry]) -> Vec<AuditEvent> {
    clamped
        .iter()
        .map(|clamped| {
            audit_event(
                actor,
                AuditAction::PermissionEntryClamped,
                "permission_entry",
                format!("{}:{}", clamped.entry.role_id, clamped.entry.capability),
                format!(
                    "narrowed '{}' on role '{}' from '{}' to '{}' set by ancestor '{}'",
                    clamped.entry.capability,
                    clamped.entry.role_id,
                    clamped.previous_scope,
                    clamped.entry.grant.scope,
                    clamped.ceiling_role_id
                ),
            )
        })
        .collect()
}
