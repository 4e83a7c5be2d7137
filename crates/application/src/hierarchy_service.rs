use std::collections::BTreeSet;

use chrono::Utc;
use rolegraph_core::{AppError, AppResult, HierarchyViolation, Principal, TenantId};
use rolegraph_domain::{AuditAction, Role, RoleAssignment, RoleDeletePolicy, RoleDraft, RoleId};

use crate::TenantChangeSet;
use crate::authorization_context::{AuthorizationContext, Mutation, audit_event, clamp_events};

/// Input payload for updating descriptive role fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateRoleInput {
    /// New role name.
    pub name: Option<String>,
    /// New position flag.
    pub is_position: Option<bool>,
    /// New sibling ordering hint.
    pub display_order: Option<i32>,
}

/// Summary of a role deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDeletion {
    /// Deleted roles, leaves first.
    pub removed_roles: Vec<RoleId>,
    /// Roles moved under the reassignment target.
    pub moved_roles: Vec<Role>,
    /// Assignments moved to the reassignment target.
    pub reassigned_assignments: usize,
    /// Assignments deleted with their roles.
    pub revoked_assignments: usize,
}

/// Application service owning the tenant role trees.
#[derive(Clone)]
pub struct HierarchyService {
    context: AuthorizationContext,
}

impl HierarchyService {
    /// Creates a new service from the shared context.
    #[must_use]
    pub fn new(context: AuthorizationContext) -> Self {
        Self { context }
    }

    /// Lists tenant roles ordered by level, display order, then name.
    pub async fn list_roles(&self, tenant_id: TenantId) -> AppResult<Vec<Role>> {
        let snapshot = self.context.load_snapshot(tenant_id).await?;
        Ok(snapshot.tree.roles())
    }

    /// Returns one role.
    pub async fn get_role(&self, tenant_id: TenantId, role_id: RoleId) -> AppResult<Role> {
        self.context
            .store()
            .find_role(tenant_id, role_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "role '{role_id}' does not exist in tenant '{tenant_id}'"
                ))
            })
    }

    /// Returns the ancestor chain of a role, root first.
    pub async fn ancestors(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
        include_self: bool,
    ) -> AppResult<Vec<Role>> {
        let snapshot = self.context.load_snapshot(tenant_id).await?;
        snapshot.tree.ancestors(role_id, include_self)
    }

    /// Returns the subtree of a role ordered by level, display order, then name.
    pub async fn descendants(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
        include_self: bool,
    ) -> AppResult<Vec<Role>> {
        let snapshot = self.context.load_snapshot(tenant_id).await?;
        snapshot.tree.descendants(role_id, include_self)
    }

    /// Creates a role under an optional parent of the actor's tenant.
    pub async fn create_role(&self, actor: &Principal, draft: RoleDraft) -> AppResult<Role> {
        let tenant_id = actor.tenant_id();
        let role = Role::from_draft(tenant_id, draft)?;

        let _guard = self.context.locks().write(tenant_id).await;
        let mut snapshot = self.context.load_snapshot(tenant_id).await?;
        let role = snapshot.tree.insert(role)?;

        let mutation = Mutation {
            changes: TenantChangeSet {
                upsert_roles: vec![role.clone()],
                ..Default::default()
            },
            invalidated_roles: BTreeSet::new(),
            events: vec![audit_event(
                actor,
                AuditAction::RoleCreated,
                "role",
                role.role_id().to_string(),
                format!(
                    "created role '{}' ({}) at level {}",
                    role.name(),
                    role.code(),
                    role.level()
                ),
            )],
        };
        self.context.commit(tenant_id, mutation).await?;

        Ok(role)
    }

    /// Updates descriptive fields of a role.
    pub async fn update_role_details(
        &self,
        actor: &Principal,
        role_id: RoleId,
        input: UpdateRoleInput,
    ) -> AppResult<Role> {
        let tenant_id = actor.tenant_id();

        let _guard = self.context.locks().write(tenant_id).await;
        let mut snapshot = self.context.load_snapshot(tenant_id).await?;
        let mut role = snapshot.tree.require(role_id)?.clone();
        role.update_details(input.name, input.is_position, input.display_order)?;
        let role = snapshot.tree.update_details(role)?;

        let mutation = Mutation {
            changes: TenantChangeSet {
                upsert_roles: vec![role.clone()],
                ..Default::default()
            },
            invalidated_roles: BTreeSet::new(),
            events: vec![audit_event(
                actor,
                AuditAction::RoleUpdated,
                "role",
                role_id.to_string(),
                format!("updated role '{}'", role.code()),
            )],
        };
        self.context.commit(tenant_id, mutation).await?;

        Ok(role)
    }

    /// Moves a role under a new parent, or to the root when `new_parent_id` is `None`.
    ///
    /// Levels of the moved subtree, scope ceilings inside it, cached decisions of its
    /// roles and team links of its holders are all updated in the same mutation.
    pub async fn reparent(
        &self,
        actor: &Principal,
        role_id: RoleId,
        new_parent_id: Option<RoleId>,
    ) -> AppResult<Role> {
        let tenant_id = actor.tenant_id();

        let _guard = self.context.locks().write(tenant_id).await;
        let mut snapshot = self.context.load_snapshot(tenant_id).await?;
        snapshot.tree.require(role_id)?;

        if let Some(parent_id) = new_parent_id
            && snapshot.tree.get(parent_id).is_none()
        {
            return Err(self.foreign_parent_error(tenant_id, role_id, parent_id).await?);
        }

        let previous_parent_id = snapshot.tree.get(role_id).and_then(Role::parent_id);
        let moved = snapshot.tree.reparent(role_id, new_parent_id)?;
        let role = snapshot.tree.require(role_id)?.clone();
        if moved.is_empty() {
            return Ok(role);
        }

        let subtree: BTreeSet<RoleId> = snapshot.tree.subtree_ids(role_id).into_iter().collect();
        let clamp = snapshot.matrix.clamp_subtree(&snapshot.tree, role_id, None);
        let subjects = snapshot.holders_of(&subtree);

        let mut events = vec![audit_event(
            actor,
            AuditAction::RoleReparented,
            "role",
            role_id.to_string(),
            format!(
                "moved role '{}' from {} to {}; {} role(s) re-levelled",
                role.code(),
                describe_parent(previous_parent_id),
                describe_parent(new_parent_id),
                moved.len()
            ),
        )];
        events.extend(clamp_events(actor, &clamp.clamped));

        let mutation = Mutation {
            changes: TenantChangeSet {
                upsert_roles: moved,
                upsert_entries: clamp.upserted,
                team_links: snapshot.team_links_for(subjects, Utc::now()),
                ..Default::default()
            },
            invalidated_roles: subtree,
            events,
        };
        self.context.commit(tenant_id, mutation).await?;

        Ok(role)
    }

    /// Deletes a role following the explicit policy.
    pub async fn delete_role(
        &self,
        actor: &Principal,
        role_id: RoleId,
        policy: RoleDeletePolicy,
    ) -> AppResult<RoleDeletion> {
        let tenant_id = actor.tenant_id();

        let _guard = self.context.locks().write(tenant_id).await;
        let mut snapshot = self.context.load_snapshot(tenant_id).await?;
        let role = snapshot.tree.require(role_id)?.clone();

        if let RoleDeletePolicy::Reassign(target_id) = policy
            && snapshot.tree.get(target_id).is_none()
        {
            return Err(self.foreign_parent_error(tenant_id, role_id, target_id).await?);
        }

        let removal = snapshot.tree.remove(role_id, policy)?;
        let removed: BTreeSet<RoleId> = removal.removed.iter().copied().collect();

        let mut affected = removed.clone();
        affected.extend(removal.moved.iter().map(Role::role_id));
        let subjects = snapshot.holders_of(&affected);

        let mut matrix_update = snapshot.matrix.remove_roles(&removal.removed);
        if let Some(target_id) = removal.reassign_to {
            matrix_update.extend(snapshot.matrix.clamp_subtree(&snapshot.tree, target_id, None));
            affected.insert(target_id);
        }

        let mut upsert_assignments = Vec::new();
        let mut delete_assignments = Vec::new();
        let mut remaining = Vec::with_capacity(snapshot.assignments.len());
        for mut assignment in std::mem::take(&mut snapshot.assignments) {
            if !removed.contains(&assignment.role_id()) {
                remaining.push(assignment);
                continue;
            }

            match removal.reassign_to {
                Some(target_id)
                    if !remaining.iter().chain(upsert_assignments.iter()).any(
                        |existing: &RoleAssignment| {
                            existing.subject() == assignment.subject()
                                && existing.role_id() == target_id
                                && existing.window().overlaps(&assignment.window())
                        },
                    ) =>
                {
                    assignment.move_to_role(target_id);
                    upsert_assignments.push(assignment);
                }
                _ => delete_assignments.push(assignment.assignment_id()),
            }
        }
        remaining.extend(upsert_assignments.iter().cloned());
        snapshot.assignments = remaining;

        let deletion = RoleDeletion {
            removed_roles: removal.removed.clone(),
            moved_roles: removal.moved.clone(),
            reassigned_assignments: upsert_assignments.len(),
            revoked_assignments: delete_assignments.len(),
        };

        let mut events = vec![audit_event(
            actor,
            AuditAction::RoleDeleted,
            "role",
            role_id.to_string(),
            format!(
                "deleted role '{}' with policy {}; {} role(s) removed, {} moved, {} assignment(s) reassigned, {} revoked",
                role.code(),
                describe_policy(policy),
                deletion.removed_roles.len(),
                deletion.moved_roles.len(),
                deletion.reassigned_assignments,
                deletion.revoked_assignments
            ),
        )];
        events.extend(clamp_events(actor, &matrix_update.clamped));

        let mutation = Mutation {
            changes: TenantChangeSet {
                upsert_roles: removal.moved,
                delete_roles: removal.removed,
                upsert_entries: matrix_update.upserted,
                delete_entries: matrix_update.removed,
                upsert_assignments,
                delete_assignments,
                team_links: snapshot.team_links_for(subjects, Utc::now()),
            },
            invalidated_roles: affected,
            events,
        };
        self.context.commit(tenant_id, mutation).await?;

        Ok(deletion)
    }

    async fn foreign_parent_error(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
        parent_id: RoleId,
    ) -> AppResult<AppError> {
        let owner = self.context.store().locate_role(parent_id).await?;

        Ok(match owner {
            Some(owner) if owner != tenant_id => HierarchyViolation::CrossTenant {
                role_id: role_id.to_string(),
                other_role_id: parent_id.to_string(),
            }
            .into(),
            _ => HierarchyViolation::InvalidParent {
                parent_id: parent_id.to_string(),
            }
            .into(),
        })
    }
}

fn describe_parent(parent_id: Option<RoleId>) -> String {
    parent_id.map_or_else(|| "root".to_owned(), |parent_id| format!("'{parent_id}'"))
}

fn describe_policy(policy: RoleDeletePolicy) -> String {
    match policy {
        RoleDeletePolicy::Reassign(target_id) => format!("reassign to '{target_id}'"),
        RoleDeletePolicy::Cascade => "cascade".to_owned(),
        RoleDeletePolicy::RejectIfChildren => "reject_if_children".to_owned(),
    }
}
