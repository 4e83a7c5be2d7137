use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use rolegraph_application::{
    AuthorizationChangeRepository, PermissionEntryRepository, RoleAssignmentRepository,
    RoleRepository, TeamLinkReplacement, TeamLinkRepository, TenantChangeSet,
};
use rolegraph_core::{AppError, AppResult, TenantId};
use rolegraph_domain::{
    AssignmentId, Capability, PermissionEntry, Role, RoleAssignment, RoleId, TeamLink,
};

#[derive(Debug, Default, Clone)]
struct TenantState {
    roles: HashMap<RoleId, Role>,
    entries: BTreeMap<(RoleId, Capability), PermissionEntry>,
    assignments: HashMap<AssignmentId, RoleAssignment>,
    team_links: BTreeSet<TeamLink>,
}

/// In-memory authorization store for development and tests.
///
/// Every change set is applied under one write lock, so readers see it whole or not
/// at all.
#[derive(Default)]
pub struct InMemoryAuthorizationStore {
    tenants: RwLock<HashMap<TenantId, TenantState>>,
}

impl InMemoryAuthorizationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoleRepository for InMemoryAuthorizationStore {
    async fn list_roles(&self, tenant_id: TenantId) -> AppResult<Vec<Role>> {
        let tenants = self.tenants.read().await;
        let mut roles: Vec<Role> = tenants
            .get(&tenant_id)
            .map(|state| state.roles.values().cloned().collect())
            .unwrap_or_default();
        roles.sort_by(|left, right| {
            (left.level(), left.display_order(), left.name(), left.role_id()).cmp(&(
                right.level(),
                right.display_order(),
                right.name(),
                right.role_id(),
            ))
        });

        Ok(roles)
    }

    async fn find_role(&self, tenant_id: TenantId, role_id: RoleId) -> AppResult<Option<Role>> {
        Ok(self
            .tenants
            .read()
            .await
            .get(&tenant_id)
            .and_then(|state| state.roles.get(&role_id))
            .cloned())
    }

    async fn locate_role(&self, role_id: RoleId) -> AppResult<Option<TenantId>> {
        Ok(self
            .tenants
            .read()
            .await
            .iter()
            .find(|(_, state)| state.roles.contains_key(&role_id))
            .map(|(tenant_id, _)| *tenant_id))
    }
}

#[async_trait]
impl PermissionEntryRepository for InMemoryAuthorizationStore {
    async fn list_entries(&self, tenant_id: TenantId) -> AppResult<Vec<PermissionEntry>> {
        Ok(self
            .tenants
            .read()
            .await
            .get(&tenant_id)
            .map(|state| state.entries.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn list_entries_for_role(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
    ) -> AppResult<Vec<PermissionEntry>> {
        Ok(self
            .tenants
            .read()
            .await
            .get(&tenant_id)
            .map(|state| {
                state
                    .entries
                    .values()
                    .filter(|entry| entry.role_id == role_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_entries_for_roles(
        &self,
        tenant_id: TenantId,
        role_ids: &[RoleId],
        capability: &Capability,
    ) -> AppResult<Vec<PermissionEntry>> {
        let tenants = self.tenants.read().await;
        let Some(state) = tenants.get(&tenant_id) else {
            return Ok(Vec::new());
        };

        Ok(role_ids
            .iter()
            .filter_map(|role_id| state.entries.get(&(*role_id, capability.clone())))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RoleAssignmentRepository for InMemoryAuthorizationStore {
    async fn list_assignments(&self, tenant_id: TenantId) -> AppResult<Vec<RoleAssignment>> {
        let tenants = self.tenants.read().await;
        let mut assignments: Vec<RoleAssignment> = tenants
            .get(&tenant_id)
            .map(|state| state.assignments.values().cloned().collect())
            .unwrap_or_default();
        sort_assignments(&mut assignments);

        Ok(assignments)
    }

    async fn list_assignments_for_subject(
        &self,
        tenant_id: TenantId,
        subject: &str,
    ) -> AppResult<Vec<RoleAssignment>> {
        let tenants = self.tenants.read().await;
        let mut assignments: Vec<RoleAssignment> = tenants
            .get(&tenant_id)
            .map(|state| {
                state
                    .assignments
                    .values()
                    .filter(|assignment| assignment.subject() == subject)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        sort_assignments(&mut assignments);

        Ok(assignments)
    }

    async fn find_assignment(
        &self,
        tenant_id: TenantId,
        assignment_id: AssignmentId,
    ) -> AppResult<Option<RoleAssignment>> {
        Ok(self
            .tenants
            .read()
            .await
            .get(&tenant_id)
            .and_then(|state| state.assignments.get(&assignment_id))
            .cloned())
    }
}

#[async_trait]
impl TeamLinkRepository for InMemoryAuthorizationStore {
    async fn list_team_links(&self, tenant_id: TenantId) -> AppResult<Vec<TeamLink>> {
        Ok(self
            .tenants
            .read()
            .await
            .get(&tenant_id)
            .map(|state| state.team_links.iter().cloned().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl AuthorizationChangeRepository for InMemoryAuthorizationStore {
    async fn apply_changes(&self, tenant_id: TenantId, changes: TenantChangeSet) -> AppResult<()> {
        let mut tenants = self.tenants.write().await;
        let current = tenants.get(&tenant_id).cloned().unwrap_or_default();
        let next = apply_to_state(tenant_id, current, changes)?;
        tenants.insert(tenant_id, next);

        Ok(())
    }
}

// Works on a copy so a rejected change set leaves the stored state untouched.
fn apply_to_state(
    tenant_id: TenantId,
    mut state: TenantState,
    changes: TenantChangeSet,
) -> AppResult<TenantState> {
    for role in changes.upsert_roles {
        if role.tenant_id() != tenant_id {
            return Err(AppError::Internal(format!(
                "role '{}' does not belong to tenant '{tenant_id}'",
                role.role_id()
            )));
        }
        state.roles.insert(role.role_id(), role);
    }

    for assignment_id in changes.delete_assignments {
        state.assignments.remove(&assignment_id);
    }
    for assignment in changes.upsert_assignments {
        if !state.roles.contains_key(&assignment.role_id()) {
            return Err(AppError::Internal(format!(
                "assignment '{}' references unknown role '{}'",
                assignment.assignment_id(),
                assignment.role_id()
            )));
        }
        state
            .assignments
            .insert(assignment.assignment_id(), assignment);
    }

    for key in changes.delete_entries {
        state.entries.remove(&key);
    }
    for entry in changes.upsert_entries {
        if !state.roles.contains_key(&entry.role_id) {
            return Err(AppError::Internal(format!(
                "permission entry references unknown role '{}'",
                entry.role_id
            )));
        }
        state
            .entries
            .insert((entry.role_id, entry.capability.clone()), entry);
    }

    for role_id in changes.delete_roles {
        state.roles.remove(&role_id);
        state.entries.retain(|(entry_role_id, _), _| *entry_role_id != role_id);
        state
            .assignments
            .retain(|_, assignment| assignment.role_id() != role_id);
    }

    match changes.team_links {
        TeamLinkReplacement::Unchanged => {}
        TeamLinkReplacement::Subjects { subjects, links } => {
            state
                .team_links
                .retain(|link| !subjects.iter().any(|subject| link.involves(subject)));
            state.team_links.extend(links);
        }
        TeamLinkReplacement::Tenant { links } => {
            state.team_links = links;
        }
    }

    Ok(state)
}

fn sort_assignments(assignments: &mut [RoleAssignment]) {
    assignments.sort_by(|left, right| {
        (left.subject(), left.assigned_at(), left.assignment_id()).cmp(&(
            right.subject(),
            right.assigned_at(),
            right.assignment_id(),
        ))
    });
}
