use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rolegraph_core::{AppError, AppResult, Principal, TenantId};
use rolegraph_domain::{
    AssignmentId, Capability, PermissionDecision, PermissionEntry, PermissionRegistry, Role,
    RoleAssignment, RoleId, TeamLink,
};
use tokio::sync::Mutex;

use crate::{
    AuditEvent, AuditRepository, AuthorizationChangeRepository, AuthorizationContext,
    PermissionCache, PermissionCacheKey, PermissionEntryRepository, RoleAssignmentRepository,
    RoleRepository, TeamLinkReplacement, TeamLinkRepository, TenantChangeSet,
};

#[derive(Default)]
struct FakeState {
    roles: HashMap<RoleId, Role>,
    entries: BTreeMap<(TenantId, RoleId, Capability), PermissionEntry>,
    assignments: HashMap<AssignmentId, RoleAssignment>,
    team_links: BTreeSet<TeamLink>,
}

#[derive(Default)]
pub(crate) struct FakeAuthorizationStore {
    state: Mutex<FakeState>,
    assignment_read_delay: Mutex<Option<Duration>>,
    pub(crate) entry_reads: AtomicUsize,
}

impl FakeAuthorizationStore {
    pub(crate) async fn delay_assignment_reads(&self, delay: Duration) {
        *self.assignment_read_delay.lock().await = Some(delay);
    }

    pub(crate) async fn team_links(&self, tenant_id: TenantId) -> Vec<TeamLink> {
        self.state
            .lock()
            .await
            .team_links
            .iter()
            .filter(|link| link.tenant_id == tenant_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RoleRepository for FakeAuthorizationStore {
    async fn list_roles(&self, tenant_id: TenantId) -> AppResult<Vec<Role>> {
        Ok(self
            .state
            .lock()
            .await
            .roles
            .values()
            .filter(|role| role.tenant_id() == tenant_id)
            .cloned()
            .collect())
    }

    async fn find_role(&self, tenant_id: TenantId, role_id: RoleId) -> AppResult<Option<Role>> {
        Ok(self
            .state
            .lock()
            .await
            .roles
            .get(&role_id)
            .filter(|role| role.tenant_id() == tenant_id)
            .cloned())
    }

    async fn locate_role(&self, role_id: RoleId) -> AppResult<Option<TenantId>> {
        Ok(self
            .state
            .lock()
            .await
            .roles
            .get(&role_id)
            .map(Role::tenant_id))
    }
}

#[async_trait]
impl PermissionEntryRepository for FakeAuthorizationStore {
    async fn list_entries(&self, tenant_id: TenantId) -> AppResult<Vec<PermissionEntry>> {
        Ok(self
            .state
            .lock()
            .await
            .entries
            .values()
            .filter(|entry| entry.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn list_entries_for_role(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
    ) -> AppResult<Vec<PermissionEntry>> {
        Ok(self
            .state
            .lock()
            .await
            .entries
            .values()
            .filter(|entry| entry.tenant_id == tenant_id && entry.role_id == role_id)
            .cloned()
            .collect())
    }

    async fn list_entries_for_roles(
        &self,
        tenant_id: TenantId,
        role_ids: &[RoleId],
        capability: &Capability,
    ) -> AppResult<Vec<PermissionEntry>> {
        self.entry_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .state
            .lock()
            .await
            .entries
            .values()
            .filter(|entry| {
                entry.tenant_id == tenant_id
                    && role_ids.contains(&entry.role_id)
                    && &entry.capability == capability
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RoleAssignmentRepository for FakeAuthorizationStore {
    async fn list_assignments(&self, tenant_id: TenantId) -> AppResult<Vec<RoleAssignment>> {
        let mut assignments: Vec<RoleAssignment> = self
            .state
            .lock()
            .await
            .assignments
            .values()
            .filter(|assignment| assignment.tenant_id() == tenant_id)
            .cloned()
            .collect();
        assignments.sort_by_key(RoleAssignment::assigned_at);
        Ok(assignments)
    }

    async fn list_assignments_for_subject(
        &self,
        tenant_id: TenantId,
        subject: &str,
    ) -> AppResult<Vec<RoleAssignment>> {
        let delay = *self.assignment_read_delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        Ok(self
            .list_assignments(tenant_id)
            .await?
            .into_iter()
            .filter(|assignment| assignment.subject() == subject)
            .collect())
    }

    async fn find_assignment(
        &self,
        tenant_id: TenantId,
        assignment_id: AssignmentId,
    ) -> AppResult<Option<RoleAssignment>> {
        Ok(self
            .state
            .lock()
            .await
            .assignments
            .get(&assignment_id)
            .filter(|assignment| assignment.tenant_id() == tenant_id)
            .cloned())
    }
}

#[async_trait]
impl TeamLinkRepository for FakeAuthorizationStore {
    async fn list_team_links(&self, tenant_id: TenantId) -> AppResult<Vec<TeamLink>> {
        Ok(self.team_links(tenant_id).await)
    }
}

#[async_trait]
impl AuthorizationChangeRepository for FakeAuthorizationStore {
    async fn apply_changes(&self, tenant_id: TenantId, changes: TenantChangeSet) -> AppResult<()> {
        let mut state = self.state.lock().await;

        for role in changes.upsert_roles {
            state.roles.insert(role.role_id(), role);
        }
        for assignment_id in changes.delete_assignments {
            state.assignments.remove(&assignment_id);
        }
        for assignment in changes.upsert_assignments {
            state
                .assignments
                .insert(assignment.assignment_id(), assignment);
        }
        for (role_id, capability) in changes.delete_entries {
            state.entries.remove(&(tenant_id, role_id, capability));
        }
        for entry in changes.upsert_entries {
            state
                .entries
                .insert((tenant_id, entry.role_id, entry.capability.clone()), entry);
        }
        for role_id in changes.delete_roles {
            state.roles.remove(&role_id);
        }

        match changes.team_links {
            TeamLinkReplacement::Unchanged => {}
            TeamLinkReplacement::Subjects { subjects, links } => {
                state.team_links.retain(|link| {
                    link.tenant_id != tenant_id
                        || !subjects.iter().any(|subject| link.involves(subject))
                });
                state.team_links.extend(links);
            }
            TeamLinkReplacement::Tenant { links } => {
                state.team_links.retain(|link| link.tenant_id != tenant_id);
                state.team_links.extend(links);
            }
        }

        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakePermissionCache {
    entries: Mutex<HashMap<PermissionCacheKey, PermissionDecision>>,
    pub(crate) fail_role_invalidation: AtomicBool,
    pub(crate) tenant_flushes: AtomicUsize,
}

impl FakePermissionCache {
    pub(crate) async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[async_trait]
impl PermissionCache for FakePermissionCache {
    async fn get(&self, key: &PermissionCacheKey) -> AppResult<Option<PermissionDecision>> {
        Ok(self.entries.lock().await.get(key).copied())
    }

    async fn put(
        &self,
        key: &PermissionCacheKey,
        decision: PermissionDecision,
        _ttl_seconds: u32,
    ) -> AppResult<()> {
        self.entries.lock().await.insert(key.clone(), decision);
        Ok(())
    }

    async fn invalidate_roles(&self, tenant_id: TenantId, role_ids: &[RoleId]) -> AppResult<()> {
        if self.fail_role_invalidation.load(Ordering::SeqCst) {
            return Err(AppError::Internal("cache unavailable".to_owned()));
        }

        self.entries.lock().await.retain(|key, _| {
            key.tenant_id() != tenant_id
                || !key.role_ids().iter().any(|role_id| role_ids.contains(role_id))
        });
        Ok(())
    }

    async fn invalidate_tenant(&self, tenant_id: TenantId) -> AppResult<()> {
        self.tenant_flushes.fetch_add(1, Ordering::SeqCst);
        self.entries
            .lock()
            .await
            .retain(|key, _| key.tenant_id() != tenant_id);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeAuditRepository {
    pub(crate) events: Mutex<Vec<AuditEvent>>,
}

impl FakeAuditRepository {
    pub(crate) async fn actions(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .await
            .iter()
            .map(|event| event.action.as_str())
            .collect()
    }
}

#[async_trait]
impl AuditRepository for FakeAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

pub(crate) struct Harness {
    pub(crate) store: Arc<FakeAuthorizationStore>,
    pub(crate) cache: Arc<FakePermissionCache>,
    pub(crate) audit: Arc<FakeAuditRepository>,
    pub(crate) context: AuthorizationContext,
    pub(crate) admin: Principal,
}

impl Harness {
    pub(crate) fn new() -> Self {
        let store = Arc::new(FakeAuthorizationStore::default());
        let cache = Arc::new(FakePermissionCache::default());
        let audit = Arc::new(FakeAuditRepository::default());
        let context = AuthorizationContext::new(
            store.clone(),
            cache.clone(),
            audit.clone(),
            Arc::new(PermissionRegistry::institutional_default()),
        );

        Self {
            store,
            cache,
            audit,
            context,
            admin: Principal::new("admin", None, TenantId::new()),
        }
    }

    pub(crate) fn tenant_id(&self) -> TenantId {
        self.admin.tenant_id()
    }

    pub(crate) fn principal(&self, subject: &str, department: Option<&str>) -> Principal {
        Principal::new(subject, department.map(str::to_owned), self.tenant_id())
    }
}
