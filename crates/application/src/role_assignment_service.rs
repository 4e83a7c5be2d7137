use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use rolegraph_core::{AppError, AppResult, Principal, TenantId};
use rolegraph_domain::{AssignmentId, AuditAction, RoleAssignment, RoleId, ValidityWindow};

use crate::TenantChangeSet;
use crate::authorization_context::{AuthorizationContext, Mutation, TenantSnapshot, audit_event};

/// Input payload for assigning a role to a subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignRoleInput {
    /// Subject receiving the role.
    pub subject: String,
    /// Assigned role.
    pub role_id: RoleId,
    /// First instant the assignment is active.
    pub valid_from: Option<DateTime<Utc>>,
    /// First instant the assignment is no longer active.
    pub valid_until: Option<DateTime<Utc>>,
}

/// Application service for subject role assignments.
#[derive(Clone)]
pub struct RoleAssignmentService {
    context: AuthorizationContext,
}

impl RoleAssignmentService {
    /// Creates a new service from the shared context.
    #[must_use]
    pub fn new(context: AuthorizationContext) -> Self {
        Self { context }
    }

    /// Assigns a role to a subject and refreshes the subject's team links.
    pub async fn assign_role(
        &self,
        actor: &Principal,
        input: AssignRoleInput,
    ) -> AppResult<RoleAssignment> {
        let tenant_id = actor.tenant_id();
        let window = ValidityWindow::new(input.valid_from, input.valid_until)?;
        let assignment = RoleAssignment::new(
            tenant_id,
            input.subject,
            input.role_id,
            window,
            actor.subject(),
            Utc::now(),
        )?;

        let _guard = self.context.locks().write(tenant_id).await;
        let mut snapshot = self.context.load_snapshot(tenant_id).await?;
        snapshot.tree.require(assignment.role_id())?;
        ensure_no_overlap(&snapshot, &assignment)?;

        snapshot.assignments.push(assignment.clone());
        let detail = format!(
            "assigned role '{}' to '{}'",
            assignment.role_id(),
            assignment.subject()
        );
        self.commit_assignment(actor, snapshot, &assignment, AuditAction::RoleAssigned, detail)
            .await?;

        Ok(assignment)
    }

    /// Replaces the validity window of an assignment.
    pub async fn update_validity(
        &self,
        actor: &Principal,
        assignment_id: AssignmentId,
        valid_from: Option<DateTime<Utc>>,
        valid_until: Option<DateTime<Utc>>,
    ) -> AppResult<RoleAssignment> {
        let tenant_id = actor.tenant_id();
        let window = ValidityWindow::new(valid_from, valid_until)?;

        let _guard = self.context.locks().write(tenant_id).await;
        let mut snapshot = self.context.load_snapshot(tenant_id).await?;
        let position = find_position(&snapshot, tenant_id, assignment_id)?;

        let mut assignment = snapshot.assignments.remove(position);
        assignment.set_window(window);
        ensure_no_overlap(&snapshot, &assignment)?;

        snapshot.assignments.push(assignment.clone());
        let detail = format!(
            "changed validity of role '{}' for '{}'",
            assignment.role_id(),
            assignment.subject()
        );
        self.commit_assignment(
            actor,
            snapshot,
            &assignment,
            AuditAction::RoleAssignmentUpdated,
            detail,
        )
        .await?;

        Ok(assignment)
    }

    /// Removes an assignment and refreshes the subject's team links.
    pub async fn revoke(&self, actor: &Principal, assignment_id: AssignmentId) -> AppResult<()> {
        let tenant_id = actor.tenant_id();

        let _guard = self.context.locks().write(tenant_id).await;
        let mut snapshot = self.context.load_snapshot(tenant_id).await?;
        let position = find_position(&snapshot, tenant_id, assignment_id)?;
        let assignment = snapshot.assignments.remove(position);

        let subjects = BTreeSet::from([assignment.subject().to_owned()]);
        let mutation = Mutation {
            changes: TenantChangeSet {
                delete_assignments: vec![assignment_id],
                team_links: snapshot.team_links_for(subjects, Utc::now()),
                ..Default::default()
            },
            invalidated_roles: BTreeSet::new(),
            events: vec![audit_event(
                actor,
                AuditAction::RoleRevoked,
                "role_assignment",
                assignment_id.to_string(),
                format!(
                    "revoked role '{}' from '{}'",
                    assignment.role_id(),
                    assignment.subject()
                ),
            )],
        };

        self.context.commit(tenant_id, mutation).await
    }

    /// Lists assignments of the tenant, optionally for one subject.
    pub async fn list_assignments(
        &self,
        tenant_id: TenantId,
        subject: Option<&str>,
    ) -> AppResult<Vec<RoleAssignment>> {
        match subject {
            Some(subject) => {
                self.context
                    .store()
                    .list_assignments_for_subject(tenant_id, subject)
                    .await
            }
            None => self.context.store().list_assignments(tenant_id).await,
        }
    }

    /// Returns the distinct roles a subject holds at the instant.
    pub async fn active_role_ids(
        &self,
        tenant_id: TenantId,
        subject: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<RoleId>> {
        active_role_ids(&self.context, tenant_id, subject, now).await
    }

    async fn commit_assignment(
        &self,
        actor: &Principal,
        snapshot: TenantSnapshot,
        assignment: &RoleAssignment,
        action: AuditAction,
        detail: String,
    ) -> AppResult<()> {
        let subjects = BTreeSet::from([assignment.subject().to_owned()]);
        let mutation = Mutation {
            changes: TenantChangeSet {
                upsert_assignments: vec![assignment.clone()],
                team_links: snapshot.team_links_for(subjects, Utc::now()),
                ..Default::default()
            },
            invalidated_roles: BTreeSet::new(),
            events: vec![audit_event(
                actor,
                action,
                "role_assignment",
                assignment.assignment_id().to_string(),
                detail,
            )],
        };

        self.context
            .commit(assignment.tenant_id(), mutation)
            .await
    }
}

/// Loads a subject's assignments and keeps the distinct roles active at the instant.
pub(crate) async fn active_role_ids(
    context: &AuthorizationContext,
    tenant_id: TenantId,
    subject: &str,
    now: DateTime<Utc>,
) -> AppResult<Vec<RoleId>> {
    let mut seen = HashSet::new();
    let mut role_ids: Vec<RoleId> = context
        .store()
        .list_assignments_for_subject(tenant_id, subject)
        .await?
        .into_iter()
        .filter(|assignment| assignment.is_active_at(now))
        .map(|assignment| assignment.role_id())
        .filter(|role_id| seen.insert(*role_id))
        .collect();
    role_ids.sort();

    Ok(role_ids)
}

fn find_position(
    snapshot: &TenantSnapshot,
    tenant_id: TenantId,
    assignment_id: AssignmentId,
) -> AppResult<usize> {
    snapshot
        .assignments
        .iter()
        .position(|assignment| assignment.assignment_id() == assignment_id)
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "assignment '{assignment_id}' does not exist in tenant '{tenant_id}'"
            ))
        })
}

fn ensure_no_overlap(snapshot: &TenantSnapshot, candidate: &RoleAssignment) -> AppResult<()> {
    let overlapping = snapshot.assignments.iter().any(|existing| {
        existing.assignment_id() != candidate.assignment_id()
            && existing.subject() == candidate.subject()
            && existing.role_id() == candidate.role_id()
            && existing.window().overlaps(&candidate.window())
    });

    if overlapping {
        return Err(AppError::Conflict(format!(
            "subject '{}' already holds role '{}' during an overlapping window",
            candidate.subject(),
            candidate.role_id()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rolegraph_core::AppError;
    use rolegraph_domain::{RoleDraft, RoleId};

    use crate::HierarchyService;
    use crate::test_support::Harness;

    use super::{AssignRoleInput, RoleAssignmentService};

    async fn role(harness: &Harness) -> RoleId {
        HierarchyService::new(harness.context.clone())
            .create_role(
                &harness.admin,
                RoleDraft {
                    name: "Teacher".to_owned(),
                    code: "teacher".to_owned(),
                    parent_id: None,
                    is_position: true,
                    display_order: 0,
                },
            )
            .await
            .map(|role| role.role_id())
            .unwrap_or_else(|_| unreachable!())
    }

    fn input(subject: &str, role_id: RoleId) -> AssignRoleInput {
        AssignRoleInput {
            subject: subject.to_owned(),
            role_id,
            valid_from: None,
            valid_until: None,
        }
    }

    #[tokio::test]
    async fn overlapping_duplicate_assignment_is_a_conflict() {
        let harness = Harness::new();
        let service = RoleAssignmentService::new(harness.context.clone());
        let role_id = role(&harness).await;

        assert!(service.assign_role(&harness.admin, input("u1", role_id)).await.is_ok());
        let duplicate = service.assign_role(&harness.admin, input("u1", role_id)).await;

        assert!(matches!(duplicate, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn unknown_role_is_not_found() {
        let harness = Harness::new();
        let service = RoleAssignmentService::new(harness.context.clone());

        let result = service
            .assign_role(&harness.admin, input("u1", RoleId::new()))
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn inverted_window_is_rejected() {
        let harness = Harness::new();
        let service = RoleAssignmentService::new(harness.context.clone());
        let role_id = role(&harness).await;
        let now = Utc::now();

        let result = service
            .assign_role(
                &harness.admin,
                AssignRoleInput {
                    valid_from: Some(now),
                    valid_until: Some(now - Duration::days(1)),
                    ..input("u1", role_id)
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn expired_assignment_grants_no_role() {
        let harness = Harness::new();
        let service = RoleAssignmentService::new(harness.context.clone());
        let role_id = role(&harness).await;
        let now = Utc::now();

        let assignment = service
            .assign_role(&harness.admin, input("u1", role_id))
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(
            service
                .active_role_ids(harness.tenant_id(), "u1", now)
                .await
                .unwrap_or_default(),
            vec![role_id]
        );

        let updated = service
            .update_validity(
                &harness.admin,
                assignment.assignment_id(),
                Some(now - Duration::days(2)),
                Some(now - Duration::days(1)),
            )
            .await;
        assert!(updated.is_ok());
        assert!(
            service
                .active_role_ids(harness.tenant_id(), "u1", now)
                .await
                .unwrap_or_default()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn revoke_removes_assignment_and_audits() {
        let harness = Harness::new();
        let service = RoleAssignmentService::new(harness.context.clone());
        let role_id = role(&harness).await;

        let assignment = service
            .assign_role(&harness.admin, input("u1", role_id))
            .await
            .unwrap_or_else(|_| unreachable!());
        assert!(
            service
                .revoke(&harness.admin, assignment.assignment_id())
                .await
                .is_ok()
        );

        assert!(
            service
                .list_assignments(harness.tenant_id(), Some("u1"))
                .await
                .unwrap_or_default()
                .is_empty()
        );
        assert_eq!(
            harness.audit.actions().await,
            vec!["role.created", "assignment.created", "assignment.revoked"]
        );
        assert!(
            service
                .revoke(&harness.admin, assignment.assignment_id())
                .await
                .is_err()
        );
    }
}
