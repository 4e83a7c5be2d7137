use std::collections::BTreeSet;

use chrono::Utc;
use rolegraph_core::{AppResult, Principal, TenantId};
use rolegraph_domain::{AuditAction, RoleId, TeamLink, derive_team_links};

use crate::authorization_context::{AuthorizationContext, Mutation, audit_event};
use crate::{TeamLinkReplacement, TenantChangeSet};

/// Maintains the derived leader/member links.
///
/// Hierarchy, matrix and assignment mutations recompute the links of affected subjects
/// inside their own change set. The operations here recompute from stored state on
/// demand, for repair and for validity windows that opened or closed since the last
/// mutation.
#[derive(Clone)]
pub struct TeamLinker {
    context: AuthorizationContext,
}

impl TeamLinker {
    /// Creates a new service from the shared context.
    #[must_use]
    pub fn new(context: AuthorizationContext) -> Self {
        Self { context }
    }

    /// Recomputes the links of a subject after one of its assignments changed.
    pub async fn on_role_assignment_changed(
        &self,
        actor: &Principal,
        subject: &str,
    ) -> AppResult<usize> {
        self.recompute_for_subjects(actor, BTreeSet::from([subject.to_owned()]))
            .await
    }

    /// Recomputes the links of every holder of a role in the moved subtree.
    pub async fn on_role_reparented(&self, actor: &Principal, role_id: RoleId) -> AppResult<usize> {
        let tenant_id = actor.tenant_id();

        let _guard = self.context.locks().write(tenant_id).await;
        let snapshot = self.context.load_snapshot(tenant_id).await?;
        snapshot.tree.require(role_id)?;

        let subtree: BTreeSet<RoleId> = snapshot.tree.subtree_ids(role_id).into_iter().collect();
        let subjects = snapshot.holders_of(&subtree);
        let replacement = snapshot.team_links_for(subjects, Utc::now());

        self.commit_replacement(actor, replacement, format!("subtree of role '{role_id}'"))
            .await
    }

    /// Recomputes the links in which any of the subjects takes part.
    pub async fn recompute_for_subjects(
        &self,
        actor: &Principal,
        subjects: BTreeSet<String>,
    ) -> AppResult<usize> {
        let tenant_id = actor.tenant_id();

        let _guard = self.context.locks().write(tenant_id).await;
        let snapshot = self.context.load_snapshot(tenant_id).await?;
        let label = format!("{} subject(s)", subjects.len());
        let replacement = snapshot.team_links_for(subjects, Utc::now());

        self.commit_replacement(actor, replacement, label).await
    }

    /// Replaces every link of the tenant with a full recomputation.
    pub async fn rebuild_tenant(&self, actor: &Principal) -> AppResult<usize> {
        let tenant_id = actor.tenant_id();

        let _guard = self.context.locks().write(tenant_id).await;
        let snapshot = self.context.load_snapshot(tenant_id).await?;
        let links = derive_team_links(
            &snapshot.tree,
            &snapshot.matrix,
            &snapshot.assignments,
            Utc::now(),
        );

        self.commit_replacement(
            actor,
            TeamLinkReplacement::Tenant { links },
            "whole tenant".to_owned(),
        )
        .await
    }

    /// Lists the stored links of a tenant.
    pub async fn list_links(&self, tenant_id: TenantId) -> AppResult<Vec<TeamLink>> {
        self.context.store().list_team_links(tenant_id).await
    }

    async fn commit_replacement(
        &self,
        actor: &Principal,
        replacement: TeamLinkReplacement,
        label: String,
    ) -> AppResult<usize> {
        let count = match &replacement {
            TeamLinkReplacement::Unchanged => return Ok(0),
            TeamLinkReplacement::Subjects { links, .. } | TeamLinkReplacement::Tenant { links } => {
                links.len()
            }
        };

        let mutation = Mutation {
            changes: TenantChangeSet {
                team_links: replacement,
                ..Default::default()
            },
            invalidated_roles: BTreeSet::new(),
            events: vec![audit_event(
                actor,
                AuditAction::TeamLinksRebuilt,
                "team_link",
                actor.tenant_id().to_string(),
                format!("recomputed {count} team link(s) for {label}"),
            )],
        };
        self.context.commit(actor.tenant_id(), mutation).await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rolegraph_domain::{RoleDraft, RoleId};

    use crate::test_support::Harness;
    use crate::{
        AssignRoleInput, HierarchyService, PermissionMatrixService, RoleAssignmentService,
        SetEntryInput,
    };

    use super::TeamLinker;

    async fn create(harness: &Harness, code: &str, parent_id: Option<RoleId>) -> RoleId {
        HierarchyService::new(harness.context.clone())
            .create_role(
                &harness.admin,
                RoleDraft {
                    name: code.to_owned(),
                    code: code.to_owned(),
                    parent_id,
                    is_position: true,
                    display_order: 0,
                },
            )
            .await
            .map(|role| role.role_id())
            .unwrap_or_else(|_| unreachable!())
    }

    #[tokio::test]
    async fn rebuild_drops_links_of_lapsed_assignments() {
        let harness = Harness::new();
        let leader_role = create(&harness, "hod", None).await;
        let member_role = create(&harness, "teacher", Some(leader_role)).await;

        let matrix = PermissionMatrixService::new(harness.context.clone());
        assert!(
            matrix
                .set_entry(
                    &harness.admin,
                    leader_role,
                    SetEntryInput {
                        resource: "attendance".to_owned(),
                        action: "read".to_owned(),
                        enabled: true,
                        scope: "team".to_owned(),
                    },
                )
                .await
                .is_ok()
        );

        let assignments = RoleAssignmentService::new(harness.context.clone());
        let now = Utc::now();
        for (subject, role_id, valid_until) in [
            ("u1", leader_role, None),
            ("u2", member_role, Some(now + Duration::milliseconds(400))),
        ] {
            assert!(
                assignments
                    .assign_role(
                        &harness.admin,
                        AssignRoleInput {
                            subject: subject.to_owned(),
                            role_id,
                            valid_from: None,
                            valid_until,
                        },
                    )
                    .await
                    .is_ok()
            );
        }
        assert_eq!(harness.store.team_links(harness.tenant_id()).await.len(), 1);

        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        let linker = TeamLinker::new(harness.context.clone());
        let rebuilt = linker.rebuild_tenant(&harness.admin).await;

        assert_eq!(rebuilt.ok(), Some(0));
        assert!(harness.store.team_links(harness.tenant_id()).await.is_empty());
    }

    #[tokio::test]
    async fn recompute_is_idempotent() {
        let harness = Harness::new();
        let leader_role = create(&harness, "hod", None).await;
        let member_role = create(&harness, "teacher", Some(leader_role)).await;

        let matrix = PermissionMatrixService::new(harness.context.clone());
        assert!(
            matrix
                .set_entry(
                    &harness.admin,
                    leader_role,
                    SetEntryInput {
                        resource: "students".to_owned(),
                        action: "read".to_owned(),
                        enabled: true,
                        scope: "team".to_owned(),
                    },
                )
                .await
                .is_ok()
        );
        let assignments = RoleAssignmentService::new(harness.context.clone());
        for (subject, role_id) in [("u1", leader_role), ("u2", member_role)] {
            assert!(
                assignments
                    .assign_role(
                        &harness.admin,
                        AssignRoleInput {
                            subject: subject.to_owned(),
                            role_id,
                            valid_from: None,
                            valid_until: None,
                        },
                    )
                    .await
                    .is_ok()
            );
        }

        let linker = TeamLinker::new(harness.context.clone());
        let before = harness.store.team_links(harness.tenant_id()).await;
        assert!(linker.on_role_assignment_changed(&harness.admin, "u2").await.is_ok());
        assert!(linker.on_role_reparented(&harness.admin, leader_role).await.is_ok());

        assert_eq!(harness.store.team_links(harness.tenant_id()).await, before);
        assert_eq!(before.len(), 1);
    }
}
