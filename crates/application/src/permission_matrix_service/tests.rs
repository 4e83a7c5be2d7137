use std::sync::atomic::Ordering;

use rolegraph_core::{AppError, MatrixViolation};
use rolegraph_domain::{RoleDraft, RoleId, Scope};

use crate::HierarchyService;
use crate::test_support::Harness;

use super::{PermissionMatrixService, SetEntryInput};

fn entry(resource: &str, action: &str, enabled: bool, scope: &str) -> SetEntryInput {
    SetEntryInput {
        resource: resource.to_owned(),
        action: action.to_owned(),
        enabled,
        scope: scope.to_owned(),
    }
}

async fn chain(harness: &Harness) -> (RoleId, RoleId) {
    let hierarchy = HierarchyService::new(harness.context.clone());
    let root = hierarchy
        .create_role(
            &harness.admin,
            RoleDraft {
                name: "Principal".to_owned(),
                code: "principal".to_owned(),
                parent_id: None,
                is_position: true,
                display_order: 0,
            },
        )
        .await
        .map(|role| role.role_id())
        .unwrap_or_else(|_| unreachable!());
    let child = hierarchy
        .create_role(
            &harness.admin,
            RoleDraft {
                name: "Teacher".to_owned(),
                code: "teacher".to_owned(),
                parent_id: Some(root),
                is_position: true,
                display_order: 0,
            },
        )
        .await
        .map(|role| role.role_id())
        .unwrap_or_else(|_| unreachable!());

    (root, child)
}

#[tokio::test]
async fn child_scope_is_capped_by_parent() {
    let harness = Harness::new();
    let service = PermissionMatrixService::new(harness.context.clone());
    let (r0, r1) = chain(&harness).await;

    assert!(
        service
            .set_entry(&harness.admin, r0, entry("students", "read", true, "department"))
            .await
            .is_ok()
    );

    let broader = service
        .set_entry(&harness.admin, r1, entry("students", "read", true, "all"))
        .await;
    assert!(matches!(
        broader,
        Err(AppError::Matrix(MatrixViolation::ScopeExceedsParent { .. }))
    ));

    let narrower = service
        .set_entry(&harness.admin, r1, entry("students", "read", true, "mine"))
        .await;
    assert!(narrower.is_ok());

    let stored = service
        .get_entry(harness.tenant_id(), r1, "students", "read")
        .await;
    assert_eq!(stored.map(|grant| grant.scope).ok(), Some(Scope::Mine));
}

#[tokio::test]
async fn registry_rejects_unknown_parts() {
    let harness = Harness::new();
    let service = PermissionMatrixService::new(harness.context.clone());
    let (r0, _) = chain(&harness).await;

    let unknown_resource = service
        .set_entry(&harness.admin, r0, entry("payroll", "read", true, "all"))
        .await;
    let unknown_action = service
        .set_entry(&harness.admin, r0, entry("fees", "refund", true, "all"))
        .await;
    let unknown_scope = service
        .set_entry(&harness.admin, r0, entry("fees", "read", true, "planet"))
        .await;

    assert!(matches!(
        unknown_resource,
        Err(AppError::Matrix(MatrixViolation::UnknownResource { .. }))
    ));
    assert!(matches!(
        unknown_action,
        Err(AppError::Matrix(MatrixViolation::UnknownAction { .. }))
    ));
    assert!(matches!(
        unknown_scope,
        Err(AppError::Matrix(MatrixViolation::UnknownScope { .. }))
    ));
}

#[tokio::test]
async fn narrowing_parent_clamps_and_audits_child() {
    let harness = Harness::new();
    let service = PermissionMatrixService::new(harness.context.clone());
    let (r0, r1) = chain(&harness).await;

    assert!(
        service
            .set_entry(&harness.admin, r0, entry("exams", "publish", true, "all"))
            .await
            .is_ok()
    );
    assert!(
        service
            .set_entry(&harness.admin, r1, entry("exams", "publish", true, "department"))
            .await
            .is_ok()
    );
    assert!(
        service
            .set_entry(&harness.admin, r0, entry("exams", "publish", true, "mine"))
            .await
            .is_ok()
    );

    let child = service
        .get_entry(harness.tenant_id(), r1, "exams", "publish")
        .await;
    assert_eq!(child.map(|grant| grant.scope).ok(), Some(Scope::Mine));
    assert!(
        harness
            .audit
            .actions()
            .await
            .contains(&"permission.entry.clamped")
    );
}

#[tokio::test]
async fn failed_role_invalidation_falls_back_to_tenant_flush() {
    let harness = Harness::new();
    let service = PermissionMatrixService::new(harness.context.clone());
    let (r0, _) = chain(&harness).await;
    harness
        .cache
        .fail_role_invalidation
        .store(true, Ordering::SeqCst);

    let result = service
        .set_entry(&harness.admin, r0, entry("fees", "delete", true, "all"))
        .await;

    assert!(result.is_ok());
    assert_eq!(harness.cache.tenant_flushes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn clear_entry_removes_row_once() {
    let harness = Harness::new();
    let service = PermissionMatrixService::new(harness.context.clone());
    let (r0, _) = chain(&harness).await;

    assert!(
        service
            .set_entry(&harness.admin, r0, entry("library", "issue", true, "all"))
            .await
            .is_ok()
    );

    let first = service
        .clear_entry(&harness.admin, r0, "library", "issue")
        .await;
    let second = service
        .clear_entry(&harness.admin, r0, "library", "issue")
        .await;

    assert_eq!(first.ok(), Some(true));
    assert_eq!(second.ok(), Some(false));
    assert!(
        service
            .list_entries_for_role(harness.tenant_id(), r0)
            .await
            .unwrap_or_default()
            .is_empty()
    );
}

#[tokio::test]
async fn effective_for_joins_role_set() {
    let harness = Harness::new();
    let service = PermissionMatrixService::new(harness.context.clone());
    let (r0, r1) = chain(&harness).await;

    assert!(
        service
            .set_entry(&harness.admin, r0, entry("fees", "read", false, "all"))
            .await
            .is_ok()
    );
    assert!(
        service
            .set_entry(&harness.admin, r1, entry("fees", "read", true, "team"))
            .await
            .is_ok()
    );

    let decision = service
        .effective_for(harness.tenant_id(), &[r0, r1], "fees", "read")
        .await;

    assert!(decision.is_ok_and(|decision| decision.allowed && decision.scope == Scope::Team));
}
