use std::sync::atomic::Ordering;
use std::time::Duration;

use rolegraph_core::{AppError, MatrixViolation};
use rolegraph_domain::{FilterSpec, RoleDraft, RoleId, Scope};

use crate::test_support::Harness;
use crate::{
    AssignRoleInput, HierarchyService, PermissionMatrixService, RoleAssignmentService,
    SetEntryInput,
};

use super::{PermissionChecker, PermissionCheckerConfig};

async fn role_held_by(harness: &Harness, code: &str, subject: &str) -> RoleId {
    let role_id = HierarchyService::new(harness.context.clone())
        .create_role(
            &harness.admin,
            RoleDraft {
                name: code.to_owned(),
                code: code.to_owned(),
                parent_id: None,
                is_position: true,
                display_order: 0,
            },
        )
        .await
        .map(|role| role.role_id())
        .unwrap_or_else(|_| unreachable!());

    let assigned = RoleAssignmentService::new(harness.context.clone())
        .assign_role(
            &harness.admin,
            AssignRoleInput {
                subject: subject.to_owned(),
                role_id,
                valid_from: None,
                valid_until: None,
            },
        )
        .await;
    assert!(assigned.is_ok());

    role_id
}

async fn grant(
    harness: &Harness,
    role_id: RoleId,
    resource: &str,
    action: &str,
    enabled: bool,
    scope: &str,
) {
    let result = PermissionMatrixService::new(harness.context.clone())
        .set_entry(
            &harness.admin,
            role_id,
            SetEntryInput {
                resource: resource.to_owned(),
                action: action.to_owned(),
                enabled,
                scope: scope.to_owned(),
            },
        )
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn repeated_check_is_served_from_cache() {
    let harness = Harness::new();
    let role_id = role_held_by(&harness, "clerk", "u1").await;
    grant(&harness, role_id, "fees", "collect", true, "department").await;
    let checker =
        PermissionChecker::new(harness.context.clone(), PermissionCheckerConfig::default());
    let principal = harness.principal("u1", Some("accounts"));

    let first = checker.check(&principal, "fees", "collect").await;
    let second = checker.check(&principal, "fees", "collect").await;

    assert!(first.is_ok_and(|decision| decision.allowed && decision.scope == Scope::Department));
    assert!(second.is_ok_and(|decision| decision.allowed));
    assert_eq!(harness.store.entry_reads.load(Ordering::SeqCst), 1);
    assert_eq!(harness.cache.len().await, 1);
}

#[tokio::test]
async fn zero_ttl_disables_caching() {
    let harness = Harness::new();
    let role_id = role_held_by(&harness, "clerk", "u1").await;
    grant(&harness, role_id, "fees", "read", true, "all").await;
    let checker = PermissionChecker::new(
        harness.context.clone(),
        PermissionCheckerConfig {
            cache_ttl_seconds: 0,
            ..PermissionCheckerConfig::default()
        },
    );
    let principal = harness.principal("u1", None);

    assert!(checker.check(&principal, "fees", "read").await.is_ok());
    assert!(checker.check(&principal, "fees", "read").await.is_ok());

    assert_eq!(harness.store.entry_reads.load(Ordering::SeqCst), 2);
    assert_eq!(harness.cache.len().await, 0);
}

#[tokio::test]
async fn unregistered_capability_never_allows() {
    let harness = Harness::new();
    role_held_by(&harness, "clerk", "u1").await;
    let checker =
        PermissionChecker::new(harness.context.clone(), PermissionCheckerConfig::default());
    let principal = harness.principal("u1", None);

    let result = checker.check(&principal, "payroll", "read").await;

    assert!(matches!(
        result,
        Err(AppError::Matrix(MatrixViolation::UnknownResource { .. }))
    ));
}

#[tokio::test]
async fn principal_without_roles_is_denied_and_audited() {
    let harness = Harness::new();
    let checker =
        PermissionChecker::new(harness.context.clone(), PermissionCheckerConfig::default());
    let principal = harness.principal("stranger", None);

    let decision = checker.check(&principal, "students", "read").await;

    assert!(decision.is_ok_and(|decision| !decision.allowed && decision.scope == Scope::None));
    assert_eq!(harness.audit.actions().await, vec!["access.denied"]);
}

#[tokio::test]
async fn allowed_checks_are_audited_only_when_configured() {
    let harness = Harness::new();
    let role_id = role_held_by(&harness, "librarian", "u1").await;
    grant(&harness, role_id, "library", "issue", true, "all").await;
    let principal = harness.principal("u1", None);

    let quiet =
        PermissionChecker::new(harness.context.clone(), PermissionCheckerConfig::default());
    assert!(quiet.check(&principal, "library", "issue").await.is_ok());
    assert!(!harness.audit.actions().await.contains(&"access.granted"));

    let verbose = PermissionChecker::new(
        harness.context.clone(),
        PermissionCheckerConfig {
            audit_allowed_checks: true,
            ..PermissionCheckerConfig::default()
        },
    );
    assert!(verbose.check(&principal, "library", "issue").await.is_ok());
    assert!(harness.audit.actions().await.contains(&"access.granted"));
}

#[tokio::test]
async fn slow_storage_fails_closed_with_timeout() {
    let harness = Harness::new();
    let role_id = role_held_by(&harness, "clerk", "u1").await;
    grant(&harness, role_id, "fees", "read", true, "all").await;
    harness
        .store
        .delay_assignment_reads(Duration::from_millis(200))
        .await;
    let checker =
        PermissionChecker::new(harness.context.clone(), PermissionCheckerConfig::default());
    let principal = harness.principal("u1", None);

    let result = checker
        .check_with_deadline(&principal, "fees", "read", Duration::from_millis(20))
        .await;

    assert!(matches!(result, Err(AppError::Timeout(_))));
    assert!(result.is_err_and(|error| error.is_fail_closed_denial()));
    assert!(harness.audit.actions().await.contains(&"access.timed_out"));
}

#[tokio::test]
async fn check_or_reject_turns_denial_into_forbidden() {
    let harness = Harness::new();
    let role_id = role_held_by(&harness, "clerk", "u1").await;
    grant(&harness, role_id, "fees", "delete", false, "all").await;
    let checker =
        PermissionChecker::new(harness.context.clone(), PermissionCheckerConfig::default());
    let principal = harness.principal("u1", None);

    let result = checker.check_or_reject(&principal, "fees", "delete").await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn authorize_returns_filter_for_granted_scope() {
    let harness = Harness::new();
    let role_id = role_held_by(&harness, "teacher", "u1").await;
    grant(&harness, role_id, "attendance", "update", true, "mine").await;
    let checker =
        PermissionChecker::new(harness.context.clone(), PermissionCheckerConfig::default());
    let principal = harness.principal("u1", None);

    let filter = checker.authorize(&principal, "attendance", "update").await;

    assert_eq!(
        filter.ok(),
        Some(FilterSpec::Owner {
            field: "marked_by".to_owned(),
            subject: "u1".to_owned(),
        })
    );
}

#[tokio::test]
async fn requested_scope_is_capped_at_the_grant() {
    let harness = Harness::new();
    let role_id = role_held_by(&harness, "clerk", "u1").await;
    grant(&harness, role_id, "fees", "read", true, "mine").await;
    let checker =
        PermissionChecker::new(harness.context.clone(), PermissionCheckerConfig::default());

    let widened = checker
        .resolve_within_grant(&harness.principal("u1", None), "fees", "read", Scope::All)
        .await;
    assert_eq!(
        widened.ok(),
        Some(FilterSpec::Owner {
            field: "collected_by".to_owned(),
            subject: "u1".to_owned(),
        })
    );

    let ungranted = checker
        .resolve_within_grant(&harness.principal("u2", None), "fees", "read", Scope::All)
        .await;
    assert_eq!(ungranted.ok(), Some(FilterSpec::Deny));
}
