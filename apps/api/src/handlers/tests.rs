use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use rolegraph_core::{Principal, TenantId};

use super::{access, assignments, audit, health, permissions, roles, team_links};
use crate::dto::{
    AssignRoleRequest, AuditLogQueryParams, CheckAccessRequest, CreateRoleRequest,
    DeleteRoleQuery, ResolveScopeRequest, RoleResponse, SetPermissionEntryRequest,
};
use crate::state::AppState;
use crate::test_support::test_state;

async fn create_role(
    state: &AppState,
    admin: &Principal,
    code: &str,
    parent_id: Option<&str>,
) -> RoleResponse {
    let created = roles::create_role_handler(
        State(state.clone()),
        Extension(admin.clone()),
        Json(CreateRoleRequest {
            name: code.to_uppercase(),
            code: code.to_owned(),
            parent_id: parent_id.map(str::to_owned),
            is_position: true,
            display_order: 0,
        }),
    )
    .await;
    assert!(created.is_ok());
    let (status, Json(role)) = created.unwrap_or_else(|_| unreachable!());
    assert_eq!(status, StatusCode::CREATED);

    role
}

async fn set_entry(state: &AppState, admin: &Principal, role_id: &str, scope: &str) {
    let result = permissions::set_permission_entry_handler(
        State(state.clone()),
        Extension(admin.clone()),
        Path((role_id.to_owned(), "students".to_owned(), "read".to_owned())),
        Json(SetPermissionEntryRequest {
            enabled: true,
            scope: scope.to_owned(),
        }),
    )
    .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn administered_hierarchy_drives_access_checks() {
    let state = test_state();
    let tenant_id = TenantId::new();
    let admin = Principal::new("admin", None, tenant_id);

    let principal_role = create_role(&state, &admin, "principal", None).await;
    let hod = create_role(&state, &admin, "hod", Some(principal_role.role_id.as_str())).await;
    assert_eq!(hod.level, 1);

    set_entry(&state, &admin, principal_role.role_id.as_str(), "all").await;
    set_entry(&state, &admin, hod.role_id.as_str(), "department").await;

    let assigned = assignments::assign_role_handler(
        State(state.clone()),
        Extension(admin.clone()),
        Json(AssignRoleRequest {
            subject: "u2".to_owned(),
            role_id: hod.role_id.clone(),
            valid_from: None,
            valid_until: None,
        }),
    )
    .await;
    assert!(assigned.is_ok());

    let checked = access::check_access_handler(
        State(state.clone()),
        Extension(Principal::new("u2", Some("science".to_owned()), tenant_id)),
        Json(CheckAccessRequest {
            resource: "students".to_owned(),
            action: "read".to_owned(),
            timeout_ms: None,
        }),
    )
    .await;
    assert!(checked.is_ok());
    let Json(decision) = checked.unwrap_or_else(|_| unreachable!());
    assert!(decision.allowed);
    assert_eq!(decision.scope, "department");

    let authorized = access::authorize_handler(
        State(state.clone()),
        Extension(Principal::new("u2", Some("science".to_owned()), tenant_id)),
        Json(CheckAccessRequest {
            resource: "students".to_owned(),
            action: "read".to_owned(),
            timeout_ms: None,
        }),
    )
    .await;
    assert!(authorized.is_ok());
    let Json(filter) = authorized.unwrap_or_else(|_| unreachable!());
    assert_eq!(filter.kind, "department");
    assert_eq!(filter.values, vec!["science".to_owned()]);

    let audit_entries = audit::list_audit_log_handler(
        State(state.clone()),
        Extension(admin.clone()),
        Query(AuditLogQueryParams {
            action: Some("role.created".to_owned()),
            ..AuditLogQueryParams::default()
        }),
    )
    .await;
    assert!(audit_entries.is_ok());
    let Json(audit_entries) = audit_entries.unwrap_or_else(|_| unreachable!());
    assert_eq!(audit_entries.len(), 2);
}

#[tokio::test]
async fn widening_a_child_past_its_parent_is_a_bad_request() {
    let state = test_state();
    let admin = Principal::new("admin", None, TenantId::new());
    let principal_role = create_role(&state, &admin, "principal", None).await;
    let teacher = create_role(
        &state,
        &admin,
        "teacher",
        Some(principal_role.role_id.as_str()),
    )
    .await;
    set_entry(&state, &admin, principal_role.role_id.as_str(), "mine").await;

    let result = permissions::set_permission_entry_handler(
        State(state.clone()),
        Extension(admin.clone()),
        Path((teacher.role_id, "students".to_owned(), "read".to_owned())),
        Json(SetPermissionEntryRequest {
            enabled: true,
            scope: "all".to_owned(),
        }),
    )
    .await;

    let status = result
        .err()
        .map(|error| error.into_response().status())
        .unwrap_or(StatusCode::OK);
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleting_a_parent_without_policy_conflicts() {
    let state = test_state();
    let admin = Principal::new("admin", None, TenantId::new());
    let parent = create_role(&state, &admin, "principal", None).await;
    let child = create_role(&state, &admin, "hod", Some(parent.role_id.as_str())).await;

    let rejected = roles::delete_role_handler(
        State(state.clone()),
        Extension(admin.clone()),
        Path(parent.role_id.clone()),
        Query(DeleteRoleQuery::default()),
    )
    .await;
    let status = rejected
        .err()
        .map(|error| error.into_response().status())
        .unwrap_or(StatusCode::OK);
    assert_eq!(status, StatusCode::CONFLICT);

    let cascaded = roles::delete_role_handler(
        State(state.clone()),
        Extension(admin.clone()),
        Path(parent.role_id.clone()),
        Query(DeleteRoleQuery {
            policy: Some("cascade".to_owned()),
            reassign_to: None,
        }),
    )
    .await;
    assert!(cascaded.is_ok());
    let Json(deletion) = cascaded.unwrap_or_else(|_| unreachable!());
    assert_eq!(deletion.removed_role_ids.len(), 2);
    assert!(deletion.removed_role_ids.contains(&child.role_id));

    let missing_target = roles::delete_role_handler(
        State(state.clone()),
        Extension(admin),
        Path(parent.role_id),
        Query(DeleteRoleQuery {
            policy: Some("reassign".to_owned()),
            reassign_to: None,
        }),
    )
    .await;
    let status = missing_target
        .err()
        .map(|error| error.into_response().status())
        .unwrap_or(StatusCode::OK);
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn principal_without_roles_is_forbidden_to_authorize() {
    let state = test_state();
    let result = access::authorize_handler(
        State(state),
        Extension(Principal::new("visitor", None, TenantId::new())),
        Json(CheckAccessRequest {
            resource: "fees".to_owned(),
            action: "collect".to_owned(),
            timeout_ms: None,
        }),
    )
    .await;

    let status = result
        .err()
        .map(|error| error.into_response().status())
        .unwrap_or(StatusCode::OK);
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn resolve_never_widens_past_the_grant() {
    let state = test_state();
    let tenant_id = TenantId::new();
    let admin = Principal::new("admin", None, tenant_id);
    let hod = create_role(&state, &admin, "hod", None).await;
    set_entry(&state, &admin, hod.role_id.as_str(), "department").await;

    let assigned = assignments::assign_role_handler(
        State(state.clone()),
        Extension(admin.clone()),
        Json(AssignRoleRequest {
            subject: "u2".to_owned(),
            role_id: hod.role_id.clone(),
            valid_from: None,
            valid_until: None,
        }),
    )
    .await;
    assert!(assigned.is_ok());

    for (subject, expected_kind) in [("u2", "department"), ("visitor", "deny")] {
        let resolved = access::resolve_scope_handler(
            State(state.clone()),
            Extension(Principal::new(subject, Some("science".to_owned()), tenant_id)),
            Json(ResolveScopeRequest {
                resource: "students".to_owned(),
                action: "read".to_owned(),
                scope: "all".to_owned(),
            }),
        )
        .await;
        assert!(resolved.is_ok());
        let Json(filter) = resolved.unwrap_or_else(|_| unreachable!());
        assert_eq!(filter.kind, expected_kind);
    }
}

#[tokio::test]
async fn rebuild_reports_derived_links() {
    let state = test_state();
    let tenant_id = TenantId::new();
    let admin = Principal::new("admin", None, tenant_id);
    let leader = create_role(&state, &admin, "hod", None).await;
    let member = create_role(&state, &admin, "teacher", Some(leader.role_id.as_str())).await;
    set_entry(&state, &admin, leader.role_id.as_str(), "team").await;

    for (subject, role_id) in [("lead", &leader.role_id), ("member", &member.role_id)] {
        let assigned = assignments::assign_role_handler(
            State(state.clone()),
            Extension(admin.clone()),
            Json(AssignRoleRequest {
                subject: subject.to_owned(),
                role_id: role_id.clone(),
                valid_from: None,
                valid_until: None,
            }),
        )
        .await;
        assert!(assigned.is_ok());
    }

    let rebuilt =
        team_links::rebuild_team_links_handler(State(state.clone()), Extension(admin.clone()))
            .await;
    assert!(rebuilt.is_ok());
    let Json(rebuilt) = rebuilt.unwrap_or_else(|_| unreachable!());
    assert_eq!(rebuilt.link_count, 1);

    let members = access::team_members_handler(
        State(state),
        Extension(Principal::new("lead", None, tenant_id)),
        Query(crate::dto::TeamMembersQuery {
            resource: "students".to_owned(),
        }),
    )
    .await;
    assert!(members.is_ok());
    let Json(members) = members.unwrap_or_else(|_| unreachable!());
    assert_eq!(members.members, vec!["member".to_owned()]);
}

#[tokio::test]
async fn health_is_ready_without_external_dependencies() {
    let (status, Json(body)) = health::health_handler(State(test_state())).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.ready);
    assert_eq!(body.postgres.status, "disabled");
    assert_eq!(body.redis.status, "disabled");
}
