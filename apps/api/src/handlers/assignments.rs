use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use chrono::Utc;
use rolegraph_application::AssignRoleInput;
use rolegraph_core::Principal;
use rolegraph_domain::{AssignmentId, RoleId};

use crate::dto::{
    ActiveRolesQuery, ActiveRolesResponse, AssignRoleRequest, AssignmentListQuery,
    RoleAssignmentResponse, UpdateAssignmentValidityRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_assignments_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<AssignmentListQuery>,
) -> ApiResult<Json<Vec<RoleAssignmentResponse>>> {
    let assignments = state
        .engine
        .assignments()
        .list_assignments(principal.tenant_id(), query.subject.as_deref())
        .await?
        .into_iter()
        .map(RoleAssignmentResponse::from)
        .collect();

    Ok(Json(assignments))
}

pub async fn assign_role_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<AssignRoleRequest>,
) -> ApiResult<(StatusCode, Json<RoleAssignmentResponse>)> {
    let assignment = state
        .engine
        .assignments()
        .assign_role(
            &principal,
            AssignRoleInput {
                subject: payload.subject,
                role_id: payload.role_id.parse::<RoleId>()?,
                valid_from: payload.valid_from,
                valid_until: payload.valid_until,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RoleAssignmentResponse::from(assignment)),
    ))
}

pub async fn update_assignment_validity_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(assignment_id): Path<String>,
    Json(payload): Json<UpdateAssignmentValidityRequest>,
) -> ApiResult<Json<RoleAssignmentResponse>> {
    let assignment = state
        .engine
        .assignments()
        .update_validity(
            &principal,
            assignment_id.parse::<AssignmentId>()?,
            payload.valid_from,
            payload.valid_until,
        )
        .await?;

    Ok(Json(RoleAssignmentResponse::from(assignment)))
}

pub async fn revoke_assignment_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(assignment_id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .engine
        .assignments()
        .revoke(&principal, assignment_id.parse::<AssignmentId>()?)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn active_roles_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ActiveRolesQuery>,
) -> ApiResult<Json<ActiveRolesResponse>> {
    let role_ids = state
        .engine
        .assignments()
        .active_role_ids(principal.tenant_id(), query.subject.as_str(), Utc::now())
        .await?;

    Ok(Json(ActiveRolesResponse::new(query.subject, &role_ids)))
}
