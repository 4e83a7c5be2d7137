use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use rolegraph_application::UpdateRoleInput;
use rolegraph_core::{AppError, Principal};
use rolegraph_domain::{RoleDeletePolicy, RoleDraft, RoleId};

use crate::dto::{
    CreateRoleRequest, DeleteRoleQuery, ReparentRoleRequest, RoleDeletionResponse,
    RoleLineageQuery, RoleResponse, UpdateRoleRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_roles_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let roles = state
        .engine
        .hierarchy()
        .list_roles(principal.tenant_id())
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}

pub async fn get_role_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(role_id): Path<String>,
) -> ApiResult<Json<RoleResponse>> {
    let role = state
        .engine
        .hierarchy()
        .get_role(principal.tenant_id(), role_id.parse::<RoleId>()?)
        .await?;

    Ok(Json(RoleResponse::from(role)))
}

pub async fn create_role_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<CreateRoleRequest>,
) -> ApiResult<(StatusCode, Json<RoleResponse>)> {
    let parent_id = payload
        .parent_id
        .as_deref()
        .map(str::parse::<RoleId>)
        .transpose()?;

    let role = state
        .engine
        .hierarchy()
        .create_role(
            &principal,
            RoleDraft {
                name: payload.name,
                code: payload.code,
                parent_id,
                is_position: payload.is_position,
                display_order: payload.display_order,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(RoleResponse::from(role))))
}

pub async fn update_role_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(role_id): Path<String>,
    Json(payload): Json<UpdateRoleRequest>,
) -> ApiResult<Json<RoleResponse>> {
    let role = state
        .engine
        .hierarchy()
        .update_role_details(
            &principal,
            role_id.parse::<RoleId>()?,
            UpdateRoleInput {
                name: payload.name,
                is_position: payload.is_position,
                display_order: payload.display_order,
            },
        )
        .await?;

    Ok(Json(RoleResponse::from(role)))
}

pub async fn reparent_role_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(role_id): Path<String>,
    Json(payload): Json<ReparentRoleRequest>,
) -> ApiResult<Json<RoleResponse>> {
    let parent_id = payload
        .parent_id
        .as_deref()
        .map(str::parse::<RoleId>)
        .transpose()?;

    let role = state
        .engine
        .hierarchy()
        .reparent(&principal, role_id.parse::<RoleId>()?, parent_id)
        .await?;

    Ok(Json(RoleResponse::from(role)))
}

pub async fn delete_role_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(role_id): Path<String>,
    Query(query): Query<DeleteRoleQuery>,
) -> ApiResult<Json<RoleDeletionResponse>> {
    let policy = delete_policy(&query)?;
    let deletion = state
        .engine
        .hierarchy()
        .delete_role(&principal, role_id.parse::<RoleId>()?, policy)
        .await?;

    Ok(Json(RoleDeletionResponse::from(deletion)))
}

pub async fn role_ancestors_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(role_id): Path<String>,
    Query(query): Query<RoleLineageQuery>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let roles = state
        .engine
        .hierarchy()
        .ancestors(
            principal.tenant_id(),
            role_id.parse::<RoleId>()?,
            query.include_self.unwrap_or(false),
        )
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}

pub async fn role_descendants_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(role_id): Path<String>,
    Query(query): Query<RoleLineageQuery>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let roles = state
        .engine
        .hierarchy()
        .descendants(
            principal.tenant_id(),
            role_id.parse::<RoleId>()?,
            query.include_self.unwrap_or(false),
        )
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}

fn delete_policy(query: &DeleteRoleQuery) -> Result<RoleDeletePolicy, AppError> {
    match query.policy.as_deref().unwrap_or("reject") {
        "reject" => Ok(RoleDeletePolicy::RejectIfChildren),
        "cascade" => Ok(RoleDeletePolicy::Cascade),
        "reassign" => {
            let target = query.reassign_to.as_deref().ok_or_else(|| {
                AppError::Validation("reassign policy requires reassign_to".to_owned())
            })?;
            Ok(RoleDeletePolicy::Reassign(target.parse::<RoleId>()?))
        }
        other => Err(AppError::Validation(format!(
            "delete policy must be 'reject', 'cascade' or 'reassign', got '{other}'"
        ))),
    }
}
