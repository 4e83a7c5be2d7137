use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use rolegraph_application::SetEntryInput;
use rolegraph_core::{AppError, Principal};
use rolegraph_domain::RoleId;

use crate::dto::{
    AccessDecisionResponse, EffectivePermissionRequest, PermissionEntryResponse,
    PermissionGrantResponse, PermissionRegistryResponse, SetPermissionEntryRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn permission_registry_handler(
    State(state): State<AppState>,
) -> Json<PermissionRegistryResponse> {
    Json(PermissionRegistryResponse::from(state.registry.as_ref()))
}

pub async fn list_role_permissions_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(role_id): Path<String>,
) -> ApiResult<Json<Vec<PermissionEntryResponse>>> {
    let entries = state
        .engine
        .matrix()
        .list_entries_for_role(principal.tenant_id(), role_id.parse::<RoleId>()?)
        .await?
        .into_iter()
        .map(PermissionEntryResponse::from)
        .collect();

    Ok(Json(entries))
}

pub async fn get_permission_entry_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((role_id, resource, action)): Path<(String, String, String)>,
) -> ApiResult<Json<PermissionGrantResponse>> {
    let grant = state
        .engine
        .matrix()
        .get_entry(
            principal.tenant_id(),
            role_id.parse::<RoleId>()?,
            resource.as_str(),
            action.as_str(),
        )
        .await?;

    Ok(Json(PermissionGrantResponse::from(grant)))
}

pub async fn set_permission_entry_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((role_id, resource, action)): Path<(String, String, String)>,
    Json(payload): Json<SetPermissionEntryRequest>,
) -> ApiResult<Json<PermissionEntryResponse>> {
    let entry = state
        .engine
        .matrix()
        .set_entry(
            &principal,
            role_id.parse::<RoleId>()?,
            SetEntryInput {
                resource,
                action,
                enabled: payload.enabled,
                scope: payload.scope,
            },
        )
        .await?;

    Ok(Json(PermissionEntryResponse::from(entry)))
}

pub async fn clear_permission_entry_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((role_id, resource, action)): Path<(String, String, String)>,
) -> ApiResult<StatusCode> {
    let removed = state
        .engine
        .matrix()
        .clear_entry(
            &principal,
            role_id.parse::<RoleId>()?,
            resource.as_str(),
            action.as_str(),
        )
        .await?;

    if !removed {
        return Err(AppError::NotFound(format!(
            "role '{role_id}' has no entry for '{resource}.{action}'"
        ))
        .into());
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn effective_permission_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<EffectivePermissionRequest>,
) -> ApiResult<Json<AccessDecisionResponse>> {
    let role_ids = payload
        .role_ids
        .iter()
        .map(|role_id| role_id.parse::<RoleId>())
        .collect::<Result<Vec<_>, _>>()?;

    let decision = state
        .engine
        .matrix()
        .effective_for(
            principal.tenant_id(),
            &role_ids,
            payload.resource.as_str(),
            payload.action.as_str(),
        )
        .await?;

    Ok(Json(AccessDecisionResponse::from(decision)))
}
