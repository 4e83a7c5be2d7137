use std::time::Duration;

use axum::Json;
use axum::extract::{Extension, Query, State};
use rolegraph_core::Principal;
use rolegraph_domain::Scope;

use crate::dto::{
    AccessDecisionResponse, CheckAccessRequest, RecordFilterResponse, ResolveScopeRequest,
    TeamMembersQuery, TeamMembersResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn check_access_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<CheckAccessRequest>,
) -> ApiResult<Json<AccessDecisionResponse>> {
    let checker = state.engine.checker();
    let decision = match payload.timeout_ms {
        Some(timeout_ms) => {
            checker
                .check_with_deadline(
                    &principal,
                    payload.resource.as_str(),
                    payload.action.as_str(),
                    Duration::from_millis(u64::from(timeout_ms)),
                )
                .await?
        }
        None => {
            checker
                .check(
                    &principal,
                    payload.resource.as_str(),
                    payload.action.as_str(),
                )
                .await?
        }
    };

    Ok(Json(AccessDecisionResponse::from(decision)))
}

pub async fn authorize_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<CheckAccessRequest>,
) -> ApiResult<Json<RecordFilterResponse>> {
    let filter = state
        .engine
        .checker()
        .authorize(
            &principal,
            payload.resource.as_str(),
            payload.action.as_str(),
        )
        .await?;

    Ok(Json(RecordFilterResponse::from(filter)))
}

pub async fn resolve_scope_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<ResolveScopeRequest>,
) -> ApiResult<Json<RecordFilterResponse>> {
    let scope = payload.scope.parse::<Scope>()?;
    let filter = state
        .engine
        .checker()
        .resolve_within_grant(
            &principal,
            payload.resource.as_str(),
            payload.action.as_str(),
            scope,
        )
        .await?;

    Ok(Json(RecordFilterResponse::from(filter)))
}

pub async fn team_members_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<TeamMembersQuery>,
) -> ApiResult<Json<TeamMembersResponse>> {
    let members = state
        .engine
        .resolver()
        .team_members(&principal, query.resource.as_str())
        .await?;

    Ok(Json(TeamMembersResponse {
        leader_subject: principal.subject().to_owned(),
        resource: query.resource,
        members: members.into_iter().collect(),
    }))
}
