use axum::Json;
use axum::extract::{Extension, State};
use rolegraph_core::Principal;

use crate::dto::{TeamLinkRebuildResponse, TeamLinkResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_team_links_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<Vec<TeamLinkResponse>>> {
    let links = state
        .engine
        .team_linker()
        .list_links(principal.tenant_id())
        .await?
        .into_iter()
        .map(TeamLinkResponse::from)
        .collect();

    Ok(Json(links))
}

pub async fn rebuild_team_links_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<TeamLinkRebuildResponse>> {
    let link_count = state
        .engine
        .team_linker()
        .rebuild_tenant(&principal)
        .await?;

    Ok(Json(TeamLinkRebuildResponse {
        link_count: u32::try_from(link_count).unwrap_or(u32::MAX),
    }))
}
