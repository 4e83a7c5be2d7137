use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use rolegraph_core::{AppError, Principal, TenantId};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::ApiResult;
use crate::state::AppState;

pub const TENANT_HEADER: &str = "x-tenant-id";
pub const PRINCIPAL_HEADER: &str = "x-principal";
pub const DEPARTMENT_HEADER: &str = "x-department";

/// Reads the already-authenticated principal forwarded by the gateway.
pub async fn require_principal(mut request: Request, next: Next) -> ApiResult<Response> {
    let principal = principal_from_headers(request.headers())?;

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Guards administrative routes with the shared admin bearer token.
pub async fn require_admin_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .unwrap_or_default();

    let matches: bool = presented.as_bytes().ct_eq(state.admin_token.as_bytes()).into();
    if !matches {
        warn!(path = %request.uri().path(), "rejected administrative request");
        return Err(AppError::Unauthorized("admin token required".to_owned()).into());
    }

    Ok(next.run(request).await)
}

pub(crate) fn principal_from_headers(headers: &HeaderMap) -> Result<Principal, AppError> {
    let tenant_id = header_value(headers, TENANT_HEADER)
        .ok_or_else(|| AppError::Unauthorized(format!("{TENANT_HEADER} header is required")))
        .and_then(|value| {
            uuid::Uuid::parse_str(value)
                .map(TenantId::from_uuid)
                .map_err(|error| {
                    AppError::Unauthorized(format!("invalid {TENANT_HEADER} header: {error}"))
                })
        })?;
    let subject = header_value(headers, PRINCIPAL_HEADER)
        .ok_or_else(|| AppError::Unauthorized(format!("{PRINCIPAL_HEADER} header is required")))?;
    let department = header_value(headers, DEPARTMENT_HEADER).map(str::to_owned);

    Ok(Principal::new(subject, department, tenant_id))
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
