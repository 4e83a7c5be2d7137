use axum::Router;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post, put};
use rolegraph_core::AppError;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::{DEPARTMENT_HEADER, PRINCIPAL_HEADER, TENANT_HEADER};
use crate::state::AppState;
use crate::{handlers, middleware};

pub fn build_router(
    app_state: AppState,
    cors_allowed_origin: Option<&str>,
) -> Result<Router, AppError> {
    let access_routes = Router::new()
        .route(
            "/api/access/check",
            post(handlers::access::check_access_handler),
        )
        .route(
            "/api/access/authorize",
            post(handlers::access::authorize_handler),
        )
        .route(
            "/api/access/resolve",
            post(handlers::access::resolve_scope_handler),
        )
        .route(
            "/api/access/team-members",
            get(handlers::access::team_members_handler),
        )
        .route(
            "/api/permissions/registry",
            get(handlers::permissions::permission_registry_handler),
        )
        .route_layer(from_fn(middleware::require_principal));

    let admin_routes = Router::new()
        .route(
            "/api/roles",
            get(handlers::roles::list_roles_handler).post(handlers::roles::create_role_handler),
        )
        .route(
            "/api/roles/{role_id}",
            get(handlers::roles::get_role_handler)
                .patch(handlers::roles::update_role_handler)
                .delete(handlers::roles::delete_role_handler),
        )
        .route(
            "/api/roles/{role_id}/parent",
            put(handlers::roles::reparent_role_handler),
        )
        .route(
            "/api/roles/{role_id}/ancestors",
            get(handlers::roles::role_ancestors_handler),
        )
        .route(
            "/api/roles/{role_id}/descendants",
            get(handlers::roles::role_descendants_handler),
        )
        .route(
            "/api/roles/{role_id}/permissions",
            get(handlers::permissions::list_role_permissions_handler),
        )
        .route(
            "/api/roles/{role_id}/permissions/{resource}/{action}",
            get(handlers::permissions::get_permission_entry_handler)
                .put(handlers::permissions::set_permission_entry_handler)
                .delete(handlers::permissions::clear_permission_entry_handler),
        )
        .route(
            "/api/permissions/effective",
            post(handlers::permissions::effective_permission_handler),
        )
        .route(
            "/api/assignments",
            get(handlers::assignments::list_assignments_handler)
                .post(handlers::assignments::assign_role_handler),
        )
        .route(
            "/api/assignments/active",
            get(handlers::assignments::active_roles_handler),
        )
        .route(
            "/api/assignments/{assignment_id}",
            put(handlers::assignments::update_assignment_validity_handler)
                .delete(handlers::assignments::revoke_assignment_handler),
        )
        .route(
            "/api/team-links",
            get(handlers::team_links::list_team_links_handler),
        )
        .route(
            "/api/team-links/rebuild",
            post(handlers::team_links::rebuild_team_links_handler),
        )
        .route(
            "/api/audit-log",
            get(handlers::audit::list_audit_log_handler),
        )
        .route_layer(from_fn(middleware::require_principal))
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_admin_token,
        ));

    let mut router = Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(access_routes)
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http());

    if let Some(origin) = cors_allowed_origin {
        router = router.layer(build_cors_layer(origin)?);
    }

    Ok(router.with_state(app_state))
}

fn build_cors_layer(origin: &str) -> Result<CorsLayer, AppError> {
    let origin = HeaderValue::from_str(origin)
        .map_err(|error| AppError::Validation(format!("invalid CORS_ALLOWED_ORIGIN: {error}")))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static(TENANT_HEADER),
            HeaderName::from_static(PRINCIPAL_HEADER),
            HeaderName::from_static(DEPARTMENT_HEADER),
        ]))
}
