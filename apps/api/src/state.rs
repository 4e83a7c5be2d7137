use std::sync::Arc;

use rolegraph_application::{AuditLogRepository, AuthorizationEngine};
use rolegraph_domain::PermissionRegistry;
use sqlx::PgPool;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: AuthorizationEngine,
    pub registry: Arc<PermissionRegistry>,
    pub audit_log_repository: Arc<dyn AuditLogRepository>,
    pub admin_token: Arc<str>,
    pub postgres_pool: Option<PgPool>,
    pub redis_client: Option<redis::Client>,
}
