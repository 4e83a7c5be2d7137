use std::sync::Arc;

use rolegraph_application::{AuthorizationContext, AuthorizationEngine, PermissionCheckerConfig};
use rolegraph_domain::PermissionRegistry;
use rolegraph_infrastructure::{
    InMemoryAuditRepository, InMemoryAuthorizationStore, InMemoryPermissionCache,
};

use crate::state::AppState;

pub(crate) const TEST_ADMIN_TOKEN: &str = "test-admin-token-with-32-characters";

/// Builds application state over in-memory adapters.
pub(crate) fn test_state() -> AppState {
    let audit_repository = Arc::new(InMemoryAuditRepository::new());
    let registry = Arc::new(PermissionRegistry::institutional_default());
    let context = AuthorizationContext::new(
        Arc::new(InMemoryAuthorizationStore::new()),
        Arc::new(InMemoryPermissionCache::new()),
        audit_repository.clone(),
        registry.clone(),
    );

    AppState {
        engine: AuthorizationEngine::new(context, PermissionCheckerConfig::default()),
        registry,
        audit_log_repository: audit_repository,
        admin_token: Arc::from(TEST_ADMIN_TOKEN),
        postgres_pool: None,
        redis_client: None,
    }
}
