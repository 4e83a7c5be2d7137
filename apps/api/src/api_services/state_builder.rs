use std::sync::Arc;

use rolegraph_application::{
    AuditLogRepository, AuditRepository, AuthorizationContext, AuthorizationEngine,
    AuthorizationStore, PermissionCache,
};
use rolegraph_core::AppError;
use rolegraph_infrastructure::{
    InMemoryAuditRepository, InMemoryAuthorizationStore, InMemoryPermissionCache,
    PostgresAuditRepository, PostgresAuthorizationStore, RedisPermissionCache,
};
use sqlx::PgPool;
use tracing::info;

use crate::api_config::{ApiConfig, CacheBackend, StorageBackend};
use crate::state::AppState;

use super::database::connect_and_migrate;
use super::redis::build_redis_client;

const PERMISSION_CACHE_KEY_PREFIX: &str = "rolegraph:permissions";

struct StorageSet {
    store: Arc<dyn AuthorizationStore>,
    audit_repository: Arc<dyn AuditRepository>,
    audit_log_repository: Arc<dyn AuditLogRepository>,
    postgres_pool: Option<PgPool>,
}

pub async fn build_app_state(config: &ApiConfig) -> Result<AppState, AppError> {
    let registry = Arc::new(config.load_registry()?);
    let storage = build_storage(&config.storage).await?;

    let redis_client = match &config.cache {
        CacheBackend::Memory => None,
        CacheBackend::Redis { redis_url } => Some(build_redis_client(redis_url)?),
    };
    let cache: Arc<dyn PermissionCache> = match redis_client.clone() {
        Some(client) => Arc::new(RedisPermissionCache::new(
            client,
            PERMISSION_CACHE_KEY_PREFIX,
        )),
        None => Arc::new(InMemoryPermissionCache::new()),
    };

    info!(
        resources = registry.resources().count(),
        redis_cache = redis_client.is_some(),
        postgres = storage.postgres_pool.is_some(),
        "authorization engine configured"
    );

    let context = AuthorizationContext::new(
        storage.store,
        cache,
        storage.audit_repository,
        registry.clone(),
    );

    Ok(AppState {
        engine: AuthorizationEngine::new(context, config.checker),
        registry,
        audit_log_repository: storage.audit_log_repository,
        admin_token: Arc::from(config.admin_token.as_str()),
        postgres_pool: storage.postgres_pool,
        redis_client,
    })
}

async fn build_storage(storage: &StorageBackend) -> Result<StorageSet, AppError> {
    match storage {
        StorageBackend::Memory => {
            let audit = Arc::new(InMemoryAuditRepository::new());
            Ok(StorageSet {
                store: Arc::new(InMemoryAuthorizationStore::new()),
                audit_repository: audit.clone(),
                audit_log_repository: audit,
                postgres_pool: None,
            })
        }
        StorageBackend::Postgres { database_url } => {
            let pool = connect_and_migrate(database_url).await?;
            let audit = Arc::new(PostgresAuditRepository::new(pool.clone()));
            Ok(StorageSet {
                store: Arc::new(PostgresAuthorizationStore::new(pool.clone())),
                audit_repository: audit.clone(),
                audit_log_repository: audit,
                postgres_pool: Some(pool),
            })
        }
    }
}
