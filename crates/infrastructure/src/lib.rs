//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_audit_repository;
mod in_memory_authorization_store;
mod in_memory_permission_cache;
mod postgres_audit_repository;
mod postgres_authorization_store;
mod redis_permission_cache;

pub use in_memory_audit_repository::InMemoryAuditRepository;
pub use in_memory_authorization_store::InMemoryAuthorizationStore;
pub use in_memory_permission_cache::InMemoryPermissionCache;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_authorization_store::PostgresAuthorizationStore;
pub use redis_permission_cache::RedisPermissionCache;
