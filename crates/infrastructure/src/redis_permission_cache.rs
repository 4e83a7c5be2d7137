//! Redis-backed permission decision cache.

use async_trait::async_trait;
use redis::{AsyncCommands, Script};
use rolegraph_application::{PermissionCache, PermissionCacheKey};
use rolegraph_core::{AppError, AppResult, TenantId};
use rolegraph_domain::{PermissionDecision, RoleId};

// KEYS[1] is the entry, KEYS[2..] the index sets that must reference it.
const PUT_SCRIPT: &str = r#"
local ttl = tonumber(ARGV[2])
redis.call('SET', KEYS[1], ARGV[1], 'EX', ttl)
for index = 2, #KEYS do
  redis.call('SADD', KEYS[index], KEYS[1])
  if redis.call('TTL', KEYS[index]) < ttl then
    redis.call('EXPIRE', KEYS[index], ttl)
  end
end
return 1
"#;

// KEYS are index sets; every referenced entry and the sets themselves are removed.
const INVALIDATE_SCRIPT: &str = r#"
local removed = 0
for index = 1, #KEYS do
  local members = redis.call('SMEMBERS', KEYS[index])
  for _, member in ipairs(members) do
    removed = removed + redis.call('DEL', member)
  end
  redis.call('DEL', KEYS[index])
end
return removed
"#;

/// Redis implementation of the permission cache port.
///
/// Each entry is referenced from one index set per role of its role set and from a
/// tenant index set, so invalidation removes exactly the affected entries. All keys
/// of a tenant share a hash tag and land on one cluster slot.
#[derive(Clone)]
pub struct RedisPermissionCache {
    client: redis::Client,
    key_prefix: String,
}

impl RedisPermissionCache {
    /// Creates a cache adapter with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn tenant_prefix(&self, tenant_id: TenantId) -> String {
        format!("{}:{{{tenant_id}}}", self.key_prefix)
    }

    fn entry_key(&self, key: &PermissionCacheKey) -> String {
        format!(
            "{}:decision:{}:{}",
            self.tenant_prefix(key.tenant_id()),
            key.role_set_fingerprint(),
            key.capability()
        )
    }

    fn role_index_key(&self, tenant_id: TenantId, role_id: RoleId) -> String {
        format!("{}:role:{role_id}", self.tenant_prefix(tenant_id))
    }

    fn tenant_index_key(&self, tenant_id: TenantId) -> String {
        format!("{}:entries", self.tenant_prefix(tenant_id))
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))
    }

    async fn drop_indexed(&self, index_keys: Vec<String>) -> AppResult<u64> {
        if index_keys.is_empty() {
            return Ok(0);
        }

        let mut connection = self.connection().await?;
        let script = Script::new(INVALIDATE_SCRIPT);
        let mut invocation = script.prepare_invoke();
        for index_key in index_keys {
            invocation.key(index_key);
        }

        invocation
            .invoke_async(&mut connection)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to invalidate permission cache: {error}"))
            })
    }
}

#[async_trait]
impl PermissionCache for RedisPermissionCache {
    async fn get(&self, key: &PermissionCacheKey) -> AppResult<Option<PermissionDecision>> {
        let mut connection = self.connection().await?;
        let encoded: Option<String> =
            connection.get(self.entry_key(key)).await.map_err(|error| {
                AppError::Internal(format!("failed to read permission cache entry: {error}"))
            })?;

        encoded
            .as_deref()
            .map(|value| {
                serde_json::from_str::<PermissionDecision>(value).map_err(|error| {
                    AppError::Internal(format!(
                        "invalid permission cache value '{value}': {error}"
                    ))
                })
            })
            .transpose()
    }

    async fn put(
        &self,
        key: &PermissionCacheKey,
        decision: PermissionDecision,
        ttl_seconds: u32,
    ) -> AppResult<()> {
        if ttl_seconds == 0 {
            return Ok(());
        }

        let value = serde_json::to_string(&decision).map_err(|error| {
            AppError::Internal(format!("failed to encode permission decision: {error}"))
        })?;

        let script = Script::new(PUT_SCRIPT);
        let mut invocation = script.prepare_invoke();
        invocation
            .key(self.entry_key(key))
            .key(self.tenant_index_key(key.tenant_id()));
        for role_id in key.role_ids() {
            invocation.key(self.role_index_key(key.tenant_id(), *role_id));
        }
        invocation.arg(value).arg(ttl_seconds);

        let mut connection = self.connection().await?;
        let _: i64 = invocation
            .invoke_async(&mut connection)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to write permission cache entry: {error}"))
            })?;

        Ok(())
    }

    async fn invalidate_roles(&self, tenant_id: TenantId, role_ids: &[RoleId]) -> AppResult<()> {
        let index_keys = role_ids
            .iter()
            .map(|role_id| self.role_index_key(tenant_id, *role_id))
            .collect();
        self.drop_indexed(index_keys).await?;

        Ok(())
    }

    async fn invalidate_tenant(&self, tenant_id: TenantId) -> AppResult<()> {
        self.drop_indexed(vec![self.tenant_index_key(tenant_id)])
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rolegraph_application::{PermissionCache, PermissionCacheKey};
    use rolegraph_core::TenantId;
    use rolegraph_domain::{Capability, PermissionDecision, RoleId, Scope};

    use super::RedisPermissionCache;

    fn test_cache() -> Option<RedisPermissionCache> {
        let Ok(redis_url) = std::env::var("REDIS_URL") else {
            return None;
        };

        match redis::Client::open(redis_url) {
            Ok(client) => Some(RedisPermissionCache::new(client, "rolegraph-test")),
            Err(error) => panic!("failed to open REDIS_URL in test: {error}"),
        }
    }

    #[test]
    fn keys_of_one_tenant_share_a_hash_tag() {
        let cache = RedisPermissionCache::new(
            redis::Client::open("redis://127.0.0.1/").unwrap_or_else(|_| unreachable!()),
            "rolegraph",
        );
        let tenant_id = TenantId::new();
        let role_id = RoleId::new();
        let key = PermissionCacheKey::new(tenant_id, &[role_id], Capability::new("fees", "read"));
        let tag = format!("{{{tenant_id}}}");

        assert!(cache.entry_key(&key).contains(tag.as_str()));
        assert!(cache.role_index_key(tenant_id, role_id).contains(tag.as_str()));
        assert!(cache.tenant_index_key(tenant_id).contains(tag.as_str()));
    }

    #[tokio::test]
    async fn role_invalidation_removes_indexed_entries() {
        let Some(cache) = test_cache() else {
            return;
        };

        let tenant_id = TenantId::new();
        let clerk = RoleId::new();
        let librarian = RoleId::new();
        let clerk_key =
            PermissionCacheKey::new(tenant_id, &[clerk], Capability::new("fees", "read"));
        let librarian_key =
            PermissionCacheKey::new(tenant_id, &[librarian], Capability::new("library", "issue"));

        for key in [&clerk_key, &librarian_key] {
            let stored = cache
                .put(key, PermissionDecision::allowed(Scope::Department), 60)
                .await;
            assert!(stored.is_ok());
        }
        assert!(cache.invalidate_roles(tenant_id, &[clerk]).await.is_ok());

        assert_eq!(cache.get(&clerk_key).await.ok().flatten(), None);
        assert_eq!(
            cache.get(&librarian_key).await.ok().flatten(),
            Some(PermissionDecision::allowed(Scope::Department))
        );

        assert!(cache.invalidate_tenant(tenant_id).await.is_ok());
        assert_eq!(cache.get(&librarian_key).await.ok().flatten(), None);
    }
}
