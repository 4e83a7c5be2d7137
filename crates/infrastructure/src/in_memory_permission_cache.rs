use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use rolegraph_application::{PermissionCache, PermissionCacheKey};
use rolegraph_core::{AppResult, TenantId};
use rolegraph_domain::{PermissionDecision, RoleId};
use tokio::sync::RwLock;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
struct PermissionCacheEntry {
    decision: PermissionDecision,
    expires_at: Instant,
}

type TenantEntries = HashMap<PermissionCacheKey, PermissionCacheEntry>;

/// In-memory permission cache partitioned by tenant.
#[derive(Default)]
pub struct InMemoryPermissionCache {
    tenants: RwLock<HashMap<TenantId, TenantEntries>>,
}

impl InMemoryPermissionCache {
    /// Creates an empty in-memory permission cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PermissionCache for InMemoryPermissionCache {
    async fn get(&self, key: &PermissionCacheKey) -> AppResult<Option<PermissionDecision>> {
        {
            let tenants = self.tenants.read().await;
            match tenants
                .get(&key.tenant_id())
                .and_then(|entries| entries.get(key))
            {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Ok(Some(entry.decision));
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        let mut tenants = self.tenants.write().await;
        if let Some(entries) = tenants.get_mut(&key.tenant_id())
            && entries
                .get(key)
                .is_some_and(|entry| entry.expires_at <= Instant::now())
        {
            entries.remove(key);
        }

        Ok(None)
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

        let now = Instant::now();
        let expires_at = now
            .checked_add(Duration::from_secs(u64::from(ttl_seconds)))
            .unwrap_or(now);

        self.tenants
            .write()
            .await
            .entry(key.tenant_id())
            .or_default()
            .insert(
                key.clone(),
                PermissionCacheEntry {
                    decision,
                    expires_at,
                },
            );

        Ok(())
    }

    async fn invalidate_roles(&self, tenant_id: TenantId, role_ids: &[RoleId]) -> AppResult<()> {
        if let Some(entries) = self.tenants.write().await.get_mut(&tenant_id) {
            entries.retain(|key, _| {
                !key.role_ids()
                    .iter()
                    .any(|role_id| role_ids.contains(role_id))
            });
        }

        Ok(())
    }

    async fn invalidate_tenant(&self, tenant_id: TenantId) -> AppResult<()> {
        self.tenants.write().await.remove(&tenant_id);
        Ok(())
    }
}
