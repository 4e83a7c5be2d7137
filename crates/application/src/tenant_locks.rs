use std::collections::HashMap;
use std::sync::Arc;

use rolegraph_core::TenantId;
use tokio::sync::{Mutex, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

/// Process-local read/write locks partitioned by tenant.
///
/// Mutations hold the write side from snapshot load through cache invalidation.
/// Checks hold the read side while they compute and cache a decision, so a decision
/// computed from pre-write rows cannot be cached after the write invalidated it.
#[derive(Clone, Default)]
pub struct TenantLocks {
    locks: Arc<Mutex<HashMap<TenantId, Arc<RwLock<()>>>>>,
}

impl TenantLocks {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for shared access to a tenant.
    pub async fn read(&self, tenant_id: TenantId) -> OwnedRwLockReadGuard<()> {
        self.lock_for(tenant_id).await.read_owned().await
    }

    /// Waits for exclusive access to a tenant.
    pub async fn write(&self, tenant_id: TenantId) -> OwnedRwLockWriteGuard<()> {
        self.lock_for(tenant_id).await.write_owned().await
    }

    async fn lock_for(&self, tenant_id: TenantId) -> Arc<RwLock<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(tenant_id).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rolegraph_core::TenantId;

    use super::TenantLocks;

    #[tokio::test]
    async fn writers_exclude_readers_of_the_same_tenant() {
        let locks = TenantLocks::new();
        let tenant_id = TenantId::new();

        let guard = locks.write(tenant_id).await;
        let blocked = tokio::time::timeout(Duration::from_millis(20), locks.read(tenant_id)).await;
        assert!(blocked.is_err());

        drop(guard);
        let reader = tokio::time::timeout(Duration::from_millis(20), locks.read(tenant_id)).await;
        assert!(reader.is_ok());
    }

    #[tokio::test]
    async fn tenants_do_not_block_each_other() {
        let locks = TenantLocks::new();

        let _guard = locks.write(TenantId::new()).await;
        let other = tokio::time::timeout(
            Duration::from_millis(20),
            locks.write(TenantId::new()),
        )
        .await;

        assert!(other.is_ok());
    }
}
