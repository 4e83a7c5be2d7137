use std::fmt::Write;

use async_trait::async_trait;
use rolegraph_core::{AppResult, TenantId};
use rolegraph_domain::{Capability, PermissionDecision, RoleId};
use sha2::{Digest, Sha256};

/// Cache key for one resolved capability of a role set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PermissionCacheKey {
    tenant_id: TenantId,
    role_ids: Vec<RoleId>,
    capability: Capability,
}

impl PermissionCacheKey {
    /// Creates a key; role ids are sorted and deduplicated.
    #[must_use]
    pub fn new(tenant_id: TenantId, role_ids: &[RoleId], capability: Capability) -> Self {
        let mut role_ids = role_ids.to_vec();
        role_ids.sort();
        role_ids.dedup();

        Self {
            tenant_id,
            role_ids,
            capability,
        }
    }

    /// Returns the tenant partition.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the sorted role set.
    #[must_use]
    pub fn role_ids(&self) -> &[RoleId] {
        self.role_ids.as_slice()
    }

    /// Returns the capability.
    #[must_use]
    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    /// Returns the SHA-256 fingerprint of the tenant and sorted role set.
    #[must_use]
    pub fn role_set_fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.tenant_id.to_string().as_bytes());
        for role_id in &self.role_ids {
            hasher.update(b":");
            hasher.update(role_id.to_string().as_bytes());
        }

        hasher
            .finalize()
            .iter()
            .fold(String::with_capacity(64), |mut acc, byte| {
                let _ = write!(acc, "{byte:02x}");
                acc
            })
    }

    /// Returns a flat storage key for key-value caches.
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.tenant_id,
            self.role_set_fingerprint(),
            self.capability
        )
    }
}

/// Port for caching resolved permission decisions.
///
/// Implementations must make `invalidate_roles` drop every entry whose role set
/// contains one of the roles before returning.
#[async_trait]
pub trait PermissionCache: Send + Sync {
    /// Returns a cached decision.
    async fn get(&self, key: &PermissionCacheKey) -> AppResult<Option<PermissionDecision>>;

    /// Stores a decision for at most `ttl_seconds`.
    async fn put(
        &self,
        key: &PermissionCacheKey,
        decision: PermissionDecision,
        ttl_seconds: u32,
    ) -> AppResult<()>;

    /// Drops entries whose role set contains any of the roles.
    async fn invalidate_roles(&self, tenant_id: TenantId, role_ids: &[RoleId]) -> AppResult<()>;

    /// Drops every entry of the tenant.
    async fn invalidate_tenant(&self, tenant_id: TenantId) -> AppResult<()>;
}
