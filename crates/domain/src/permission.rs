use std::fmt::{Display, Formatter};

use rolegraph_core::TenantId;
use serde::{Deserialize, Serialize};

use crate::role::RoleId;
use crate::scope::Scope;

/// Resource and action pair a permission entry is keyed on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Capability {
    resource: String,
    action: String,
}

impl Capability {
    /// Creates a capability; callers validate it against the registry.
    #[must_use]
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
        }
    }

    /// Returns the resource name.
    #[must_use]
    pub fn resource(&self) -> &str {
        self.resource.as_str()
    }

    /// Returns the action name.
    #[must_use]
    pub fn action(&self) -> &str {
        self.action.as_str()
    }
}

impl Display for Capability {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}.{}", self.resource, self.action)
    }
}

/// Stored grant value of a permission entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionGrant {
    /// Whether the capability is switched on.
    pub enabled: bool,
    /// Breadth of records the capability applies to.
    pub scope: Scope,
}

impl PermissionGrant {
    /// Creates a grant value.
    #[must_use]
    pub fn new(enabled: bool, scope: Scope) -> Self {
        Self { enabled, scope }
    }

    /// Returns whether the grant lets the holder act on at least one record.
    #[must_use]
    pub fn is_effective(&self) -> bool {
        self.enabled && self.scope > Scope::None
    }
}

/// One row of the permission matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionEntry {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Role the entry belongs to.
    pub role_id: RoleId,
    /// Resource and action.
    pub capability: Capability,
    /// Granted value.
    pub grant: PermissionGrant,
}

/// Result of resolving a capability for a set of roles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDecision {
    /// Whether the capability is allowed.
    pub allowed: bool,
    /// Broadest enabled scope; `none` when not allowed.
    pub scope: Scope,
}

impl PermissionDecision {
    /// Decision that denies the capability.
    #[must_use]
    pub fn denied() -> Self {
        Self::default()
    }

    /// Decision that allows the capability at a scope.
    #[must_use]
    pub fn allowed(scope: Scope) -> Self {
        Self {
            allowed: scope > Scope::None,
            scope,
        }
    }
}
