use thiserror::Error;

/// Structural rule of the role hierarchy that a mutation would break.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyViolation {
    /// Another role in the tenant already uses the code.
    #[error("role code '{code}' already exists in tenant")]
    DuplicateCode {
        /// Conflicting role code.
        code: String,
    },

    /// Requested parent does not exist in the tenant.
    #[error("parent role '{parent_id}' is not a role of this tenant")]
    InvalidParent {
        /// Requested parent identifier.
        parent_id: String,
    },

    /// Requested parent is the role itself or one of its descendants.
    #[error("role '{role_id}' cannot be placed under '{parent_id}': the parent chain would loop")]
    CyclicParent {
        /// Role being placed.
        role_id: String,
        /// Requested parent.
        parent_id: String,
    },

    /// Requested parent belongs to another tenant.
    #[error("role '{role_id}' cannot reference role '{other_role_id}' from another tenant")]
    CrossTenant {
        /// Role being mutated.
        role_id: String,
        /// Role from the foreign tenant.
        other_role_id: String,
    },

    /// Role still has children and the delete policy forbids removing it.
    #[error("role '{role_id}' still has {child_count} child role(s)")]
    HasChildren {
        /// Role being deleted.
        role_id: String,
        /// Number of direct children.
        child_count: usize,
    },
}

/// Permission matrix integrity rule that a write would break.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatrixViolation {
    /// Resource is not part of the permission registry.
    #[error("unknown resource '{resource}'")]
    UnknownResource {
        /// Requested resource.
        resource: String,
    },

    /// Action is not registered for the resource.
    #[error("unknown action '{action}' for resource '{resource}'")]
    UnknownAction {
        /// Requested resource.
        resource: String,
        /// Requested action.
        action: String,
    },

    /// Scope token is not one of the registered scope levels.
    #[error("unknown scope '{scope}'")]
    UnknownScope {
        /// Requested scope token.
        scope: String,
    },

    /// Granted scope is broader than the nearest ancestor defining the capability.
    #[error(
        "scope '{requested}' for '{resource}.{action}' exceeds '{ceiling}' granted by ancestor role '{ancestor_role_id}'"
    )]
    ScopeExceedsParent {
        /// Resource of the capability.
        resource: String,
        /// Action of the capability.
        action: String,
        /// Scope requested for the role.
        requested: String,
        /// Scope of the nearest defining ancestor.
        ceiling: String,
        /// Nearest ancestor defining the capability.
        ancestor_role_id: String,
    },
}
