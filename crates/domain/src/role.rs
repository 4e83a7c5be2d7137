use std::fmt::{Display, Formatter};
use std::str::FromStr;

use rolegraph_core::{AppError, AppResult, NonEmptyString, TenantId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleId(Uuid);

impl RoleId {
    /// Creates a new random role identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a role identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RoleId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl FromStr for RoleId {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|error| AppError::Validation(format!("invalid role id '{value}': {error}")))
    }
}

/// Organizational role placed in a tenant hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    role_id: RoleId,
    tenant_id: TenantId,
    name: NonEmptyString,
    code: NonEmptyString,
    parent_id: Option<RoleId>,
    level: u32,
    is_position: bool,
    display_order: i32,
}

/// Input for describing a role before it is placed in the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDraft {
    /// Human-readable role name.
    pub name: String,
    /// Tenant-unique role code.
    pub code: String,
    /// Optional parent role.
    pub parent_id: Option<RoleId>,
    /// Marks an organizational seat rather than an abstract label.
    pub is_position: bool,
    /// Sibling ordering hint.
    pub display_order: i32,
}

impl Role {
    /// Builds a new role from a draft; `level` is assigned when the role joins a tree.
    pub fn from_draft(tenant_id: TenantId, draft: RoleDraft) -> AppResult<Self> {
        let code = NonEmptyString::new(draft.code)?;
        if code.as_str().chars().any(char::is_whitespace) {
            return Err(AppError::Validation(format!(
                "role code '{}' must not contain whitespace",
                code.as_str()
            )));
        }

        Ok(Self {
            role_id: RoleId::new(),
            tenant_id,
            name: NonEmptyString::new(draft.name)?,
            code,
            parent_id: draft.parent_id,
            level: 0,
            is_position: draft.is_position,
            display_order: draft.display_order,
        })
    }

    /// Rehydrates a stored role without re-running draft validation.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        role_id: RoleId,
        tenant_id: TenantId,
        name: impl Into<String>,
        code: impl Into<String>,
        parent_id: Option<RoleId>,
        level: u32,
        is_position: bool,
        display_order: i32,
    ) -> AppResult<Self> {
        Ok(Self {
            role_id,
            tenant_id,
            name: NonEmptyString::new(name)?,
            code: NonEmptyString::new(code)?,
            parent_id,
            level,
            is_position,
            display_order,
        })
    }

    /// Returns the role identifier.
    #[must_use]
    pub fn role_id(&self) -> RoleId {
        self.role_id
    }

    /// Returns the owning tenant.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the role name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the tenant-unique code.
    #[must_use]
    pub fn code(&self) -> &str {
        self.code.as_str()
    }

    /// Returns the parent role, if any.
    #[must_use]
    pub fn parent_id(&self) -> Option<RoleId> {
        self.parent_id
    }

    /// Returns the depth in the tree; roots are level 0.
    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Returns whether the role is an organizational seat.
    #[must_use]
    pub fn is_position(&self) -> bool {
        self.is_position
    }

    /// Returns the sibling ordering hint.
    #[must_use]
    pub fn display_order(&self) -> i32 {
        self.display_order
    }

    /// Replaces descriptive fields that do not affect the hierarchy.
    pub fn update_details(
        &mut self,
        name: Option<String>,
        is_position: Option<bool>,
        display_order: Option<i32>,
    ) -> AppResult<()> {
        if let Some(name) = name {
            self.name = NonEmptyString::new(name)?;
        }
        if let Some(is_position) = is_position {
            self.is_position = is_position;
        }
        if let Some(display_order) = display_order {
            self.display_order = display_order;
        }

        Ok(())
    }

    pub(crate) fn set_parent(&mut self, parent_id: Option<RoleId>) {
        self.parent_id = parent_id;
    }

    pub(crate) fn set_level(&mut self, level: u32) {
        self.level = level;
    }
}
