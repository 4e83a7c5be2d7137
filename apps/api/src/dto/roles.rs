use rolegraph_application::RoleDeletion;
use rolegraph_domain::Role;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Incoming payload for role creation.
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "create-role-request.ts")]
pub struct CreateRoleRequest {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub is_position: bool,
    #[serde(default)]
    pub display_order: i32,
}

/// Incoming payload for role detail updates; absent fields are kept.
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "update-role-request.ts")]
pub struct UpdateRoleRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_position: Option<bool>,
    #[serde(default)]
    pub display_order: Option<i32>,
}

/// Incoming payload for moving a role; `null` makes it a root.
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "reparent-role-request.ts")]
pub struct ReparentRoleRequest {
    pub parent_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteRoleQuery {
    /// `reject` (default), `cascade` or `reassign`.
    pub policy: Option<String>,
    pub reassign_to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RoleLineageQuery {
    pub include_self: Option<bool>,
}

/// API representation of a role.
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "role-response.ts")]
pub struct RoleResponse {
    pub role_id: String,
    pub name: String,
    pub code: String,
    pub parent_id: Option<String>,
    pub level: u32,
    pub is_position: bool,
    pub display_order: i32,
}

/// Outcome of a role deletion.
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "role-deletion-response.ts")]
pub struct RoleDeletionResponse {
    pub removed_role_ids: Vec<String>,
    pub moved_roles: Vec<RoleResponse>,
    pub reassigned_assignments: u32,
    pub revoked_assignments: u32,
}

impl From<Role> for RoleResponse {
    fn from(value: Role) -> Self {
        Self {
            role_id: value.role_id().to_string(),
            name: value.name().to_owned(),
            code: value.code().to_owned(),
            parent_id: value.parent_id().map(|parent_id| parent_id.to_string()),
            level: value.level(),
            is_position: value.is_position(),
            display_order: value.display_order(),
        }
    }
}

impl From<RoleDeletion> for RoleDeletionResponse {
    fn from(value: RoleDeletion) -> Self {
        Self {
            removed_role_ids: value
                .removed_roles
                .iter()
                .map(ToString::to_string)
                .collect(),
            moved_roles: value
                .moved_roles
                .into_iter()
                .map(RoleResponse::from)
                .collect(),
            reassigned_assignments: u32::try_from(value.reassigned_assignments)
                .unwrap_or(u32::MAX),
            revoked_assignments: u32::try_from(value.revoked_assignments).unwrap_or(u32::MAX),
        }
    }
}
