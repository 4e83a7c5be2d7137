use rolegraph_domain::{PermissionEntry, PermissionGrant, PermissionRegistry, Scope};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Incoming payload for writing one matrix cell.
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "set-permission-entry-request.ts")]
pub struct SetPermissionEntryRequest {
    pub enabled: bool,
    pub scope: String,
}

/// Incoming payload for evaluating an explicit role set.
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "effective-permission-request.ts")]
pub struct EffectivePermissionRequest {
    pub role_ids: Vec<String>,
    pub resource: String,
    pub action: String,
}

/// API representation of a stored matrix row.
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "permission-entry-response.ts")]
pub struct PermissionEntryResponse {
    pub role_id: String,
    pub resource: String,
    pub action: String,
    pub enabled: bool,
    pub scope: String,
}

/// Matrix cell of one role, `none` when unset.
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "permission-grant-response.ts")]
pub struct PermissionGrantResponse {
    pub enabled: bool,
    pub scope: String,
}

/// Registered resource with its actions and filter fields.
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "resource-definition-response.ts")]
pub struct ResourceDefinitionResponse {
    pub name: String,
    pub actions: Vec<String>,
    pub owner_field: Option<String>,
    pub department_field: Option<String>,
}

/// Resource catalog and scope order, narrowest first.
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "permission-registry-response.ts")]
pub struct PermissionRegistryResponse {
    pub resources: Vec<ResourceDefinitionResponse>,
    pub scopes: Vec<String>,
}

impl From<PermissionEntry> for PermissionEntryResponse {
    fn from(value: PermissionEntry) -> Self {
        Self {
            role_id: value.role_id.to_string(),
            resource: value.capability.resource().to_owned(),
            action: value.capability.action().to_owned(),
            enabled: value.grant.enabled,
            scope: value.grant.scope.as_str().to_owned(),
        }
    }
}

impl From<PermissionGrant> for PermissionGrantResponse {
    fn from(value: PermissionGrant) -> Self {
        Self {
            enabled: value.enabled,
            scope: value.scope.as_str().to_owned(),
        }
    }
}

impl From<&PermissionRegistry> for PermissionRegistryResponse {
    fn from(value: &PermissionRegistry) -> Self {
        Self {
            resources: value
                .resources()
                .map(|definition| ResourceDefinitionResponse {
                    name: definition.name.clone(),
                    actions: definition.actions.iter().cloned().collect(),
                    owner_field: definition.owner_field.clone(),
                    department_field: definition.department_field.clone(),
                })
                .collect(),
            scopes: Scope::all()
                .iter()
                .map(|scope| scope.as_str().to_owned())
                .collect(),
        }
    }
}
