use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use rolegraph_core::{AppError, AppResult, MatrixViolation};
use serde::{Deserialize, Serialize};

use crate::permission::Capability;
use crate::scope::Scope;

/// Registered resource with its valid actions and the record fields scopes filter on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceDefinition {
    /// Resource name, such as `students`.
    pub name: String,
    /// Valid actions for the resource.
    pub actions: BTreeSet<String>,
    /// Record field holding the owning subject; `mine` and `team` filter on it.
    #[serde(default)]
    pub owner_field: Option<String>,
    /// Record field holding the department; `department` filters on it.
    #[serde(default)]
    pub department_field: Option<String>,
}

impl ResourceDefinition {
    fn new(
        name: &str,
        actions: &[&str],
        owner_field: Option<&str>,
        department_field: Option<&str>,
    ) -> Self {
        Self {
            name: name.to_owned(),
            actions: actions.iter().map(|action| (*action).to_owned()).collect(),
            owner_field: owner_field.map(str::to_owned),
            department_field: department_field.map(str::to_owned),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryDocument {
    resources: Vec<ResourceDefinition>,
}

/// Static catalog of resources, their actions, and the scope order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRegistry {
    resources: BTreeMap<String, ResourceDefinition>,
}

impl PermissionRegistry {
    /// Builds a registry from resource definitions.
    pub fn new(definitions: Vec<ResourceDefinition>) -> AppResult<Self> {
        let mut resources = BTreeMap::new();

        for definition in definitions {
            let name = definition.name.trim();
            if name.is_empty() {
                return Err(AppError::Validation(
                    "registry resource name must not be empty".to_owned(),
                ));
            }
            if definition.actions.is_empty() {
                return Err(AppError::Validation(format!(
                    "registry resource '{name}' must declare at least one action"
                )));
            }
            if definition
                .actions
                .iter()
                .any(|action| action.trim().is_empty() || action.contains('.'))
            {
                return Err(AppError::Validation(format!(
                    "registry resource '{name}' declares an empty or dotted action"
                )));
            }

            let name = name.to_owned();
            if resources.contains_key(&name) {
                return Err(AppError::Validation(format!(
                    "registry resource '{name}' is declared more than once"
                )));
            }
            resources.insert(name, definition);
        }

        Ok(Self { resources })
    }

    /// Parses a registry from its JSON catalog document, rejecting unknown keys.
    pub fn from_json(value: &str) -> AppResult<Self> {
        let document: RegistryDocument = serde_json::from_str(value).map_err(|error| {
            AppError::Validation(format!("invalid permission registry document: {error}"))
        })?;

        Self::new(document.resources)
    }

    /// Built-in catalog for institutional deployments.
    #[must_use]
    pub fn institutional_default() -> Self {
        let definitions = [
            ResourceDefinition::new(
                "students",
                &["read", "create", "update", "delete", "export"],
                Some("created_by"),
                Some("department_id"),
            ),
            ResourceDefinition::new(
                "staff",
                &["read", "create", "update", "delete"],
                Some("created_by"),
                Some("department_id"),
            ),
            ResourceDefinition::new(
                "fees",
                &["read", "create", "update", "delete", "collect"],
                Some("collected_by"),
                Some("department_id"),
            ),
            ResourceDefinition::new(
                "attendance",
                &["read", "create", "update"],
                Some("marked_by"),
                Some("department_id"),
            ),
            ResourceDefinition::new(
                "exams",
                &["read", "create", "update", "delete", "publish"],
                Some("created_by"),
                Some("department_id"),
            ),
            ResourceDefinition::new(
                "inventory",
                &["read", "create", "update", "delete"],
                Some("custodian_id"),
                Some("department_id"),
            ),
            ResourceDefinition::new(
                "library",
                &["read", "issue", "return"],
                Some("issued_by"),
                None,
            ),
            ResourceDefinition::new(
                "notices",
                &["read", "create", "update", "delete", "publish"],
                Some("created_by"),
                Some("department_id"),
            ),
            ResourceDefinition::new("reports", &["read", "export"], Some("generated_by"), None),
            ResourceDefinition::new("roles", &["read", "manage"], None, None),
        ];

        Self {
            resources: definitions
                .into_iter()
                .map(|definition| (definition.name.clone(), definition))
                .collect(),
        }
    }

    /// Returns every registered resource in name order.
    pub fn resources(&self) -> impl Iterator<Item = &ResourceDefinition> {
        self.resources.values()
    }

    /// Returns a resource definition or an unknown-resource violation.
    pub fn resource(&self, resource: &str) -> AppResult<&ResourceDefinition> {
        self.resources.get(resource).ok_or_else(|| {
            MatrixViolation::UnknownResource {
                resource: resource.to_owned(),
            }
            .into()
        })
    }

    /// Validates that the action is registered for the resource.
    pub fn validate_capability(&self, resource: &str, action: &str) -> AppResult<Capability> {
        let definition = self.resource(resource)?;
        if !definition.actions.contains(action) {
            return Err(MatrixViolation::UnknownAction {
                resource: resource.to_owned(),
                action: action.to_owned(),
            }
            .into());
        }

        Ok(Capability::new(resource, action))
    }

    /// Validates a capability and parses its scope token.
    pub fn validate(&self, resource: &str, action: &str, scope: &str) -> AppResult<Scope> {
        self.validate_capability(resource, action)?;
        Scope::from_str(scope)
    }

    /// Returns whether `left` is not broader than `right` under the fixed scope order.
    #[must_use]
    pub fn scope_less_or_equal(left: Scope, right: Scope) -> bool {
        left.is_within(right)
    }
}

impl Default for PermissionRegistry {
    fn default() -> Self {
        Self::institutional_default()
    }
}

#[cfg(test)]
mod tests {
    use rolegraph_core::{AppError, MatrixViolation};

    use super::PermissionRegistry;
    use crate::scope::Scope;

    #[test]
    fn validate_accepts_registered_capability() {
        let registry = PermissionRegistry::institutional_default();
        let scope = registry.validate("students", "read", "department");
        assert_eq!(scope.ok(), Some(Scope::Department));
    }

    #[test]
    fn validate_distinguishes_unknown_parts() {
        let registry = PermissionRegistry::institutional_default();

        assert!(matches!(
            registry.validate("payroll", "read", "all"),
            Err(AppError::Matrix(MatrixViolation::UnknownResource { .. }))
        ));
        assert!(matches!(
            registry.validate("students", "teleport", "all"),
            Err(AppError::Matrix(MatrixViolation::UnknownAction { .. }))
        ));
        assert!(matches!(
            registry.validate("students", "read", "galaxy"),
            Err(AppError::Matrix(MatrixViolation::UnknownScope { .. }))
        ));
    }

    #[test]
    fn scope_order_is_exposed() {
        assert!(PermissionRegistry::scope_less_or_equal(
            Scope::Mine,
            Scope::Team
        ));
        assert!(!PermissionRegistry::scope_less_or_equal(
            Scope::All,
            Scope::Department
        ));
    }

    #[test]
    fn json_catalog_rejects_unknown_keys() {
        let document = r#"{"resources":[{"name":"students","actions":["read"],"owner":"x"}]}"#;
        assert!(PermissionRegistry::from_json(document).is_err());
    }

    #[test]
    fn json_catalog_rejects_duplicate_resources() {
        let document = r#"{"resources":[
            {"name":"students","actions":["read"]},
            {"name":"students","actions":["update"]}
        ]}"#;
        assert!(PermissionRegistry::from_json(document).is_err());
    }

    #[test]
    fn json_catalog_loads_fields() {
        let document = r#"{"resources":[
            {"name":"grades","actions":["read","update"],"owner_field":"teacher_id"}
        ]}"#;
        let registry = PermissionRegistry::from_json(document).unwrap_or_default();
        let definition = registry.resource("grades");

        assert!(definition.is_ok());
        if let Ok(definition) = definition {
            assert_eq!(definition.owner_field.as_deref(), Some("teacher_id"));
            assert_eq!(definition.department_field, None);
        }
    }
}
