use std::collections::BTreeSet;

use rolegraph_core::{AppError, AppResult, Principal};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry::ResourceDefinition;
use crate::scope::Scope;

/// Record predicate a data layer applies to narrow its query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterSpec {
    /// Return no records.
    Deny,
    /// Records whose owner field equals the subject.
    Owner {
        /// Record field holding the owner.
        field: String,
        /// Principal subject.
        subject: String,
    },
    /// Records whose owner field is one of the team subjects.
    Team {
        /// Record field holding the owner.
        field: String,
        /// Principal subject and its team members.
        owners: BTreeSet<String>,
    },
    /// Records whose department field equals the department.
    Department {
        /// Record field holding the department.
        field: String,
        /// Principal department.
        department: String,
    },
    /// Every record of the tenant.
    Unrestricted,
}

impl FilterSpec {
    /// Builds the filter for a resolved scope.
    ///
    /// `team_members` is only read for the `team` scope; the principal is always part
    /// of its own team.
    pub fn for_scope(
        definition: &ResourceDefinition,
        principal: &Principal,
        scope: Scope,
        team_members: BTreeSet<String>,
    ) -> AppResult<Self> {
        match scope {
            Scope::None => Ok(Self::Deny),
            Scope::Mine => Ok(Self::Owner {
                field: owner_field(definition, scope)?,
                subject: principal.subject().to_owned(),
            }),
            Scope::Team => {
                let mut owners = team_members;
                owners.insert(principal.subject().to_owned());
                Ok(Self::Team {
                    field: owner_field(definition, scope)?,
                    owners,
                })
            }
            Scope::Department => {
                let field = definition.department_field.clone().ok_or_else(|| {
                    AppError::ScopeNotApplicable(format!(
                        "resource '{}' has no department field for scope '{scope}'",
                        definition.name
                    ))
                })?;
                let department = principal.department().ok_or_else(|| {
                    AppError::ScopeNotApplicable(format!(
                        "principal '{}' has no department for scope '{scope}' on resource '{}'",
                        principal.subject(),
                        definition.name
                    ))
                })?;

                Ok(Self::Department {
                    field,
                    department: department.to_owned(),
                })
            }
            Scope::All => Ok(Self::Unrestricted),
        }
    }

    /// Returns whether the filter admits no records at all.
    #[must_use]
    pub fn is_deny(&self) -> bool {
        matches!(self, Self::Deny)
    }

    /// Evaluates the filter against a JSON record.
    ///
    /// Missing or non-string fields never match.
    #[must_use]
    pub fn permits(&self, record: &Value) -> bool {
        let field_value = |field: &str| record.get(field).and_then(Value::as_str);

        match self {
            Self::Deny => false,
            Self::Owner { field, subject } => field_value(field) == Some(subject.as_str()),
            Self::Team { field, owners } => {
                field_value(field).is_some_and(|owner| owners.contains(owner))
            }
            Self::Department { field, department } => {
                field_value(field) == Some(department.as_str())
            }
            Self::Unrestricted => true,
        }
    }
}

fn owner_field(definition: &ResourceDefinition, scope: Scope) -> AppResult<String> {
    definition.owner_field.clone().ok_or_else(|| {
        AppError::ScopeNotApplicable(format!(
            "resource '{}' has no owner field for scope '{scope}'",
            definition.name
        ))
    })
}
