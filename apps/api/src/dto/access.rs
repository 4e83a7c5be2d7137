use rolegraph_domain::{FilterSpec, PermissionDecision};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Incoming payload for a permission check or authorization.
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "check-access-request.ts")]
pub struct CheckAccessRequest {
    pub resource: String,
    pub action: String,
    /// Overrides the configured check deadline.
    #[serde(default)]
    pub timeout_ms: Option<u32>,
}

/// Incoming payload for turning an explicit scope into a record filter.
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "resolve-scope-request.ts")]
pub struct ResolveScopeRequest {
    pub resource: String,
    pub action: String,
    pub scope: String,
}

#[derive(Debug, Deserialize)]
pub struct TeamMembersQuery {
    pub resource: String,
}

/// Effective permission of a principal or role set.
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "access-decision-response.ts")]
pub struct AccessDecisionResponse {
    pub allowed: bool,
    pub scope: String,
}

/// Record filter a data layer applies to its query.
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "record-filter-response.ts")]
pub struct RecordFilterResponse {
    /// One of `deny`, `owner`, `team`, `department`, `unrestricted`.
    pub kind: &'static str,
    pub field: Option<String>,
    pub values: Vec<String>,
}

/// Subjects linked to the calling leader for a resource.
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "team-members-response.ts")]
pub struct TeamMembersResponse {
    pub leader_subject: String,
    pub resource: String,
    pub members: Vec<String>,
}

impl From<PermissionDecision> for AccessDecisionResponse {
    fn from(value: PermissionDecision) -> Self {
        Self {
            allowed: value.allowed,
            scope: value.scope.as_str().to_owned(),
        }
    }
}

impl From<FilterSpec> for RecordFilterResponse {
    fn from(value: FilterSpec) -> Self {
        match value {
            FilterSpec::Deny => Self {
                kind: "deny",
                field: None,
                values: Vec::new(),
            },
            FilterSpec::Owner { field, subject } => Self {
                kind: "owner",
                field: Some(field),
                values: vec![subject],
            },
            FilterSpec::Team { field, owners } => Self {
                kind: "team",
                field: Some(field),
                values: owners.into_iter().collect(),
            },
            FilterSpec::Department { field, department } => Self {
                kind: "department",
                field: Some(field),
                values: vec![department],
            },
            FilterSpec::Unrestricted => Self {
                kind: "unrestricted",
                field: None,
                values: Vec::new(),
            },
        }
    }
}
