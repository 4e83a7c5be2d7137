use chrono::{DateTime, SecondsFormat, Utc};
use rolegraph_domain::{RoleAssignment, RoleId};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Incoming payload for assigning a role to a subject.
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "assign-role-request.ts")]
pub struct AssignRoleRequest {
    pub subject: String,
    pub role_id: String,
    #[serde(default)]
    #[ts(type = "string | null")]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    #[ts(type = "string | null")]
    pub valid_until: Option<DateTime<Utc>>,
}

/// Incoming payload replacing an assignment's validity window.
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "update-assignment-validity-request.ts")]
pub struct UpdateAssignmentValidityRequest {
    #[serde(default)]
    #[ts(type = "string | null")]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    #[ts(type = "string | null")]
    pub valid_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AssignmentListQuery {
    pub subject: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ActiveRolesQuery {
    pub subject: String,
}

/// API representation of a role assignment.
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "role-assignment-response.ts")]
pub struct RoleAssignmentResponse {
    pub assignment_id: String,
    pub subject: String,
    pub role_id: String,
    pub valid_from: Option<String>,
    pub valid_until: Option<String>,
    pub assigned_by: String,
    pub assigned_at: String,
}

/// Roles a subject holds right now.
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "active-roles-response.ts")]
pub struct ActiveRolesResponse {
    pub subject: String,
    pub role_ids: Vec<String>,
}

impl ActiveRolesResponse {
    pub fn new(subject: String, role_ids: &[RoleId]) -> Self {
        Self {
            subject,
            role_ids: role_ids.iter().map(ToString::to_string).collect(),
        }
    }
}

fn rfc3339(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl From<RoleAssignment> for RoleAssignmentResponse {
    fn from(value: RoleAssignment) -> Self {
        let window = value.window();
        Self {
            assignment_id: value.assignment_id().to_string(),
            subject: value.subject().to_owned(),
            role_id: value.role_id().to_string(),
            valid_from: window.valid_from.map(rfc3339),
            valid_until: window.valid_until.map(rfc3339),
            assigned_by: value.assigned_by().to_owned(),
            assigned_at: rfc3339(value.assigned_at()),
        }
    }
}
