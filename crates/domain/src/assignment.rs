use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rolegraph_core::{AppError, AppResult, NonEmptyString, TenantId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::role::RoleId;

/// Unique identifier for a role assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssignmentId(Uuid);

impl AssignmentId {
    /// Creates a new random assignment identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an assignment identifier from an existing UUID value.
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

impl Default for AssignmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for AssignmentId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl FromStr for AssignmentId {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value.trim()).map(Self).map_err(|error| {
            AppError::Validation(format!("invalid assignment id '{value}': {error}"))
        })
    }
}

/// Optional validity window of an assignment; both bounds are inclusive-exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityWindow {
    /// First instant the assignment is active.
    pub valid_from: Option<DateTime<Utc>>,
    /// First instant the assignment is no longer active.
    pub valid_until: Option<DateTime<Utc>>,
}

impl ValidityWindow {
    /// Creates a validated window.
    pub fn new(
        valid_from: Option<DateTime<Utc>>,
        valid_until: Option<DateTime<Utc>>,
    ) -> AppResult<Self> {
        if let (Some(from), Some(until)) = (valid_from, valid_until)
            && from >= until
        {
            return Err(AppError::Validation(format!(
                "valid_from '{from}' must be earlier than valid_until '{until}'"
            )));
        }

        Ok(Self {
            valid_from,
            valid_until,
        })
    }

    /// Returns whether the window contains the instant.
    #[must_use]
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.valid_from.is_none_or(|from| from <= now)
            && self.valid_until.is_none_or(|until| now < until)
    }

    /// Returns whether the window has ended before the instant.
    #[must_use]
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.is_some_and(|until| until <= now)
    }

    /// Returns whether two windows share at least one instant.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        let starts_before_other_ends = match (self.valid_from, other.valid_until) {
            (Some(from), Some(until)) => from < until,
            _ => true,
        };
        let other_starts_before_self_ends = match (other.valid_from, self.valid_until) {
            (Some(from), Some(until)) => from < until,
            _ => true,
        };

        starts_before_other_ends && other_starts_before_self_ends
    }
}

/// Link between a principal and a role within a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    assignment_id: AssignmentId,
    tenant_id: TenantId,
    subject: NonEmptyString,
    role_id: RoleId,
    window: ValidityWindow,
    assigned_by: NonEmptyString,
    assigned_at: DateTime<Utc>,
}

impl RoleAssignment {
    /// Creates a new assignment.
    pub fn new(
        tenant_id: TenantId,
        subject: impl Into<String>,
        role_id: RoleId,
        window: ValidityWindow,
        assigned_by: impl Into<String>,
        assigned_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        Ok(Self {
            assignment_id: AssignmentId::new(),
            tenant_id,
            subject: NonEmptyString::new(subject)?,
            role_id,
            window,
            assigned_by: NonEmptyString::new(assigned_by)?,
            assigned_at,
        })
    }

    /// Rehydrates a stored assignment.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        assignment_id: AssignmentId,
        tenant_id: TenantId,
        subject: impl Into<String>,
        role_id: RoleId,
        valid_from: Option<DateTime<Utc>>,
        valid_until: Option<DateTime<Utc>>,
        assigned_by: impl Into<String>,
        assigned_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        Ok(Self {
            assignment_id,
            tenant_id,
            subject: NonEmptyString::new(subject)?,
            role_id,
            window: ValidityWindow::new(valid_from, valid_until)?,
            assigned_by: NonEmptyString::new(assigned_by)?,
            assigned_at,
        })
    }

    /// Returns the assignment identifier.
    #[must_use]
    pub fn assignment_id(&self) -> AssignmentId {
        self.assignment_id
    }

    /// Returns the owning tenant.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the assigned principal subject.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.subject.as_str()
    }

    /// Returns the assigned role.
    #[must_use]
    pub fn role_id(&self) -> RoleId {
        self.role_id
    }

    /// Returns the validity window.
    #[must_use]
    pub fn window(&self) -> ValidityWindow {
        self.window
    }

    /// Returns the subject that made the assignment.
    #[must_use]
    pub fn assigned_by(&self) -> &str {
        self.assigned_by.as_str()
    }

    /// Returns when the assignment was made.
    #[must_use]
    pub fn assigned_at(&self) -> DateTime<Utc> {
        self.assigned_at
    }

    /// Returns whether the assignment grants its role at the instant.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.window.contains(now)
    }

    /// Replaces the validity window.
    pub fn set_window(&mut self, window: ValidityWindow) {
        self.window = window;
    }

    /// Moves the assignment to another role.
    pub fn move_to_role(&mut self, role_id: RoleId) {
        self.role_id = role_id;
    }
}
