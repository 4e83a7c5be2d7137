use std::str::FromStr;

use rolegraph_core::AppError;
use serde::{Deserialize, Serialize};

/// Stable audit actions emitted by authorization use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a role is created.
    RoleCreated,
    /// Emitted when descriptive role fields change.
    RoleUpdated,
    /// Emitted when a role moves to a new parent.
    RoleReparented,
    /// Emitted when a role is deleted.
    RoleDeleted,
    /// Emitted when a permission entry is written.
    PermissionEntrySet,
    /// Emitted when a permission entry is removed.
    PermissionEntryCleared,
    /// Emitted when a descendant entry is narrowed to a new ceiling.
    PermissionEntryClamped,
    /// Emitted when a role is assigned to a subject.
    RoleAssigned,
    /// Emitted when an assignment's validity window or role changes.
    RoleAssignmentUpdated,
    /// Emitted when an assignment is removed.
    RoleRevoked,
    /// Emitted when a check denies a capability.
    AccessDenied,
    /// Emitted when a check allows a capability and allowed checks are audited.
    AccessGranted,
    /// Emitted when a check cannot finish before its deadline.
    AccessTimedOut,
    /// Emitted when a tenant's team links are rebuilt from scratch.
    TeamLinksRebuilt,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoleCreated => "role.created",
            Self::RoleUpdated => "role.updated",
            Self::RoleReparented => "role.reparented",
            Self::RoleDeleted => "role.deleted",
            Self::PermissionEntrySet => "permission.entry.set",
            Self::PermissionEntryCleared => "permission.entry.cleared",
            Self::PermissionEntryClamped => "permission.entry.clamped",
            Self::RoleAssigned => "assignment.created",
            Self::RoleAssignmentUpdated => "assignment.updated",
            Self::RoleRevoked => "assignment.revoked",
            Self::AccessDenied => "access.denied",
            Self::AccessGranted => "access.granted",
            Self::AccessTimedOut => "access.timed_out",
            Self::TeamLinksRebuilt => "team_links.rebuilt",
        }
    }

    /// Returns all known actions.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[AuditAction] = &[
            AuditAction::RoleCreated,
            AuditAction::RoleUpdated,
            AuditAction::RoleReparented,
            AuditAction::RoleDeleted,
            AuditAction::PermissionEntrySet,
            AuditAction::PermissionEntryCleared,
            AuditAction::PermissionEntryClamped,
            AuditAction::RoleAssigned,
            AuditAction::RoleAssignmentUpdated,
            AuditAction::RoleRevoked,
            AuditAction::AccessDenied,
            AuditAction::AccessGranted,
            AuditAction::AccessTimedOut,
            AuditAction::TeamLinksRebuilt,
        ];

        ALL
    }
}

impl FromStr for AuditAction {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|action| action.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("unknown audit action '{value}'")))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::AuditAction;

    #[test]
    fn storage_values_are_unique_and_parse_back() {
        for action in AuditAction::all() {
            assert_eq!(AuditAction::from_str(action.as_str()).ok(), Some(*action));
        }
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!(AuditAction::from_str("role.exploded").is_err());
    }
}
