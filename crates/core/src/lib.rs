//! Shared primitives for all Rust crates in Rolegraph.

#![forbid(unsafe_code)]

/// Principal identity handed to the engine by the authenticating layer.
pub mod principal;
/// Typed structural and integrity violations.
pub mod violation;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use principal::Principal;
pub use violation::{HierarchyViolation, MatrixViolation};

/// Result type used across Rolegraph crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value.trim().to_owned()))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

impl Display for NonEmptyString {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Tenant identifier used as the partition key for every persisted resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantId(Uuid);

impl TenantId {
    /// Creates a random tenant identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a tenant identifier from an existing UUID value.
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

impl Default for TenantId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for TenantId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller could not be identified.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Principal is identified but the policy denies the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Role hierarchy mutation was rejected.
    #[error("hierarchy violation: {0}")]
    Hierarchy(#[from] HierarchyViolation),

    /// Permission matrix write or lookup was rejected.
    #[error("permission matrix violation: {0}")]
    Matrix(#[from] MatrixViolation),

    /// Resolved scope cannot be expressed for the resource or principal.
    #[error("scope not applicable: {0}")]
    ScopeNotApplicable(String),

    /// Backing state could not be read before the deadline.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns whether callers must treat the error as a denial of the operation.
    #[must_use]
    pub fn is_fail_closed_denial(&self) -> bool {
        matches!(self, Self::Forbidden(_) | Self::Timeout(_))
    }
}
