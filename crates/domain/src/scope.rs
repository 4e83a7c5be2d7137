use std::fmt::{Display, Formatter};
use std::str::FromStr;

use rolegraph_core::{AppError, MatrixViolation};
use serde::{Deserialize, Serialize};

/// Breadth of records a granted permission applies to.
///
/// Variants are declared narrowest first, so the derived ordering is the breadth order
/// `none < mine < team < department < all`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// No records.
    #[default]
    None,
    /// Records owned by the principal.
    Mine,
    /// Records owned by the principal or its team members.
    Team,
    /// Records of the principal's department.
    Department,
    /// Every record of the tenant.
    All,
}

impl Scope {
    /// Returns a stable storage value for this scope.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Mine => "mine",
            Self::Team => "team",
            Self::Department => "department",
            Self::All => "all",
        }
    }

    /// Returns all scopes, narrowest first.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Scope] = &[
            Scope::None,
            Scope::Mine,
            Scope::Team,
            Scope::Department,
            Scope::All,
        ];

        ALL
    }

    /// Returns whether `self` is not broader than `other`.
    #[must_use]
    pub fn is_within(self, other: Self) -> bool {
        self <= other
    }
}

impl Display for Scope {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "none" => Ok(Self::None),
            "mine" => Ok(Self::Mine),
            "team" => Ok(Self::Team),
            "department" => Ok(Self::Department),
            "all" => Ok(Self::All),
            _ => Err(MatrixViolation::UnknownScope {
                scope: value.to_owned(),
            }
            .into()),
        }
    }
}
