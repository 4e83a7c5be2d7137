use serde::{Deserialize, Serialize};

use crate::TenantId;

/// Already-authenticated actor on whose behalf an operation is authorized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    subject: String,
    department: Option<String>,
    tenant_id: TenantId,
}

impl Principal {
    /// Creates a principal from identity and tenancy data.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        department: Option<String>,
        tenant_id: TenantId,
    ) -> Self {
        Self {
            subject: subject.into(),
            department: department.filter(|value| !value.trim().is_empty()),
            tenant_id,
        }
    }

    /// Returns the stable subject identifier, used as the record owner value.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.subject.as_str()
    }

    /// Returns the department the principal belongs to, when known.
    #[must_use]
    pub fn department(&self) -> Option<&str> {
        self.department.as_deref()
    }

    /// Returns the tenant the principal acts in.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}
