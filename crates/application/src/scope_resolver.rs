use std::collections::BTreeSet;

use chrono::Utc;
use rolegraph_core::{AppResult, Principal};
use rolegraph_domain::{FilterSpec, Scope};

use crate::authorization_context::AuthorizationContext;

/// Turns a resolved scope into the record filter a data layer applies.
#[derive(Clone)]
pub struct ScopeResolver {
    context: AuthorizationContext,
}

impl ScopeResolver {
    /// Creates a new resolver from the shared context.
    #[must_use]
    pub fn new(context: AuthorizationContext) -> Self {
        Self { context }
    }

    /// Builds the filter for a principal, capability and scope.
    ///
    /// Scopes that need an owner or department field the resource does not declare,
    /// or a department the principal lacks, fail with `ScopeNotApplicable`.
    pub async fn resolve(
        &self,
        principal: &Principal,
        resource: &str,
        action: &str,
        scope: Scope,
    ) -> AppResult<FilterSpec> {
        self.context
            .registry()
            .validate_capability(resource, action)?;
        let definition = self.context.registry().resource(resource)?;

        let team_members = if scope == Scope::Team {
            self.team_members(principal, resource).await?
        } else {
            BTreeSet::new()
        };

        FilterSpec::for_scope(definition, principal, scope, team_members)
    }

    /// Returns the members linked to the principal for a resource.
    ///
    /// Links are derived from the assignments active now, so a lapsed or newly opened
    /// validity window takes effect without waiting for a stored link rebuild.
    pub async fn team_members(
        &self,
        principal: &Principal,
        resource: &str,
    ) -> AppResult<BTreeSet<String>> {
        self.context.registry().resource(resource)?;

        let tenant_id = principal.tenant_id();
        let _guard = self.context.locks().read(tenant_id).await;
        let snapshot = self.context.load_snapshot(tenant_id).await?;

        Ok(snapshot.team_members_of(principal.subject(), resource, Utc::now()))
    }
}
