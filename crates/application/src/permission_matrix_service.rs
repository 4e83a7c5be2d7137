use std::collections::BTreeSet;

use chrono::Utc;
use rolegraph_core::{AppResult, Principal, TenantId};
use rolegraph_domain::{
    AuditAction, Capability, PermissionDecision, PermissionEntry, PermissionGrant,
    PermissionMatrix, RoleId,
};

use crate::TenantChangeSet;
use crate::authorization_context::{AuthorizationContext, Mutation, audit_event, clamp_events};

/// Input payload for writing one permission matrix entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetEntryInput {
    /// Resource name.
    pub resource: String,
    /// Action name.
    pub action: String,
    /// Whether the capability is switched on.
    pub enabled: bool,
    /// Scope token, one of `none`, `mine`, `team`, `department`, `all`.
    pub scope: String,
}

/// Application service for the per-role permission matrix.
#[derive(Clone)]
pub struct PermissionMatrixService {
    context: AuthorizationContext,
}

impl PermissionMatrixService {
    /// Creates a new service from the shared context.
    #[must_use]
    pub fn new(context: AuthorizationContext) -> Self {
        Self { context }
    }

    /// Writes an entry for a role.
    ///
    /// The scope may not exceed the nearest ancestor defining the capability. Descendant
    /// entries broader than the new scope are narrowed in the same write.
    pub async fn set_entry(
        &self,
        actor: &Principal,
        role_id: RoleId,
        input: SetEntryInput,
    ) -> AppResult<PermissionEntry> {
        let tenant_id = actor.tenant_id();
        let scope = self
            .context
            .registry()
            .validate(&input.resource, &input.action, &input.scope)?;
        let capability = Capability::new(input.resource, input.action);
        let grant = PermissionGrant::new(input.enabled, scope);

        let _guard = self.context.locks().write(tenant_id).await;
        let mut snapshot = self.context.load_snapshot(tenant_id).await?;
        let update = snapshot
            .matrix
            .set_checked(&snapshot.tree, role_id, capability.clone(), grant)?;

        let entry = PermissionEntry {
            tenant_id,
            role_id,
            capability: capability.clone(),
            grant,
        };
        if update.is_empty() {
            return Ok(entry);
        }

        let changed_roles = update.changed_roles();
        let subjects = snapshot.holders_of(&changed_roles);
        let mut invalidated_roles = changed_roles;
        invalidated_roles.extend(snapshot.tree.subtree_ids(role_id));

        let mut events = vec![audit_event(
            actor,
            AuditAction::PermissionEntrySet,
            "permission_entry",
            format!("{role_id}:{capability}"),
            format!(
                "set '{capability}' on role '{role_id}' to enabled={} scope={scope}",
                grant.enabled
            ),
        )];
        events.extend(clamp_events(actor, &update.clamped));

        let mutation = Mutation {
            changes: TenantChangeSet {
                upsert_entries: update.upserted,
                team_links: snapshot.team_links_for(subjects, Utc::now()),
                ..Default::default()
            },
            invalidated_roles,
            events,
        };
        self.context.commit(tenant_id, mutation).await?;

        Ok(entry)
    }

    /// Removes an entry; the role falls back to the disabled default for the capability.
    pub async fn clear_entry(
        &self,
        actor: &Principal,
        role_id: RoleId,
        resource: &str,
        action: &str,
    ) -> AppResult<bool> {
        let tenant_id = actor.tenant_id();
        let capability = self
            .context
            .registry()
            .validate_capability(resource, action)?;

        let _guard = self.context.locks().write(tenant_id).await;
        let mut snapshot = self.context.load_snapshot(tenant_id).await?;
        snapshot.tree.require(role_id)?;

        let update = snapshot.matrix.clear(role_id, &capability);
        if update.is_empty() {
            return Ok(false);
        }

        let subjects = snapshot.holders_of(&BTreeSet::from([role_id]));
        let mutation = Mutation {
            changes: TenantChangeSet {
                delete_entries: update.removed,
                team_links: snapshot.team_links_for(subjects, Utc::now()),
                ..Default::default()
            },
            invalidated_roles: snapshot.tree.subtree_ids(role_id).into_iter().collect(),
            events: vec![audit_event(
                actor,
                AuditAction::PermissionEntryCleared,
                "permission_entry",
                format!("{role_id}:{capability}"),
                format!("cleared '{capability}' on role '{role_id}'"),
            )],
        };
        self.context.commit(tenant_id, mutation).await?;

        Ok(true)
    }

    /// Returns the stored grant or the disabled default.
    pub async fn get_entry(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
        resource: &str,
        action: &str,
    ) -> AppResult<PermissionGrant> {
        let capability = self
            .context
            .registry()
            .validate_capability(resource, action)?;
        let entries = self
            .context
            .store()
            .list_entries_for_roles(tenant_id, &[role_id], &capability)
            .await?;

        Ok(entries
            .into_iter()
            .find(|entry| entry.role_id == role_id)
            .map(|entry| entry.grant)
            .unwrap_or_default())
    }

    /// Lists every entry of a role.
    pub async fn list_entries_for_role(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
    ) -> AppResult<Vec<PermissionEntry>> {
        self.context
            .store()
            .list_entries_for_role(tenant_id, role_id)
            .await
    }

    /// Joins the enabled entries of a role set for one capability.
    pub async fn effective_for(
        &self,
        tenant_id: TenantId,
        role_ids: &[RoleId],
        resource: &str,
        action: &str,
    ) -> AppResult<PermissionDecision> {
        let capability = self
            .context
            .registry()
            .validate_capability(resource, action)?;
        effective_decision(&self.context, tenant_id, role_ids, &capability).await
    }
}

/// Reads the rows of a capability for a role set and joins them.
pub(crate) async fn effective_decision(
    context: &AuthorizationContext,
    tenant_id: TenantId,
    role_ids: &[RoleId],
    capability: &Capability,
) -> AppResult<PermissionDecision> {
    if role_ids.is_empty() {
        return Ok(PermissionDecision::denied());
    }

    let entries = context
        .store()
        .list_entries_for_roles(tenant_id, role_ids, capability)
        .await?;
    let matrix = PermissionMatrix::from_entries(tenant_id, entries)?;

    Ok(matrix.effective_for(role_ids, capability))
}

#[cfg(test)]
mod tests;
