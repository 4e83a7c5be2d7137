//! Per-tenant permission matrix with ancestor scope ceilings.

use std::collections::{BTreeMap, BTreeSet};

use rolegraph_core::{AppError, AppResult, MatrixViolation, TenantId};

use crate::hierarchy::RoleTree;
use crate::permission::{Capability, PermissionDecision, PermissionEntry, PermissionGrant};
use crate::role::RoleId;
use crate::scope::Scope;

/// Descendant entry narrowed to fit a new ancestor ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClampedEntry {
    /// Entry after clamping.
    pub entry: PermissionEntry,
    /// Scope before clamping.
    pub previous_scope: Scope,
    /// Ancestor whose scope became the ceiling.
    pub ceiling_role_id: RoleId,
}

/// Rows changed by one matrix mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatrixUpdate {
    /// Rows to insert or overwrite, including clamped rows.
    pub upserted: Vec<PermissionEntry>,
    /// Subset of `upserted` that was narrowed automatically.
    pub clamped: Vec<ClampedEntry>,
    /// Rows to delete.
    pub removed: Vec<(RoleId, Capability)>,
}

impl MatrixUpdate {
    /// Returns whether the update changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.upserted.is_empty() && self.removed.is_empty()
    }

    /// Returns the roles whose rows changed.
    #[must_use]
    pub fn changed_roles(&self) -> BTreeSet<RoleId> {
        self.upserted
            .iter()
            .map(|entry| entry.role_id)
            .chain(self.removed.iter().map(|(role_id, _)| *role_id))
            .collect()
    }

    /// Appends another update.
    pub fn extend(&mut self, other: Self) {
        self.upserted.extend(other.upserted);
        self.clamped.extend(other.clamped);
        self.removed.extend(other.removed);
    }
}

/// Lookup table of permission entries for one tenant.
#[derive(Debug, Clone)]
pub struct PermissionMatrix {
    tenant_id: TenantId,
    entries: BTreeMap<(RoleId, Capability), PermissionGrant>,
}

impl PermissionMatrix {
    /// Creates an empty matrix.
    #[must_use]
    pub fn new(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            entries: BTreeMap::new(),
        }
    }

    /// Builds a matrix from stored rows.
    pub fn from_entries(tenant_id: TenantId, entries: Vec<PermissionEntry>) -> AppResult<Self> {
        let mut matrix = Self::new(tenant_id);
        for entry in entries {
            if entry.tenant_id != tenant_id {
                return Err(AppError::Internal(format!(
                    "permission entry for role '{}' belongs to tenant '{}' but was loaded for tenant '{tenant_id}'",
                    entry.role_id, entry.tenant_id
                )));
            }
            matrix
                .entries
                .insert((entry.role_id, entry.capability), entry.grant);
        }

        Ok(matrix)
    }

    /// Returns the stored grant, if the role defines the capability.
    #[must_use]
    pub fn entry(&self, role_id: RoleId, capability: &Capability) -> Option<PermissionGrant> {
        self.entries.get(&(role_id, capability.clone())).copied()
    }

    /// Returns the stored grant or the disabled default.
    #[must_use]
    pub fn get(&self, role_id: RoleId, capability: &Capability) -> PermissionGrant {
        self.entry(role_id, capability).unwrap_or_default()
    }

    /// Returns every row of a role in capability order.
    #[must_use]
    pub fn entries_for_role(&self, role_id: RoleId) -> Vec<PermissionEntry> {
        self.entries
            .iter()
            .filter(|((entry_role_id, _), _)| *entry_role_id == role_id)
            .map(|((entry_role_id, capability), grant)| {
                self.to_entry(*entry_role_id, capability.clone(), *grant)
            })
            .collect()
    }

    /// Returns every row of the tenant.
    #[must_use]
    pub fn entries(&self) -> Vec<PermissionEntry> {
        self.entries
            .iter()
            .map(|((role_id, capability), grant)| {
                self.to_entry(*role_id, capability.clone(), *grant)
            })
            .collect()
    }

    /// Returns the nearest proper ancestor defining the capability and its scope.
    ///
    /// The defined scope counts whether or not the ancestor entry is enabled.
    #[must_use]
    pub fn ceiling_for(
        &self,
        tree: &RoleTree,
        role_id: RoleId,
        capability: &Capability,
    ) -> Option<(RoleId, Scope)> {
        tree.ancestor_ids(role_id).into_iter().find_map(|ancestor_id| {
            self.entry(ancestor_id, capability)
                .map(|grant| (ancestor_id, grant.scope))
        })
    }

    /// Writes an entry after checking the ancestor ceiling, then clamps descendants.
    pub fn set_checked(
        &mut self,
        tree: &RoleTree,
        role_id: RoleId,
        capability: Capability,
        grant: PermissionGrant,
    ) -> AppResult<MatrixUpdate> {
        tree.require(role_id)?;

        if let Some((ancestor_role_id, ceiling)) = self.ceiling_for(tree, role_id, &capability)
            && grant.scope > ceiling
        {
            return Err(MatrixViolation::ScopeExceedsParent {
                resource: capability.resource().to_owned(),
                action: capability.action().to_owned(),
                requested: grant.scope.to_string(),
                ceiling: ceiling.to_string(),
                ancestor_role_id: ancestor_role_id.to_string(),
            }
            .into());
        }

        let mut update = MatrixUpdate::default();
        if self.entry(role_id, &capability) != Some(grant) {
            self.entries.insert((role_id, capability.clone()), grant);
            update
                .upserted
                .push(self.to_entry(role_id, capability.clone(), grant));
        }

        update.extend(self.clamp_subtree(tree, role_id, Some(&capability)));
        Ok(update)
    }

    /// Deletes an entry; descendants keep their rows.
    pub fn clear(&mut self, role_id: RoleId, capability: &Capability) -> MatrixUpdate {
        let mut update = MatrixUpdate::default();
        if self.entries.remove(&(role_id, capability.clone())).is_some() {
            update.removed.push((role_id, capability.clone()));
        }

        update
    }

    /// Narrows entries in a subtree that exceed their nearest defining ancestor.
    ///
    /// The subtree root itself is checked too, so the call also repairs a moved subtree.
    pub fn clamp_subtree(
        &mut self,
        tree: &RoleTree,
        root_id: RoleId,
        only: Option<&Capability>,
    ) -> MatrixUpdate {
        let mut update = MatrixUpdate::default();

        for role_id in tree.subtree_ids(root_id) {
            let capabilities: Vec<Capability> = self
                .entries
                .keys()
                .filter(|(entry_role_id, capability)| {
                    *entry_role_id == role_id && only.is_none_or(|only| only == capability)
                })
                .map(|(_, capability)| capability.clone())
                .collect();

            for capability in capabilities {
                let Some((ceiling_role_id, ceiling)) =
                    self.ceiling_for(tree, role_id, &capability)
                else {
                    continue;
                };
                let Some(grant) = self.entries.get_mut(&(role_id, capability.clone())) else {
                    continue;
                };
                if grant.scope <= ceiling {
                    continue;
                }

                let previous_scope = grant.scope;
                grant.scope = ceiling;
                let grant = *grant;
                let entry = self.to_entry(role_id, capability, grant);
                update.upserted.push(entry.clone());
                update.clamped.push(ClampedEntry {
                    entry,
                    previous_scope,
                    ceiling_role_id,
                });
            }
        }

        update
    }

    /// Deletes every row of the given roles.
    pub fn remove_roles(&mut self, role_ids: &[RoleId]) -> MatrixUpdate {
        let mut update = MatrixUpdate::default();
        let doomed: Vec<(RoleId, Capability)> = self
            .entries
            .keys()
            .filter(|(role_id, _)| role_ids.contains(role_id))
            .cloned()
            .collect();

        for key in doomed {
            self.entries.remove(&key);
            update.removed.push(key);
        }

        update
    }

    /// Joins the enabled grants of a role set into one decision.
    ///
    /// The result is allowed when at least one enabled entry has a scope broader than
    /// `none`; the scope is the broadest enabled one.
    #[must_use]
    pub fn effective_for(
        &self,
        role_ids: &[RoleId],
        capability: &Capability,
    ) -> PermissionDecision {
        let scope = role_ids
            .iter()
            .filter_map(|role_id| self.entry(*role_id, capability))
            .filter(|grant| grant.enabled)
            .map(|grant| grant.scope)
            .max()
            .unwrap_or_default();

        PermissionDecision::allowed(scope)
    }

    /// Returns resources on which the role holds an enabled `team` entry.
    #[must_use]
    pub fn team_resources_for(&self, role_id: RoleId) -> BTreeSet<String> {
        self.entries
            .iter()
            .filter(|((entry_role_id, _), grant)| {
                *entry_role_id == role_id && grant.enabled && grant.scope == Scope::Team
            })
            .map(|((_, capability), _)| capability.resource().to_owned())
            .collect()
    }

    /// Returns every (role, ancestor, capability) triple that breaks the ceiling rule.
    #[must_use]
    pub fn ceiling_violations(&self, tree: &RoleTree) -> Vec<(RoleId, RoleId, Capability)> {
        self.entries
            .iter()
            .filter_map(|((role_id, capability), grant)| {
                tree.ancestor_ids(*role_id)
                    .into_iter()
                    .find_map(|ancestor_id| {
                        self.entry(ancestor_id, capability)
                            .filter(|ancestor| grant.scope > ancestor.scope)
                            .map(|_| ancestor_id)
                    })
                    .map(|ancestor_id| (*role_id, ancestor_id, capability.clone()))
            })
            .collect()
    }

    fn to_entry(
        &self,
        role_id: RoleId,
        capability: Capability,
        grant: PermissionGrant,
    ) -> PermissionEntry {
        PermissionEntry {
            tenant_id: self.tenant_id,
            role_id,
            capability,
            grant,
        }
    }
}
