//! Tenant role tree with cycle prevention and level bookkeeping.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};

use rolegraph_core::{AppError, AppResult, HierarchyViolation, TenantId};

use crate::role::{Role, RoleId};

/// What happens to the children and assignments of a deleted role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleDeletePolicy {
    /// Children and assignments move to the target role.
    Reassign(RoleId),
    /// The whole subtree is deleted together with its entries and assignments.
    Cascade,
    /// Deletion fails when the role has children.
    RejectIfChildren,
}

/// Outcome of removing a role from a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRemoval {
    /// Deleted roles, leaves first.
    pub removed: Vec<RoleId>,
    /// Roles whose parent or level changed, parents before children.
    pub moved: Vec<Role>,
    /// Role that inherits the assignments of the deleted role.
    pub reassign_to: Option<RoleId>,
}

/// In-memory view of one tenant's role forest.
#[derive(Debug, Clone)]
pub struct RoleTree {
    tenant_id: TenantId,
    roles: HashMap<RoleId, Role>,
    children: HashMap<RoleId, Vec<RoleId>>,
}

impl RoleTree {
    /// Creates an empty tree for a tenant.
    #[must_use]
    pub fn new(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            roles: HashMap::new(),
            children: HashMap::new(),
        }
    }

    /// Builds a tree from stored roles, normalizing levels from the roots down.
    pub fn from_roles(tenant_id: TenantId, roles: Vec<Role>) -> AppResult<Self> {
        let mut tree = Self::new(tenant_id);

        for role in roles {
            if role.tenant_id() != tenant_id {
                return Err(AppError::Internal(format!(
                    "role '{}' belongs to tenant '{}' but was loaded for tenant '{tenant_id}'",
                    role.role_id(),
                    role.tenant_id()
                )));
            }
            tree.roles.insert(role.role_id(), role);
        }

        let mut roots = Vec::new();
        for role in tree.roles.values() {
            match role.parent_id() {
                Some(parent_id) if tree.roles.contains_key(&parent_id) => tree
                    .children
                    .entry(parent_id)
                    .or_default()
                    .push(role.role_id()),
                Some(parent_id) => {
                    return Err(AppError::Internal(format!(
                        "role '{}' references missing parent '{parent_id}'",
                        role.role_id()
                    )));
                }
                None => roots.push(role.role_id()),
            }
        }

        let mut reached = 0_usize;
        for root in roots {
            if let Some(role) = tree.roles.get_mut(&root) {
                role.set_level(0);
            }
            reached += tree.relevel_below(root).len() + 1;
        }

        if reached != tree.roles.len() {
            return Err(AppError::Internal(format!(
                "stored role hierarchy for tenant '{tenant_id}' contains a cycle"
            )));
        }

        Ok(tree)
    }

    /// Returns the tenant the tree belongs to.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the number of roles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Returns whether the tree has no roles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Returns a role by id.
    #[must_use]
    pub fn get(&self, role_id: RoleId) -> Option<&Role> {
        self.roles.get(&role_id)
    }

    /// Returns a role by id or a not-found error.
    pub fn require(&self, role_id: RoleId) -> AppResult<&Role> {
        self.roles.get(&role_id).ok_or_else(|| {
            AppError::NotFound(format!(
                "role '{role_id}' does not exist in tenant '{}'",
                self.tenant_id
            ))
        })
    }

    /// Returns a role by its tenant-unique code.
    #[must_use]
    pub fn find_by_code(&self, code: &str) -> Option<&Role> {
        self.roles.values().find(|role| role.code() == code)
    }

    /// Returns every role ordered by level, display order and name.
    #[must_use]
    pub fn roles(&self) -> Vec<Role> {
        let mut roles: Vec<Role> = self.roles.values().cloned().collect();
        roles.sort_by(compare_roles);
        roles
    }

    /// Returns the direct children of a role.
    #[must_use]
    pub fn child_ids(&self, role_id: RoleId) -> Vec<RoleId> {
        self.children.get(&role_id).cloned().unwrap_or_default()
    }

    /// Returns the ancestor chain, root first.
    pub fn ancestors(&self, role_id: RoleId, include_self: bool) -> AppResult<Vec<Role>> {
        let role = self.require(role_id)?;
        let mut chain = Vec::new();
        if include_self {
            chain.push(role.clone());
        }

        for ancestor_id in self.ancestor_ids(role_id) {
            if let Some(ancestor) = self.roles.get(&ancestor_id) {
                chain.push(ancestor.clone());
            }
        }

        chain.reverse();
        Ok(chain)
    }

    /// Returns proper ancestor ids, nearest first.
    #[must_use]
    pub fn ancestor_ids(&self, role_id: RoleId) -> Vec<RoleId> {
        let mut ids = Vec::new();
        let mut cursor = self.roles.get(&role_id).and_then(Role::parent_id);

        while let Some(current) = cursor {
            if ids.len() > self.roles.len() {
                break;
            }
            ids.push(current);
            cursor = self.roles.get(&current).and_then(Role::parent_id);
        }

        ids
    }

    /// Returns the subtree ordered by level, display order, then name.
    pub fn descendants(&self, role_id: RoleId, include_self: bool) -> AppResult<Vec<Role>> {
        self.require(role_id)?;

        let mut roles: Vec<Role> = self
            .subtree_ids(role_id)
            .into_iter()
            .filter(|id| include_self || *id != role_id)
            .filter_map(|id| self.roles.get(&id).cloned())
            .collect();
        roles.sort_by(compare_roles);

        Ok(roles)
    }

    /// Returns the role and all descendants in breadth-first order.
    #[must_use]
    pub fn subtree_ids(&self, role_id: RoleId) -> Vec<RoleId> {
        if !self.roles.contains_key(&role_id) {
            return Vec::new();
        }

        let mut ordered = vec![role_id];
        let mut queue = VecDeque::from([role_id]);
        while let Some(current) = queue.pop_front() {
            for child in self.children.get(&current).into_iter().flatten() {
                ordered.push(*child);
                queue.push_back(*child);
            }
        }

        ordered
    }

    /// Returns whether `ancestor` is a proper ancestor of `descendant`.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: RoleId, descendant: RoleId) -> bool {
        self.ancestor_ids(descendant).contains(&ancestor)
    }

    /// Places a new role in the tree and assigns its level.
    pub fn insert(&mut self, mut role: Role) -> AppResult<Role> {
        if role.tenant_id() != self.tenant_id {
            return Err(AppError::Internal(format!(
                "role '{}' of tenant '{}' cannot join the tree of tenant '{}'",
                role.role_id(),
                role.tenant_id(),
                self.tenant_id
            )));
        }

        if self.roles.contains_key(&role.role_id()) {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                role.role_id()
            )));
        }

        if self.find_by_code(role.code()).is_some() {
            return Err(HierarchyViolation::DuplicateCode {
                code: role.code().to_owned(),
            }
            .into());
        }

        let level = match role.parent_id() {
            Some(parent_id) if parent_id == role.role_id() => {
                return Err(HierarchyViolation::CyclicParent {
                    role_id: role.role_id().to_string(),
                    parent_id: parent_id.to_string(),
                }
                .into());
            }
            Some(parent_id) => {
                let parent = self.roles.get(&parent_id).ok_or_else(|| {
                    HierarchyViolation::InvalidParent {
                        parent_id: parent_id.to_string(),
                    }
                })?;
                parent.level() + 1
            }
            None => 0,
        };

        role.set_level(level);
        if let Some(parent_id) = role.parent_id() {
            self.children
                .entry(parent_id)
                .or_default()
                .push(role.role_id());
        }
        self.roles.insert(role.role_id(), role.clone());

        Ok(role)
    }

    /// Replaces descriptive fields of an existing role.
    pub fn update_details(&mut self, role: Role) -> AppResult<Role> {
        let stored = self.require(role.role_id())?;
        if stored.parent_id() != role.parent_id()
            || stored.level() != role.level()
            || stored.code() != role.code()
        {
            return Err(AppError::Validation(format!(
                "role '{}' hierarchy fields can only change through reparent",
                role.role_id()
            )));
        }

        self.roles.insert(role.role_id(), role.clone());
        Ok(role)
    }

    /// Moves a role under a new parent (or to the root) and re-levels its subtree.
    ///
    /// Returns every role whose parent or level changed, parents before children.
    /// The tree is unchanged when an error is returned.
    pub fn reparent(
        &mut self,
        role_id: RoleId,
        new_parent: Option<RoleId>,
    ) -> AppResult<Vec<Role>> {
        self.require(role_id)?;

        if let Some(parent_id) = new_parent {
            self.validate_parent_for(role_id, parent_id)?;
        }

        let old_parent = self.roles.get(&role_id).and_then(Role::parent_id);
        if old_parent == new_parent {
            return Ok(Vec::new());
        }

        self.detach(role_id, old_parent);
        let level = match new_parent {
            Some(parent_id) => {
                self.children.entry(parent_id).or_default().push(role_id);
                self.roles
                    .get(&parent_id)
                    .map(|parent| parent.level() + 1)
                    .unwrap_or_default()
            }
            None => 0,
        };

        if let Some(role) = self.roles.get_mut(&role_id) {
            role.set_parent(new_parent);
            role.set_level(level);
        }

        let mut moved: Vec<Role> = self.roles.get(&role_id).cloned().into_iter().collect();
        moved.extend(self.relevel_below(role_id));
        Ok(moved)
    }

    /// Removes a role according to the delete policy.
    ///
    /// The tree is unchanged when an error is returned.
    pub fn remove(&mut self, role_id: RoleId, policy: RoleDeletePolicy) -> AppResult<RoleRemoval> {
        let role = self.require(role_id)?.clone();
        let child_ids = self.child_ids(role_id);

        match policy {
            RoleDeletePolicy::RejectIfChildren => {
                if !child_ids.is_empty() {
                    return Err(HierarchyViolation::HasChildren {
                        role_id: role_id.to_string(),
                        child_count: child_ids.len(),
                    }
                    .into());
                }

                self.detach(role_id, role.parent_id());
                self.roles.remove(&role_id);
                Ok(RoleRemoval {
                    removed: vec![role_id],
                    moved: Vec::new(),
                    reassign_to: None,
                })
            }
            RoleDeletePolicy::Cascade => {
                let mut removed = self.subtree_ids(role_id);
                removed.reverse();

                self.detach(role_id, role.parent_id());
                for id in &removed {
                    self.roles.remove(id);
                    self.children.remove(id);
                }

                Ok(RoleRemoval {
                    removed,
                    moved: Vec::new(),
                    reassign_to: None,
                })
            }
            RoleDeletePolicy::Reassign(target_id) => {
                self.validate_parent_for(role_id, target_id)?;

                let mut moved = Vec::new();
                for child_id in child_ids {
                    moved.extend(self.reparent(child_id, Some(target_id))?);
                }

                self.detach(role_id, role.parent_id());
                self.roles.remove(&role_id);
                self.children.remove(&role_id);

                Ok(RoleRemoval {
                    removed: vec![role_id],
                    moved,
                    reassign_to: Some(target_id),
                })
            }
        }
    }

    fn validate_parent_for(&self, role_id: RoleId, parent_id: RoleId) -> AppResult<()> {
        if parent_id == role_id || self.is_ancestor(role_id, parent_id) {
            return Err(HierarchyViolation::CyclicParent {
                role_id: role_id.to_string(),
                parent_id: parent_id.to_string(),
            }
            .into());
        }

        if !self.roles.contains_key(&parent_id) {
            return Err(HierarchyViolation::InvalidParent {
                parent_id: parent_id.to_string(),
            }
            .into());
        }

        Ok(())
    }

    fn detach(&mut self, role_id: RoleId, parent_id: Option<RoleId>) {
        if let Some(parent_id) = parent_id
            && let Some(siblings) = self.children.get_mut(&parent_id)
        {
            siblings.retain(|sibling| *sibling != role_id);
            if siblings.is_empty() {
                self.children.remove(&parent_id);
            }
        }
    }

    /// Recomputes levels below `role_id` breadth-first and returns the touched roles.
    fn relevel_below(&mut self, role_id: RoleId) -> Vec<Role> {
        let mut touched = Vec::new();
        let mut visited = HashSet::from([role_id]);
        let mut queue = VecDeque::from([role_id]);

        while let Some(current) = queue.pop_front() {
            let parent_level = self
                .roles
                .get(&current)
                .map(Role::level)
                .unwrap_or_default();

            for child_id in self.children.get(&current).cloned().unwrap_or_default() {
                if !visited.insert(child_id) {
                    continue;
                }
                if let Some(child) = self.roles.get_mut(&child_id) {
                    child.set_level(parent_level + 1);
                    touched.push(child.clone());
                }
                queue.push_back(child_id);
            }
        }

        touched
    }
}

fn compare_roles(left: &Role, right: &Role) -> Ordering {
    left.level()
        .cmp(&right.level())
        .then_with(|| left.display_order().cmp(&right.display_order()))
        .then_with(|| left.name().cmp(right.name()))
        .then_with(|| left.role_id().cmp(&right.role_id()))
}
