//! Leader/member links derived from role ancestry.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rolegraph_core::TenantId;
use serde::{Deserialize, Serialize};

use crate::assignment::RoleAssignment;
use crate::hierarchy::RoleTree;
use crate::matrix::PermissionMatrix;
use crate::role::RoleId;

/// Derived record stating that the leader may see the member's records of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamLink {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Subject holding the ancestor role.
    pub leader_subject: String,
    /// Subject holding the descendant role.
    pub member_subject: String,
    /// Resource the link applies to.
    pub resource: String,
}

impl TeamLink {
    /// Returns whether the subject is the leader or the member of the link.
    #[must_use]
    pub fn involves(&self, subject: &str) -> bool {
        self.leader_subject == subject || self.member_subject == subject
    }
}

/// Derives every team link of a tenant.
///
/// A link `(leader, member, resource)` exists when the leader holds an active role
/// that is a proper ancestor of an active role held by a different member, and the
/// leader's role has an enabled `team` entry on the resource.
#[must_use]
pub fn derive_team_links(
    tree: &RoleTree,
    matrix: &PermissionMatrix,
    assignments: &[RoleAssignment],
    now: DateTime<Utc>,
) -> BTreeSet<TeamLink> {
    derive(tree, matrix, assignments, now, None)
}

/// Derives the links in which any of the subjects takes part.
#[must_use]
pub fn derive_team_links_for_subjects(
    tree: &RoleTree,
    matrix: &PermissionMatrix,
    assignments: &[RoleAssignment],
    now: DateTime<Utc>,
    subjects: &BTreeSet<String>,
) -> BTreeSet<TeamLink> {
    derive(tree, matrix, assignments, now, Some(subjects))
}

fn derive(
    tree: &RoleTree,
    matrix: &PermissionMatrix,
    assignments: &[RoleAssignment],
    now: DateTime<Utc>,
    subjects: Option<&BTreeSet<String>>,
) -> BTreeSet<TeamLink> {
    let mut holders: BTreeMap<RoleId, BTreeSet<&str>> = BTreeMap::new();
    for assignment in assignments
        .iter()
        .filter(|assignment| assignment.is_active_at(now))
        .filter(|assignment| tree.get(assignment.role_id()).is_some())
    {
        holders
            .entry(assignment.role_id())
            .or_default()
            .insert(assignment.subject());
    }

    let mut links = BTreeSet::new();
    for (leader_role_id, leaders) in &holders {
        let resources = matrix.team_resources_for(*leader_role_id);
        if resources.is_empty() {
            continue;
        }

        for member_role_id in tree.subtree_ids(*leader_role_id).into_iter().skip(1) {
            let Some(members) = holders.get(&member_role_id) else {
                continue;
            };

            for leader in leaders {
                for member in members {
                    if leader == member {
                        continue;
                    }
                    if let Some(subjects) = subjects
                        && !subjects.contains(*leader)
                        && !subjects.contains(*member)
                    {
                        continue;
                    }

                    for resource in &resources {
                        links.insert(TeamLink {
                            tenant_id: tree.tenant_id(),
                            leader_subject: (*leader).to_owned(),
                            member_subject: (*member).to_owned(),
                            resource: resource.clone(),
                        });
                    }
                }
            }
        }
    }

    links
}
