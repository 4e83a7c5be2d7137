use crate::{
    AuthorizationContext, HierarchyService, PermissionChecker, PermissionCheckerConfig,
    PermissionMatrixService, RoleAssignmentService, ScopeResolver, TeamLinker,
};

/// Every authorization service wired to one shared context.
///
/// All services share the tenant lock table, so a check never caches a decision
/// computed before a concurrent mutation committed.
#[derive(Clone)]
pub struct AuthorizationEngine {
    hierarchy: HierarchyService,
    matrix: PermissionMatrixService,
    assignments: RoleAssignmentService,
    team_linker: TeamLinker,
    resolver: ScopeResolver,
    checker: PermissionChecker,
}

impl AuthorizationEngine {
    /// Wires the services.
    #[must_use]
    pub fn new(context: AuthorizationContext, config: PermissionCheckerConfig) -> Self {
        Self {
            hierarchy: HierarchyService::new(context.clone()),
            matrix: PermissionMatrixService::new(context.clone()),
            assignments: RoleAssignmentService::new(context.clone()),
            team_linker: TeamLinker::new(context.clone()),
            resolver: ScopeResolver::new(context.clone()),
            checker: PermissionChecker::new(context, config),
        }
    }

    /// Role tree administration.
    #[must_use]
    pub fn hierarchy(&self) -> &HierarchyService {
        &self.hierarchy
    }

    /// Permission matrix administration.
    #[must_use]
    pub fn matrix(&self) -> &PermissionMatrixService {
        &self.matrix
    }

    /// Role assignment administration.
    #[must_use]
    pub fn assignments(&self) -> &RoleAssignmentService {
        &self.assignments
    }

    /// Team link maintenance.
    #[must_use]
    pub fn team_linker(&self) -> &TeamLinker {
        &self.team_linker
    }

    /// Scope to filter resolution.
    #[must_use]
    pub fn resolver(&self) -> &ScopeResolver {
        &self.resolver
    }

    /// Permission checks.
    #[must_use]
    pub fn checker(&self) -> &PermissionChecker {
        &self.checker
    }
}
