use std::time::Duration;

use chrono::Utc;
use rolegraph_core::{AppError, AppResult, Principal};
use rolegraph_domain::{AuditAction, Capability, FilterSpec, PermissionDecision, Scope};
use tracing::{debug, warn};

use crate::authorization_context::AuthorizationContext;
use crate::permission_matrix_service::effective_decision;
use crate::role_assignment_service::active_role_ids;
use crate::{AuditEvent, PermissionCacheKey, ScopeResolver};

/// Runtime knobs of the permission checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionCheckerConfig {
    /// Default deadline for one check.
    pub check_timeout: Duration,
    /// Whether allowed checks are audited as well as denials.
    pub audit_allowed_checks: bool,
    /// Upper bound on cached decision lifetime; zero disables caching.
    pub cache_ttl_seconds: u32,
}

impl Default for PermissionCheckerConfig {
    fn default() -> Self {
        Self {
            check_timeout: Duration::from_millis(250),
            audit_allowed_checks: false,
            cache_ttl_seconds: 300,
        }
    }
}

/// Entry point callers use before any record-level operation.
#[derive(Clone)]
pub struct PermissionChecker {
    context: AuthorizationContext,
    resolver: ScopeResolver,
    config: PermissionCheckerConfig,
}

impl PermissionChecker {
    /// Creates a new checker from the shared context.
    #[must_use]
    pub fn new(context: AuthorizationContext, config: PermissionCheckerConfig) -> Self {
        Self {
            resolver: ScopeResolver::new(context.clone()),
            context,
            config,
        }
    }

    /// Returns the checker configuration.
    #[must_use]
    pub fn config(&self) -> PermissionCheckerConfig {
        self.config
    }

    /// Resolves the principal's effective permission within the default deadline.
    pub async fn check(
        &self,
        principal: &Principal,
        resource: &str,
        action: &str,
    ) -> AppResult<PermissionDecision> {
        self.check_with_deadline(principal, resource, action, self.config.check_timeout)
            .await
    }

    /// Resolves the principal's effective permission within a caller deadline.
    ///
    /// Unregistered capabilities fail with a matrix violation. A missed deadline fails
    /// with `Timeout`, which callers must treat as a denial.
    pub async fn check_with_deadline(
        &self,
        principal: &Principal,
        resource: &str,
        action: &str,
        deadline: Duration,
    ) -> AppResult<PermissionDecision> {
        let capability = self
            .context
            .registry()
            .validate_capability(resource, action)?;

        let decision =
            match tokio::time::timeout(deadline, self.evaluate(principal, &capability)).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!(
                        tenant_id = %principal.tenant_id(),
                        subject = principal.subject(),
                        capability = %capability,
                        deadline_ms = deadline.as_millis(),
                        "permission check timed out"
                    );
                    let event = check_event(
                        principal,
                        &capability,
                        AuditAction::AccessTimedOut,
                        format!("check exceeded {} ms deadline", deadline.as_millis()),
                    );
                    if let Err(error) = self.context.audit_repository().append_event(event).await
                    {
                        warn!(error = %error, "failed to audit timed out permission check");
                    }

                    return Err(AppError::Timeout(format!(
                        "permission check for '{capability}' did not finish within {} ms",
                        deadline.as_millis()
                    )));
                }
            };

        if !decision.allowed {
            warn!(
                tenant_id = %principal.tenant_id(),
                subject = principal.subject(),
                capability = %capability,
                "permission denied"
            );
            self.context
                .audit_repository()
                .append_event(check_event(
                    principal,
                    &capability,
                    AuditAction::AccessDenied,
                    format!("denied '{capability}'"),
                ))
                .await?;
        } else if self.config.audit_allowed_checks {
            self.context
                .audit_repository()
                .append_event(check_event(
                    principal,
                    &capability,
                    AuditAction::AccessGranted,
                    format!("allowed '{capability}' at scope '{}'", decision.scope),
                ))
                .await?;
        }

        Ok(decision)
    }

    /// Resolves the permission and fails with `Forbidden` when it is not allowed.
    pub async fn check_or_reject(
        &self,
        principal: &Principal,
        resource: &str,
        action: &str,
    ) -> AppResult<PermissionDecision> {
        let decision = self.check(principal, resource, action).await?;
        if !decision.allowed {
            return Err(AppError::Forbidden(format!(
                "subject '{}' may not '{action}' on '{resource}'",
                principal.subject()
            )));
        }

        Ok(decision)
    }

    /// Checks the permission and turns the granted scope into a record filter.
    pub async fn authorize(
        &self,
        principal: &Principal,
        resource: &str,
        action: &str,
    ) -> AppResult<FilterSpec> {
        let decision = self.check_or_reject(principal, resource, action).await?;
        self.resolver
            .resolve(principal, resource, action, decision.scope)
            .await
    }

    /// Resolves a requested scope capped at the scope the principal is granted.
    ///
    /// A principal without the permission gets the deny filter.
    pub async fn resolve_within_grant(
        &self,
        principal: &Principal,
        resource: &str,
        action: &str,
        requested: Scope,
    ) -> AppResult<FilterSpec> {
        let decision = self.check(principal, resource, action).await?;
        self.resolver
            .resolve(principal, resource, action, requested.min(decision.scope))
            .await
    }

    async fn evaluate(
        &self,
        principal: &Principal,
        capability: &Capability,
    ) -> AppResult<PermissionDecision> {
        let tenant_id = principal.tenant_id();
        let _guard = self.context.locks().read(tenant_id).await;

        let role_ids =
            active_role_ids(&self.context, tenant_id, principal.subject(), Utc::now()).await?;
        if role_ids.is_empty() {
            return Ok(PermissionDecision::denied());
        }

        let caching = self.config.cache_ttl_seconds > 0;
        let key = PermissionCacheKey::new(tenant_id, &role_ids, capability.clone());
        if caching {
            match self.context.cache().get(&key).await {
                Ok(Some(decision)) => {
                    debug!(
                        tenant_id = %tenant_id,
                        capability = %capability,
                        "permission cache hit"
                    );
                    return Ok(decision);
                }
                Ok(None) => {
                    debug!(
                        tenant_id = %tenant_id,
                        capability = %capability,
                        "permission cache miss"
                    );
                }
                Err(error) => {
                    warn!(tenant_id = %tenant_id, error = %error, "permission cache read failed");
                }
            }
        }

        let decision = effective_decision(&self.context, tenant_id, &role_ids, capability).await?;

        if caching
            && let Err(error) = self
                .context
                .cache()
                .put(&key, decision, self.config.cache_ttl_seconds)
                .await
        {
            warn!(tenant_id = %tenant_id, error = %error, "permission cache write failed");
        }

        Ok(decision)
    }
}

fn check_event(
    principal: &Principal,
    capability: &Capability,
    action: AuditAction,
    detail: String,
) -> AuditEvent {
    AuditEvent {
        tenant_id: principal.tenant_id(),
        subject: principal.subject().to_owned(),
        action,
        resource_type: "capability".to_owned(),
        resource_id: capability.to_string(),
        detail: Some(detail),
    }
}

#[cfg(test)]
mod tests;
