use super::*;

impl PostgresAuthorizationStore {
    pub(super) async fn list_entries_impl(
        &self,
        tenant_id: TenantId,
        role_id: Option<RoleId>,
    ) -> AppResult<Vec<PermissionEntry>> {
        let rows = sqlx::query_as::<_, EntryRow>(
            r#"
            SELECT tenant_id, role_id, resource, action, enabled, scope
            FROM permission_entries
            WHERE tenant_id = $1
                AND ($2::UUID IS NULL OR role_id = $2)
            ORDER BY role_id, resource, action
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_id.map(|role_id| role_id.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list permission entries: {error}"))
        })?;

        rows.into_iter().map(EntryRow::into_entry).collect()
    }

    pub(super) async fn list_entries_for_roles_impl(
        &self,
        tenant_id: TenantId,
        role_ids: &[RoleId],
        capability: &Capability,
    ) -> AppResult<Vec<PermissionEntry>> {
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, EntryRow>(
            r#"
            SELECT tenant_id, role_id, resource, action, enabled, scope
            FROM permission_entries
            WHERE tenant_id = $1
                AND role_id = ANY($2)
                AND resource = $3
                AND action = $4
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_uuids(role_ids))
        .bind(capability.resource())
        .bind(capability.action())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load '{capability}' entries for role set: {error}"
            ))
        })?;

        rows.into_iter().map(EntryRow::into_entry).collect()
    }
}
