use super::*;

impl PostgresAuthorizationStore {
    pub(super) async fn list_assignments_impl(
        &self,
        tenant_id: TenantId,
        subject: Option<&str>,
    ) -> AppResult<Vec<RoleAssignment>> {
        let rows = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT id, tenant_id, subject, role_id, valid_from, valid_until,
                assigned_by, assigned_at
            FROM role_assignments
            WHERE tenant_id = $1
                AND ($2::TEXT IS NULL OR subject = $2)
            ORDER BY subject, assigned_at, id
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(subject)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list role assignments: {error}"))
        })?;

        rows.into_iter().map(AssignmentRow::into_assignment).collect()
    }

    pub(super) async fn find_assignment_impl(
        &self,
        tenant_id: TenantId,
        assignment_id: AssignmentId,
    ) -> AppResult<Option<RoleAssignment>> {
        sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT id, tenant_id, subject, role_id, valid_from, valid_until,
                assigned_by, assigned_at
            FROM role_assignments
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(assignment_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find role assignment: {error}")))?
        .map(AssignmentRow::into_assignment)
        .transpose()
    }
}
