use super::*;

impl PostgresAuthorizationStore {
    pub(super) async fn list_team_links_impl(
        &self,
        tenant_id: TenantId,
    ) -> AppResult<Vec<TeamLink>> {
        let rows = sqlx::query_as::<_, TeamLinkRow>(
            r#"
            SELECT leader_subject, member_subject, resource
            FROM team_links
            WHERE tenant_id = $1
            ORDER BY leader_subject, member_subject, resource
            "#,
        )
        .bind(tenant_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list team links: {error}")))?;

        Ok(rows
            .into_iter()
            .map(|row| TeamLink {
                tenant_id,
                leader_subject: row.leader_subject,
                member_subject: row.member_subject,
                resource: row.resource,
            })
            .collect())
    }
}
