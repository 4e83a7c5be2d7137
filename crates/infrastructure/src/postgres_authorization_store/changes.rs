use rolegraph_core::HierarchyViolation;

use super::*;

pub(super) async fn apply_change_set(
    transaction: &mut Transaction<'_, Postgres>,
    tenant_id: TenantId,
    changes: TenantChangeSet,
) -> AppResult<()> {
    for role in &changes.upsert_roles {
        upsert_role(transaction, tenant_id, role).await?;
    }

    if !changes.delete_assignments.is_empty() {
        let assignment_ids: Vec<uuid::Uuid> = changes
            .delete_assignments
            .iter()
            .map(AssignmentId::as_uuid)
            .collect();
        sqlx::query(
            r#"
            DELETE FROM role_assignments
            WHERE tenant_id = $1 AND id = ANY($2)
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(assignment_ids)
        .execute(&mut **transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to delete role assignments: {error}"))
        })?;
    }
    for assignment in &changes.upsert_assignments {
        upsert_assignment(transaction, tenant_id, assignment).await?;
    }

    for (role_id, capability) in &changes.delete_entries {
        sqlx::query(
            r#"
            DELETE FROM permission_entries
            WHERE tenant_id = $1 AND role_id = $2 AND resource = $3 AND action = $4
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_id.as_uuid())
        .bind(capability.resource())
        .bind(capability.action())
        .execute(&mut **transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to delete permission entry: {error}"))
        })?;
    }
    for entry in &changes.upsert_entries {
        upsert_entry(transaction, tenant_id, entry).await?;
    }

    if !changes.delete_roles.is_empty() {
        delete_roles(transaction, tenant_id, &changes.delete_roles).await?;
    }

    replace_team_links(transaction, tenant_id, changes.team_links).await
}

async fn upsert_role(
    transaction: &mut Transaction<'_, Postgres>,
    tenant_id: TenantId,
    role: &Role,
) -> AppResult<()> {
    if role.tenant_id() != tenant_id {
        return Err(AppError::Internal(format!(
            "role '{}' does not belong to tenant '{tenant_id}'",
            role.role_id()
        )));
    }
    let level = i32::try_from(role.level()).map_err(|error| {
        AppError::Internal(format!("invalid level for role '{}': {error}", role.role_id()))
    })?;

    sqlx::query(
        r#"
        INSERT INTO roles (id, tenant_id, name, code, parent_id, level, is_position, display_order)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (id) DO UPDATE
        SET name = EXCLUDED.name,
            parent_id = EXCLUDED.parent_id,
            level = EXCLUDED.level,
            is_position = EXCLUDED.is_position,
            display_order = EXCLUDED.display_order,
            updated_at = now()
        "#,
    )
    .bind(role.role_id().as_uuid())
    .bind(tenant_id.as_uuid())
    .bind(role.name())
    .bind(role.code())
    .bind(role.parent_id().map(|parent_id| parent_id.as_uuid()))
    .bind(level)
    .bind(role.is_position())
    .bind(role.display_order())
    .execute(&mut **transaction)
    .await
    .map_err(|error| map_role_conflict(error, role.code()))?;

    Ok(())
}

async fn upsert_assignment(
    transaction: &mut Transaction<'_, Postgres>,
    tenant_id: TenantId,
    assignment: &RoleAssignment,
) -> AppResult<()> {
    let window = assignment.window();
    sqlx::query(
        r#"
        INSERT INTO role_assignments (
            id, tenant_id, subject, role_id, valid_from, valid_until, assigned_by, assigned_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (id) DO UPDATE
        SET role_id = EXCLUDED.role_id,
            valid_from = EXCLUDED.valid_from,
            valid_until = EXCLUDED.valid_until
        "#,
    )
    .bind(assignment.assignment_id().as_uuid())
    .bind(tenant_id.as_uuid())
    .bind(assignment.subject())
    .bind(assignment.role_id().as_uuid())
    .bind(window.valid_from)
    .bind(window.valid_until)
    .bind(assignment.assigned_by())
    .bind(assignment.assigned_at())
    .execute(&mut **transaction)
    .await
    .map_err(|error| AppError::Internal(format!("failed to save role assignment: {error}")))?;

    Ok(())
}

async fn upsert_entry(
    transaction: &mut Transaction<'_, Postgres>,
    tenant_id: TenantId,
    entry: &PermissionEntry,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO permission_entries (tenant_id, role_id, resource, action, enabled, scope)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (role_id, resource, action) DO UPDATE
        SET enabled = EXCLUDED.enabled,
            scope = EXCLUDED.scope,
            updated_at = now()
        "#,
    )
    .bind(tenant_id.as_uuid())
    .bind(entry.role_id.as_uuid())
    .bind(entry.capability.resource())
    .bind(entry.capability.action())
    .bind(entry.grant.enabled)
    .bind(entry.grant.scope.as_str())
    .execute(&mut **transaction)
    .await
    .map_err(|error| AppError::Internal(format!("failed to save permission entry: {error}")))?;

    Ok(())
}

async fn delete_roles(
    transaction: &mut Transaction<'_, Postgres>,
    tenant_id: TenantId,
    role_ids: &[RoleId],
) -> AppResult<()> {
    let role_ids = role_uuids(role_ids);

    for statement in [
        "DELETE FROM permission_entries WHERE tenant_id = $1 AND role_id = ANY($2)",
        "DELETE FROM role_assignments WHERE tenant_id = $1 AND role_id = ANY($2)",
        "DELETE FROM roles WHERE tenant_id = $1 AND id = ANY($2)",
    ] {
        sqlx::query(statement)
            .bind(tenant_id.as_uuid())
            .bind(role_ids.as_slice())
            .execute(&mut **transaction)
            .await
            .map_err(|error| AppError::Internal(format!("failed to delete roles: {error}")))?;
    }

    Ok(())
}

async fn replace_team_links(
    transaction: &mut Transaction<'_, Postgres>,
    tenant_id: TenantId,
    replacement: TeamLinkReplacement,
) -> AppResult<()> {
    let links = match replacement {
        TeamLinkReplacement::Unchanged => return Ok(()),
        TeamLinkReplacement::Subjects { subjects, links } => {
            let subjects: Vec<String> = subjects.into_iter().collect();
            sqlx::query(
                r#"
                DELETE FROM team_links
                WHERE tenant_id = $1
                    AND (leader_subject = ANY($2) OR member_subject = ANY($2))
                "#,
            )
            .bind(tenant_id.as_uuid())
            .bind(subjects)
            .execute(&mut **transaction)
            .await
            .map_err(|error| AppError::Internal(format!("failed to clear team links: {error}")))?;
            links
        }
        TeamLinkReplacement::Tenant { links } => {
            sqlx::query("DELETE FROM team_links WHERE tenant_id = $1")
                .bind(tenant_id.as_uuid())
                .execute(&mut **transaction)
                .await
                .map_err(|error| {
                    AppError::Internal(format!("failed to clear team links: {error}"))
                })?;
            links
        }
    };

    insert_team_links(transaction, tenant_id, links).await
}

async fn insert_team_links(
    transaction: &mut Transaction<'_, Postgres>,
    tenant_id: TenantId,
    links: BTreeSet<TeamLink>,
) -> AppResult<()> {
    if links.is_empty() {
        return Ok(());
    }

    let mut leaders = Vec::with_capacity(links.len());
    let mut members = Vec::with_capacity(links.len());
    let mut resources = Vec::with_capacity(links.len());
    for link in links {
        leaders.push(link.leader_subject);
        members.push(link.member_subject);
        resources.push(link.resource);
    }

    sqlx::query(
        r#"
        INSERT INTO team_links (tenant_id, leader_subject, member_subject, resource)
        SELECT $1, leader_subject, member_subject, resource
        FROM UNNEST($2::TEXT[], $3::TEXT[], $4::TEXT[])
            AS links (leader_subject, member_subject, resource)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(tenant_id.as_uuid())
    .bind(leaders)
    .bind(members)
    .bind(resources)
    .execute(&mut **transaction)
    .await
    .map_err(|error| AppError::Internal(format!("failed to insert team links: {error}")))?;

    Ok(())
}

fn map_role_conflict(error: sqlx::Error, code: &str) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return HierarchyViolation::DuplicateCode {
            code: code.to_owned(),
        }
        .into();
    }

    AppError::Internal(format!("failed to save role: {error}"))
}
