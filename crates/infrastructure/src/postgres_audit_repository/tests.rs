use rolegraph_application::{AuditEvent, AuditLogQuery, AuditLogRepository, AuditRepository};
use rolegraph_core::TenantId;
use rolegraph_domain::AuditAction;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

use super::PostgresAuditRepository;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres audit tests: {error}");
    }

    Some(pool)
}

#[tokio::test]
async fn appended_events_are_listed_with_filters() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresAuditRepository::new(pool);
    let tenant_id = TenantId::new();
    for (subject, action, resource_id) in [
        ("admin", AuditAction::RoleCreated, "role-1"),
        ("alice", AuditAction::AccessDenied, "fees.delete"),
    ] {
        let appended = repository
            .append_event(AuditEvent {
                tenant_id,
                subject: subject.to_owned(),
                action,
                resource_type: "role".to_owned(),
                resource_id: resource_id.to_owned(),
                detail: Some("detail".to_owned()),
            })
            .await;
        assert!(appended.is_ok());
    }

    let denials = repository
        .list_recent_entries(
            tenant_id,
            AuditLogQuery {
                action: Some("access.denied".to_owned()),
                ..AuditLogQuery::default()
            },
        )
        .await;
    assert!(denials.is_ok());
    let denials = denials.unwrap_or_default();
    assert_eq!(denials.len(), 1);
    assert_eq!(denials[0].subject, "alice");
    assert_eq!(denials[0].resource_id, "fees.delete");

    let everything = repository
        .list_recent_entries(tenant_id, AuditLogQuery::default())
        .await
        .unwrap_or_default();
    assert_eq!(everything.len(), 2);
}
