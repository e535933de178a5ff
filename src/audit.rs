use sea_orm::{EntityTrait, QueryOrder, QuerySelect};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    db::{DbPool, OrmConn},
    entity::{AuditLogs, audit_logs},
    error::AppResult,
    models::AuditEntry,
};

pub async fn log_audit(
    pool: &DbPool,
    user_id: Option<Uuid>,
    action: &str,
    resource: Option<&str>,
    metadata: Option<Value>,
) -> AppResult<()> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(action)
    .bind(resource)
    .bind(metadata)
    .execute(pool)
    .await?;

    Ok(())
}

/// Best-effort audit write, called after the mutation has committed.
pub async fn record(
    pool: &DbPool,
    user_id: Option<Uuid>,
    action: &str,
    resource: &str,
    metadata: Value,
) {
    if let Err(err) = log_audit(pool, user_id, action, Some(resource), Some(metadata)).await {
        tracing::warn!(error = %err, action, "audit log failed");
    }
}

pub async fn recent(orm: &OrmConn, limit: u64) -> AppResult<Vec<AuditEntry>> {
    let entries = AuditLogs::find()
        .order_by_desc(audit_logs::Column::CreatedAt)
        .limit(limit)
        .all(orm)
        .await?
        .into_iter()
        .map(AuditEntry::from)
        .collect();
    Ok(entries)
}
