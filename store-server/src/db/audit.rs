//! Order audit log operations

use sqlx::{PgConnection, PgPool};

pub struct NewAuditEntry<'a> {
    pub order_id: i64,
    pub action: &'a str,
    pub actor_type: &'a str,
    pub actor_id: Option<i64>,
    pub actor_name: &'a str,
    pub from_status: Option<&'a str>,
    pub to_status: Option<&'a str>,
    pub detail: Option<&'a serde_json::Value>,
    pub now: i64,
}

/// Write an audit entry inside a transaction
pub async fn record(conn: &mut PgConnection, e: &NewAuditEntry<'_>) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO order_audit_logs
            (order_id, action, actor_type, actor_id, actor_name, from_status, to_status, detail, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(e.order_id)
    .bind(e.action)
    .bind(e.actor_type)
    .bind(e.actor_id)
    .bind(e.actor_name)
    .bind(e.from_status)
    .bind(e.to_status)
    .bind(e.detail)
    .bind(e.now)
    .execute(conn)
    .await?;
    Ok(())
}

#[derive(sqlx::FromRow, serde::Serialize)]
pub struct AuditEntryRow {
    pub id: i64,
    pub order_id: i64,
    pub action: String,
    pub actor_type: String,
    pub actor_id: Option<i64>,
    pub actor_name: String,
    pub from_status: Option<String>,
    pub to_status: Option<String>,
    pub detail: Option<serde_json::Value>,
    pub created_at: i64,
}

/// History for one order, newest entries first.
pub async fn list_for_order(pool: &PgPool, order_id: i64) -> Result<Vec<AuditEntryRow>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM order_audit_logs WHERE order_id = $1 ORDER BY created_at DESC, id DESC",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await
}
