//! Payment attempt operations
//!
//! Each row is one attempt. A partial unique index keeps at most one
//! PENDING attempt per order, so opening a fresh attempt always closes
//! the previous one first.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

#[derive(sqlx::FromRow, serde::Serialize)]
pub struct PaymentRow {
    pub id: i64,
    pub order_id: i64,
    pub method: String,
    pub status: String,
    pub amount: Decimal,
    pub txn_ref: Option<String>,
    pub gateway_txn_no: Option<String>,
    pub gateway_response_code: Option<String>,
    pub paid_at: Option<i64>,
    pub refunded_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

pub struct NewPayment<'a> {
    pub id: i64,
    pub order_id: i64,
    pub method: &'a str,
    pub amount: Decimal,
    /// Gateway transaction reference; None for COD
    pub txn_ref: Option<&'a str>,
    pub now: i64,
}

pub async fn insert(conn: &mut PgConnection, p: &NewPayment<'_>) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO payments (id, order_id, method, status, amount, txn_ref, created_at, updated_at)
        VALUES ($1, $2, $3, 'PENDING', $4, $5, $6, $6)
        "#,
    )
    .bind(p.id)
    .bind(p.order_id)
    .bind(p.method)
    .bind(p.amount)
    .bind(p.txn_ref)
    .bind(p.now)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn find_by_txn_ref(pool: &PgPool, txn_ref: &str) -> Result<Option<PaymentRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payments WHERE txn_ref = $1")
        .bind(txn_ref)
        .fetch_optional(pool)
        .await
}

pub async fn find_paid_for_order(
    pool: &PgPool,
    order_id: i64,
) -> Result<Option<PaymentRow>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM payments WHERE order_id = $1 AND status = 'PAID' ORDER BY created_at DESC LIMIT 1",
    )
    .bind(order_id)
    .fetch_optional(pool)
    .await
}

pub async fn list_for_order(pool: &PgPool, order_id: i64) -> Result<Vec<PaymentRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payments WHERE order_id = $1 ORDER BY created_at")
        .bind(order_id)
        .fetch_all(pool)
        .await
}

/// Settle an attempt. Guarded on PENDING so a replayed callback is a no-op.
pub async fn mark_paid_by_txn_ref(
    conn: &mut PgConnection,
    txn_ref: &str,
    gateway_txn_no: &str,
    response_code: &str,
    now: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE payments
        SET status = 'PAID', gateway_txn_no = $2, gateway_response_code = $3,
            paid_at = $4, updated_at = $4
        WHERE txn_ref = $1 AND status = 'PENDING'
        "#,
    )
    .bind(txn_ref)
    .bind(gateway_txn_no)
    .bind(response_code)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// Close the COD attempt when the courier collects at the door.
pub async fn mark_cod_paid_for_order(
    conn: &mut PgConnection,
    order_id: i64,
    now: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE payments SET status = 'PAID', paid_at = $2, updated_at = $2 WHERE order_id = $1 AND method = 'COD' AND status = 'PENDING'",
    )
    .bind(order_id)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

pub async fn mark_failed_by_txn_ref(
    conn: &mut PgConnection,
    txn_ref: &str,
    response_code: &str,
    now: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE payments
        SET status = 'FAILED', gateway_response_code = $2, updated_at = $3
        WHERE txn_ref = $1 AND status = 'PENDING'
        "#,
    )
    .bind(txn_ref)
    .bind(response_code)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// Close the open attempt for an order, if any (used before opening a new one)
pub async fn mark_failed_pending_for_order(
    conn: &mut PgConnection,
    order_id: i64,
    now: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE payments SET status = 'FAILED', updated_at = $2 WHERE order_id = $1 AND status = 'PENDING'",
    )
    .bind(order_id)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// Record the refund on the paid attempt. Guarded on PAID.
pub async fn mark_refunded(
    conn: &mut PgConnection,
    payment_id: i64,
    now: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE payments SET status = 'REFUNDED', refunded_at = $2, updated_at = $2 WHERE id = $1 AND status = 'PAID'",
    )
    .bind(payment_id)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}
