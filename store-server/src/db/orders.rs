//! Order table operations
//!
//! Status columns are stored as their string form and parsed into the shared
//! enums at the domain boundary. All guarded updates return the affected row
//! count so callers can detect lost races instead of silently proceeding.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

#[derive(sqlx::FromRow)]
pub struct OrderRow {
    pub id: i64,
    pub order_number: String,
    pub customer_id: i64,
    pub customer_email: String,
    pub status: String,
    pub payment_status: String,
    pub payment_method: String,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
    pub coupon_code: Option<String>,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub shipping_address: String,
    pub note: Option<String>,
    pub cancel_reason: Option<String>,
    pub dispute_reason: Option<String>,
    pub stock_returned: bool,
    pub cod_paid_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(sqlx::FromRow, serde::Serialize)]
pub struct OrderItemRow {
    pub id: i64,
    pub order_id: i64,
    pub variant_id: i64,
    pub product_name: String,
    pub variant_name: String,
    pub sku: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

pub struct NewOrder<'a> {
    pub id: i64,
    pub order_number: &'a str,
    pub customer_id: i64,
    pub customer_email: &'a str,
    pub payment_method: &'a str,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
    pub coupon_code: Option<&'a str>,
    pub recipient_name: &'a str,
    pub recipient_phone: &'a str,
    pub shipping_address: &'a str,
    pub note: Option<&'a str>,
    pub now: i64,
}

pub struct NewOrderItem<'a> {
    pub order_id: i64,
    pub variant_id: i64,
    pub product_name: &'a str,
    pub variant_name: &'a str,
    pub sku: &'a str,
    pub unit_price: Decimal,
    pub quantity: i32,
}

/// Insert a new order (always starts PENDING / PENDING)
pub async fn insert(conn: &mut PgConnection, o: &NewOrder<'_>) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO orders (
            id, order_number, customer_id, customer_email,
            status, payment_status, payment_method,
            subtotal, discount, shipping_fee, total, coupon_code,
            recipient_name, recipient_phone, shipping_address, note,
            created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, 'PENDING', 'PENDING', $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $15)
        "#,
    )
    .bind(o.id)
    .bind(o.order_number)
    .bind(o.customer_id)
    .bind(o.customer_email)
    .bind(o.payment_method)
    .bind(o.subtotal)
    .bind(o.discount)
    .bind(o.shipping_fee)
    .bind(o.total)
    .bind(o.coupon_code)
    .bind(o.recipient_name)
    .bind(o.recipient_phone)
    .bind(o.shipping_address)
    .bind(o.note)
    .bind(o.now)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn insert_item(conn: &mut PgConnection, item: &NewOrderItem<'_>) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO order_items (order_id, variant_id, product_name, variant_name, sku, unit_price, quantity)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(item.order_id)
    .bind(item.variant_id)
    .bind(item.product_name)
    .bind(item.variant_name)
    .bind(item.sku)
    .bind(item.unit_price)
    .bind(item.quantity)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<OrderRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn items_for_order(pool: &PgPool, order_id: i64) -> Result<Vec<OrderItemRow>, sqlx::Error> {
    sqlx::query_as(
        "SELECT *, unit_price * quantity AS line_total FROM order_items WHERE order_id = $1 ORDER BY id",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await
}

pub async fn list_by_customer(
    pool: &PgPool,
    customer_id: i64,
    limit: i32,
    offset: i32,
) -> Result<Vec<OrderRow>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM orders WHERE customer_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(customer_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn count_by_customer(pool: &PgPool, customer_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE customer_id = $1")
        .bind(customer_id)
        .fetch_one(pool)
        .await
}

/// Optional filters for the back-office order list
pub struct AdminListFilter<'a> {
    pub status: Option<&'a str>,
    pub payment_status: Option<&'a str>,
    /// Matched with ILIKE against the order number
    pub order_number: Option<&'a str>,
    pub limit: i32,
    pub offset: i32,
}

pub async fn admin_list(
    pool: &PgPool,
    filter: &AdminListFilter<'_>,
) -> Result<Vec<OrderRow>, sqlx::Error> {
    let pattern = filter.order_number.map(|n| format!("%{n}%"));
    sqlx::query_as(
        r#"
        SELECT * FROM orders
        WHERE ($1::text IS NULL OR status = $1)
          AND ($2::text IS NULL OR payment_status = $2)
          AND ($3::text IS NULL OR order_number ILIKE $3)
        ORDER BY created_at DESC
        LIMIT $4 OFFSET $5
        "#,
    )
    .bind(filter.status)
    .bind(filter.payment_status)
    .bind(pattern.as_deref())
    .bind(filter.limit)
    .bind(filter.offset)
    .fetch_all(pool)
    .await
}

pub async fn admin_count(pool: &PgPool, filter: &AdminListFilter<'_>) -> Result<i64, sqlx::Error> {
    let pattern = filter.order_number.map(|n| format!("%{n}%"));
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM orders
        WHERE ($1::text IS NULL OR status = $1)
          AND ($2::text IS NULL OR payment_status = $2)
          AND ($3::text IS NULL OR order_number ILIKE $3)
        "#,
    )
    .bind(filter.status)
    .bind(filter.payment_status)
    .bind(pattern.as_deref())
    .fetch_one(pool)
    .await
}

/// Guarded status flip. Zero rows means the order moved under us.
pub async fn update_status(
    conn: &mut PgConnection,
    id: i64,
    from: &str,
    to: &str,
    now: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE orders SET status = $3, updated_at = $4 WHERE id = $1 AND status = $2",
    )
    .bind(id)
    .bind(from)
    .bind(to)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// Flip payment_status to PAID exactly once. Zero rows means it already was.
pub async fn mark_paid(conn: &mut PgConnection, id: i64, now: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE orders SET payment_status = 'PAID', updated_at = $2 WHERE id = $1 AND payment_status <> 'PAID'",
    )
    .bind(id)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// Move a PENDING payment to FAILED. Guarded so a late failure callback
/// cannot clobber a payment that settled through another attempt.
pub async fn fail_pending_payment(conn: &mut PgConnection, id: i64, now: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE orders SET payment_status = 'FAILED', updated_at = $2 WHERE id = $1 AND payment_status = 'PENDING'",
    )
    .bind(id)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

pub async fn set_payment_status(
    conn: &mut PgConnection,
    id: i64,
    to: &str,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET payment_status = $2, updated_at = $3 WHERE id = $1")
        .bind(id)
        .bind(to)
        .bind(now)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn set_cancellation(
    conn: &mut PgConnection,
    id: i64,
    reason: &str,
    stock_returned: bool,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE orders SET cancel_reason = $2, stock_returned = $3, updated_at = $4 WHERE id = $1",
    )
    .bind(id)
    .bind(reason)
    .bind(stock_returned)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn set_dispute_reason(
    conn: &mut PgConnection,
    id: i64,
    reason: &str,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET dispute_reason = $2, updated_at = $3 WHERE id = $1")
        .bind(id)
        .bind(reason)
        .bind(now)
        .execute(conn)
        .await?;
    Ok(())
}

/// COD orders are considered paid the moment the carrier hands them over
pub async fn stamp_cod_paid(conn: &mut PgConnection, id: i64, now: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE orders SET payment_status = 'PAID', cod_paid_at = $2, updated_at = $2 WHERE id = $1",
    )
    .bind(id)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}

/// Mark returned stock as restocked exactly once. Zero rows means a
/// concurrent confirmation already ran.
pub async fn confirm_stock_return(
    conn: &mut PgConnection,
    id: i64,
    now: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE orders SET stock_returned = TRUE, updated_at = $2 WHERE id = $1 AND stock_returned = FALSE",
    )
    .bind(id)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}
