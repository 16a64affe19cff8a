//! Coupon operations

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

#[derive(sqlx::FromRow)]
pub struct CouponRow {
    pub id: i64,
    pub code: String,
    pub active: bool,
    pub discount_percent: Decimal,
    pub max_discount_amount: Option<Decimal>,
    pub min_order_amount: Option<Decimal>,
    pub starts_at: i64,
    pub expires_at: i64,
    pub usage_limit: i32,
    pub used_count: i32,
    pub created_at: i64,
}

/// Codes are stored uppercase; lookups fold the input to match.
pub async fn find_by_code(pool: &PgPool, code: &str) -> Result<Option<CouponRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM coupons WHERE code = UPPER($1)")
        .bind(code)
        .fetch_optional(pool)
        .await
}

/// Take one use. Guarded against the usage limit so two concurrent
/// checkouts cannot both take the last slot. Zero rows means exhausted.
pub async fn consume(conn: &mut PgConnection, coupon_id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE coupons SET used_count = used_count + 1 WHERE id = $1 AND (usage_limit = 0 OR used_count < usage_limit)",
    )
    .bind(coupon_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}
