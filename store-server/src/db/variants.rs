//! Variant (stock keeping unit) operations

use sqlx::PgConnection;

/// Atomic compare-and-swap deduction. Zero rows means not enough stock;
/// the caller decides what that means for the surrounding transaction.
pub async fn deduct_stock(
    conn: &mut PgConnection,
    variant_id: i64,
    quantity: i32,
    now: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE variants SET stock = stock - $2, updated_at = $3 WHERE id = $1 AND stock >= $2",
    )
    .bind(variant_id)
    .bind(quantity)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

pub async fn restock(
    conn: &mut PgConnection,
    variant_id: i64,
    quantity: i32,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE variants SET stock = stock + $2, updated_at = $3 WHERE id = $1")
        .bind(variant_id)
        .bind(quantity)
        .bind(now)
        .execute(conn)
        .await?;
    Ok(())
}
