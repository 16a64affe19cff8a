//! Cart operations
//!
//! Checkout reads the cart joined with live variant data so it can
//! snapshot names and prices into the order.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

#[derive(sqlx::FromRow)]
pub struct CartLine {
    pub variant_id: i64,
    pub quantity: i32,
    pub product_name: String,
    pub variant_name: String,
    pub sku: String,
    pub price: Decimal,
}

pub async fn lines_for_customer(
    pool: &PgPool,
    customer_id: i64,
) -> Result<Vec<CartLine>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT c.variant_id, c.quantity, v.product_name, v.variant_name, v.sku, v.price
        FROM cart_items c
        JOIN variants v ON v.id = c.variant_id
        WHERE c.customer_id = $1
        ORDER BY c.id
        "#,
    )
    .bind(customer_id)
    .fetch_all(pool)
    .await
}

pub async fn clear_for_customer(
    conn: &mut PgConnection,
    customer_id: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM cart_items WHERE customer_id = $1")
        .bind(customer_id)
        .execute(conn)
        .await?;
    Ok(())
}
