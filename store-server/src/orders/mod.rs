//! Order domain logic
//!
//! Split in two halves: pure planning (the transition graph, role rules,
//! which side effects apply) and execution against the database. Planning
//! never touches the database, which keeps the rules testable without a
//! running Postgres.

pub mod checkout;
pub mod coupon;
pub mod execute;
pub mod refund;
pub mod settlement;
pub mod transition;

use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::order::{OrderStatus, PaymentMethod, PaymentStatus};

use crate::db::orders::{OrderItemRow, OrderRow};

/// One stock movement
#[derive(Debug, Clone, PartialEq)]
pub struct StockLine {
    pub variant_id: i64,
    pub quantity: i32,
}

/// Domain view of an order: the row with status columns parsed
#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: i64,
    pub order_number: String,
    pub customer_id: i64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub total: Decimal,
    pub stock_returned: bool,
    pub lines: Vec<StockLine>,
}

impl OrderView {
    /// Parse a database row into the domain view.
    ///
    /// A status string that does not parse means the row was written by
    /// something other than this application; surface it as an internal
    /// error rather than guessing.
    pub fn from_row(row: &OrderRow, items: &[OrderItemRow]) -> Result<Self, AppError> {
        let status: OrderStatus = row
            .status
            .parse()
            .map_err(|_| bad_row(row.id, "status", &row.status))?;
        let payment_status: PaymentStatus = row
            .payment_status
            .parse()
            .map_err(|_| bad_row(row.id, "payment_status", &row.payment_status))?;
        let payment_method: PaymentMethod = row
            .payment_method
            .parse()
            .map_err(|_| bad_row(row.id, "payment_method", &row.payment_method))?;

        Ok(Self {
            id: row.id,
            order_number: row.order_number.clone(),
            customer_id: row.customer_id,
            status,
            payment_status,
            payment_method,
            total: row.total,
            stock_returned: row.stock_returned,
            lines: items
                .iter()
                .map(|i| StockLine {
                    variant_id: i.variant_id,
                    quantity: i.quantity,
                })
                .collect(),
        })
    }
}

fn bad_row(order_id: i64, column: &str, value: &str) -> AppError {
    tracing::error!(order_id, column, value, "Order row has an unparseable status column");
    AppError::new(ErrorCode::InternalError)
}
