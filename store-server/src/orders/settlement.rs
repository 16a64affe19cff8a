//! Gateway payment settlement (IPN channel)
//!
//! The IPN is the only input allowed to move money state; the browser
//! return channel is display-only. Settlement must survive duplicate
//! deliveries, late deliveries for orders that already moved on, and the
//! window where a second shopper bought the last unit while this one was
//! typing their card number.
//!
//! The one deliberately odd path: payment captured but stock gone. The
//! money is real, so the payment is recorded and the order stays PENDING
//! for staff to resolve by restocking and re-confirming, or cancelling
//! into a refund. The gateway still gets a success response; the problem
//! is ours, not theirs.

use serde_json::json;
use shared::error::ErrorCode;
use shared::order::{OrderStatus, PaymentStatus};
use shared::util::now_millis;

use crate::db;
use crate::db::audit::NewAuditEntry;
use crate::error::ServiceError;
use crate::orders::OrderView;
use crate::orders::execute::deduct_lines;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    /// Payment recorded, order confirmed, stock deducted
    Settled,
    /// Duplicate delivery; everything already done
    AlreadySettled,
    /// Payment recorded but stock ran out; order held in PENDING
    StockShort,
    /// Payment arrived for an order cancelled in the meantime
    CapturedAfterCancel,
}

/// Apply a successful gateway payment.
///
/// The order-level paid flip is the settlement claim: whichever delivery
/// wins that compare-and-swap does the work, every other delivery sees
/// zero rows and reports "already confirmed".
pub async fn settle_success(
    state: &AppState,
    order: &OrderView,
    txn_ref: &str,
    gateway_txn_no: &str,
    response_code: &str,
) -> Result<SettleOutcome, ServiceError> {
    let now = now_millis();
    let mut tx = state.pool.begin().await?;

    let captured = db::orders::mark_paid(&mut tx, order.id, now).await?;
    if captured == 0 {
        tx.rollback().await?;
        return Ok(SettleOutcome::AlreadySettled);
    }

    let closed = db::payments::mark_paid_by_txn_ref(&mut tx, txn_ref, gateway_txn_no, response_code, now)
        .await?;
    if closed == 0 {
        // The attempt row was closed by a retry; the order-level flip above
        // is still the source of truth, so keep going but leave a trace
        tracing::warn!(order_id = order.id, txn_ref, "Settled payment maps to a closed attempt row");
    }

    let confirmed =
        db::orders::update_status(&mut tx, order.id, OrderStatus::Pending.as_str(), OrderStatus::Confirmed.as_str(), now)
            .await?;
    if confirmed == 0 {
        // Order moved past PENDING before the money arrived
        let status_now: String = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
            .bind(order.id)
            .fetch_one(&mut *tx)
            .await?;
        if status_now == OrderStatus::Cancelled.as_str() {
            db::orders::set_payment_status(&mut tx, order.id, PaymentStatus::PendingRefund.as_str(), now)
                .await?;
            let detail = json!({ "gateway_txn_no": gateway_txn_no });
            db::audit::record(
                &mut tx,
                &NewAuditEntry {
                    order_id: order.id,
                    action: "payment_captured_after_cancel",
                    actor_type: "SYSTEM",
                    actor_id: None,
                    actor_name: "gateway",
                    from_status: None,
                    to_status: None,
                    detail: Some(&detail),
                    now,
                },
            )
            .await?;
            tx.commit().await?;
            tracing::warn!(
                order_id = order.id,
                order_number = %order.order_number,
                "Payment captured for a cancelled order; flagged for refund"
            );
            return Ok(SettleOutcome::CapturedAfterCancel);
        }
        // Staff confirmed ahead of payment; stock is still owed below
    }

    match deduct_lines(&mut tx, &order.lines, now).await {
        Ok(()) => {}
        Err(err) if is_stock_short(&err) => {
            tx.rollback().await?;
            return capture_without_stock(state, order, txn_ref, gateway_txn_no, response_code, now)
                .await;
        }
        Err(err) => return Err(err),
    }

    let detail = json!({ "gateway_txn_no": gateway_txn_no });
    db::audit::record(
        &mut tx,
        &NewAuditEntry {
            order_id: order.id,
            action: "payment_settled",
            actor_type: "SYSTEM",
            actor_id: None,
            actor_name: "gateway",
            from_status: (confirmed == 1).then(|| OrderStatus::Pending.as_str()),
            to_status: (confirmed == 1).then(|| OrderStatus::Confirmed.as_str()),
            detail: Some(&detail),
            now,
        },
    )
    .await?;

    tx.commit().await?;
    Ok(SettleOutcome::Settled)
}

/// Record the capture without touching stock: the order stays PENDING with
/// payment PAID until staff restock and re-confirm, or cancel into a refund.
async fn capture_without_stock(
    state: &AppState,
    order: &OrderView,
    txn_ref: &str,
    gateway_txn_no: &str,
    response_code: &str,
    now: i64,
) -> Result<SettleOutcome, ServiceError> {
    let mut tx = state.pool.begin().await?;
    let captured = db::orders::mark_paid(&mut tx, order.id, now).await?;
    if captured == 0 {
        tx.rollback().await?;
        return Ok(SettleOutcome::AlreadySettled);
    }
    db::payments::mark_paid_by_txn_ref(&mut tx, txn_ref, gateway_txn_no, response_code, now).await?;
    let detail = json!({
        "gateway_txn_no": gateway_txn_no,
        "reason": "insufficient stock at settlement",
    });
    db::audit::record(
        &mut tx,
        &NewAuditEntry {
            order_id: order.id,
            action: "payment_captured_stock_pending",
            actor_type: "SYSTEM",
            actor_id: None,
            actor_name: "gateway",
            from_status: None,
            to_status: None,
            detail: Some(&detail),
            now,
        },
    )
    .await?;
    tx.commit().await?;

    tracing::error!(
        order_id = order.id,
        order_number = %order.order_number,
        "Payment captured but stock ran out; order held in PENDING for staff"
    );
    Ok(SettleOutcome::StockShort)
}

/// Record a failed gateway attempt. Idempotent: a duplicate failure
/// callback finds the attempt row already closed and does nothing.
pub async fn settle_failure(
    state: &AppState,
    order: &OrderView,
    txn_ref: &str,
    response_code: &str,
) -> Result<(), ServiceError> {
    let now = now_millis();
    let mut tx = state.pool.begin().await?;

    let closed = db::payments::mark_failed_by_txn_ref(&mut tx, txn_ref, response_code, now).await?;
    if closed > 0 {
        let flipped = db::orders::fail_pending_payment(&mut tx, order.id, now).await?;
        if flipped > 0 {
            let detail = json!({ "response_code": response_code });
            db::audit::record(
                &mut tx,
                &NewAuditEntry {
                    order_id: order.id,
                    action: "payment_failed",
                    actor_type: "SYSTEM",
                    actor_id: None,
                    actor_name: "gateway",
                    from_status: None,
                    to_status: None,
                    detail: Some(&detail),
                    now,
                },
            )
            .await?;
        }
    }

    tx.commit().await?;
    Ok(())
}

fn is_stock_short(err: &ServiceError) -> bool {
    matches!(err, ServiceError::App(app) if app.code == ErrorCode::InsufficientStock)
}
