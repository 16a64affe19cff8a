//! Refund processing
//!
//! Only orders whose payment sits in PENDING_REFUND can be refunded, and
//! only by a manager. Gateway refunds call the merchant API first and write
//! the books only after the gateway says yes; if the call succeeds and the
//! process dies before the commit, the audit trail plus the gateway
//! dashboard disagree with the orders table and reconciliation favors the
//! gateway. COD refunds are handed back outside the system and just
//! recorded here.

use rust_decimal::Decimal;
use serde_json::json;
use shared::error::{AppError, ErrorCode};
use shared::order::PaymentStatus;
use shared::util::now_millis;

use crate::auth::Actor;
use crate::db;
use crate::db::audit::NewAuditEntry;
use crate::error::ServiceError;
use crate::notify;
use crate::orders::execute::load_order;
use crate::state::AppState;
use crate::vnpay;

/// Process the refund an order is waiting on. Returns the refunded amount.
pub async fn refund_order(
    state: &AppState,
    order_id: i64,
    actor: &Actor,
    client_ip: &str,
) -> Result<Decimal, ServiceError> {
    if !actor.is_manager() {
        return Err(AppError::new(ErrorCode::ManagerRequired).into());
    }
    let (row, view) = load_order(state, order_id).await?;
    match view.payment_status {
        PaymentStatus::PendingRefund => {}
        PaymentStatus::Refunded => {
            return Err(AppError::new(ErrorCode::PaymentAlreadyRefunded).into());
        }
        _ => {
            return Err(AppError::new(ErrorCode::PaymentNotRefundable).into());
        }
    }

    let payment = db::payments::find_paid_for_order(&state.pool, order_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::PaymentNotFound))?;

    let mut gateway_txn_no_used: Option<String> = None;
    if !view.payment_method.is_cod() {
        let (txn_ref, gateway_txn_no, paid_at) =
            match (&payment.txn_ref, &payment.gateway_txn_no, payment.paid_at) {
                (Some(r), Some(n), Some(t)) => (r.as_str(), n.as_str(), t),
                _ => return Err(AppError::new(ErrorCode::RefundMissingGatewayData).into()),
            };
        let amount = vnpay::amount_x100(payment.amount)
            .ok_or_else(|| AppError::internal("Refund amount exceeds the gateway amount range"))?;
        let order_info = format!("Refund for {}", row.order_number);

        let response = vnpay::refund(
            &state.http,
            &vnpay::RefundParams {
                tmn_code: &state.config.vnpay_tmn_code,
                secret: &state.config.vnpay_hash_secret,
                api_url: &state.config.vnpay_api_url,
                txn_ref,
                amount_x100: amount,
                order_info: &order_info,
                gateway_txn_no,
                paid_at_millis: paid_at,
                created_by: actor.display_name(),
                client_ip,
                now_millis: now_millis(),
            },
        )
        .await
        .map_err(|err| {
            tracing::error!(order_id, error = %err, "Refund call to the gateway failed");
            AppError::new(ErrorCode::NetworkError)
        })?;

        if !response.is_success() {
            return Err(AppError::new(ErrorCode::GatewayRejected)
                .with_detail("gateway_code", json!(response.response_code))
                .with_detail("gateway_message", json!(response.message))
                .into());
        }
        gateway_txn_no_used = Some(gateway_txn_no.to_string());
    }

    let now = now_millis();
    let mut tx = state.pool.begin().await?;

    let closed = db::payments::mark_refunded(&mut tx, payment.id, now).await?;
    if closed == 0 {
        return Err(AppError::new(ErrorCode::PaymentAlreadyRefunded).into());
    }
    db::orders::set_payment_status(&mut tx, order_id, PaymentStatus::Refunded.as_str(), now).await?;

    let mut detail = json!({
        "amount": payment.amount.to_string(),
        "method": view.payment_method.as_str(),
    });
    if let Some(no) = &gateway_txn_no_used {
        detail["gateway_txn_no"] = json!(no);
    } else {
        detail["manual"] = json!(true);
    }
    db::audit::record(
        &mut tx,
        &NewAuditEntry {
            order_id,
            action: "refund_processed",
            actor_type: actor.actor_type(),
            actor_id: actor.actor_id(),
            actor_name: actor.display_name(),
            from_status: None,
            to_status: None,
            detail: Some(&detail),
            now,
        },
    )
    .await?;

    tx.commit().await?;

    let _ = notify::refund_processed(
        &state.http,
        state.config.notify_webhook_url.as_deref(),
        &row.order_number,
        payment.amount,
    )
    .await;

    Ok(payment.amount)
}
