//! Gateway callback endpoints
//!
//! Two channels report the same payment. The browser return redirect is
//! untrusted display plumbing: it verifies the signature only to choose
//! which storefront page to land on and never writes anything. The IPN is
//! the server-to-server channel and is the only place money state moves.
//! The IPN endpoint always answers HTTP 200 with a gateway response code;
//! anything else makes the gateway retry forever.

use std::collections::HashMap;

use axum::Json;
use axum::extract::{Query, State};
use axum::response::Redirect;
use serde::Serialize;

use crate::db;
use crate::error::ServiceError;
use crate::notify;
use crate::orders::OrderView;
use crate::orders::settlement::{SettleOutcome, settle_failure, settle_success};
use crate::state::AppState;
use crate::vnpay;

fn order_id_from_txn_ref(txn_ref: &str) -> Option<i64> {
    let (id, _) = txn_ref.split_once('_')?;
    id.parse().ok()
}

/// GET /api/payment/gateway/return
///
/// Lands the shopper back on the storefront with a display outcome.
pub async fn gateway_return(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Redirect {
    let cb = vnpay::parse_callback(&state.config.vnpay_hash_secret, &params);

    let mut order_number = String::new();
    if cb.checksum_ok
        && let Some(order_id) = order_id_from_txn_ref(&cb.txn_ref)
        && let Ok(Some(row)) = db::orders::find_by_id(&state.pool, order_id).await
    {
        order_number = row.order_number;
    }

    let outcome = if !cb.checksum_ok || order_number.is_empty() {
        "invalid"
    } else if cb.response_code == vnpay::PAY_SUCCESS {
        "success"
    } else {
        "failed"
    };

    let mut qs = url::form_urlencoded::Serializer::new(String::new());
    qs.append_pair("order_number", &order_number);
    qs.append_pair("outcome", outcome);
    if !cb.response_code.is_empty() {
        qs.append_pair("code", &cb.response_code);
    }
    let target = format!("{}?{}", state.config.storefront_result_url, qs.finish());

    tracing::info!(order_number = %order_number, outcome, "Gateway return redirect");
    Redirect::to(&target)
}

#[derive(Serialize)]
pub struct IpnResponse {
    #[serde(rename = "RspCode")]
    pub rsp_code: &'static str,
    #[serde(rename = "Message")]
    pub message: &'static str,
}

fn ipn_response(rsp_code: &'static str, message: &'static str) -> Json<IpnResponse> {
    Json(IpnResponse { rsp_code, message })
}

/// GET /api/payment/gateway/ipn
pub async fn gateway_ipn(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<IpnResponse> {
    match process_ipn(&state, &params).await {
        Ok((code, message)) => ipn_response(code, message),
        Err(err) => {
            tracing::error!(error = ?err, "IPN processing failed");
            ipn_response(vnpay::RSP_UNKNOWN_ERROR, "Unknown error")
        }
    }
}

async fn process_ipn(
    state: &AppState,
    params: &HashMap<String, String>,
) -> Result<(&'static str, &'static str), ServiceError> {
    let cb = vnpay::parse_callback(&state.config.vnpay_hash_secret, params);
    if !cb.checksum_ok {
        tracing::warn!(txn_ref = %cb.txn_ref, "IPN with bad checksum rejected");
        return Ok((vnpay::RSP_CHECKSUM_FAILED, "Invalid checksum"));
    }

    let Some(order_id) = order_id_from_txn_ref(&cb.txn_ref) else {
        return Ok((vnpay::RSP_ORDER_NOT_FOUND, "Order not found"));
    };
    let Some(row) = db::orders::find_by_id(&state.pool, order_id).await? else {
        return Ok((vnpay::RSP_ORDER_NOT_FOUND, "Order not found"));
    };
    let items = db::orders::items_for_order(&state.pool, order_id).await?;
    let view = OrderView::from_row(&row, &items)?;

    let expected = vnpay::amount_x100(view.total).unwrap_or(-1);
    if cb.amount_x100 != expected {
        tracing::warn!(
            order_id,
            reported = cb.amount_x100,
            expected,
            "IPN amount does not match the order"
        );
        return Ok((vnpay::RSP_INVALID_AMOUNT, "Invalid amount"));
    }

    if cb.response_code == vnpay::PAY_SUCCESS {
        let outcome =
            settle_success(state, &view, &cb.txn_ref, &cb.gateway_txn_no, &cb.response_code)
                .await?;
        match outcome {
            SettleOutcome::AlreadySettled => {
                Ok((vnpay::RSP_ALREADY_CONFIRMED, "Order already confirmed"))
            }
            SettleOutcome::Settled => {
                let _ = notify::payment_succeeded(
                    &state.http,
                    state.config.notify_webhook_url.as_deref(),
                    &view.order_number,
                    view.total,
                )
                .await;
                Ok((vnpay::RSP_CONFIRMED, "Confirm success"))
            }
            // The money is recorded either way; staff handle the rest
            SettleOutcome::StockShort | SettleOutcome::CapturedAfterCancel => {
                Ok((vnpay::RSP_CONFIRMED, "Confirm success"))
            }
        }
    } else {
        settle_failure(state, &view, &cb.txn_ref, &cb.response_code).await?;
        Ok((vnpay::RSP_CONFIRMED, "Confirm success"))
    }
}
