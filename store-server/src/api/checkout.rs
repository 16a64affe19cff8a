//! Checkout and payment retry endpoints

use axum::http::HeaderMap;
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::error::AppError;
use shared::order::PaymentMethod;
use validator::Validate;

use super::{ApiResult, client_ip};
use crate::auth::customer::CustomerIdentity;
use crate::orders::checkout::{CheckoutInput, place_order, retry_payment};
use crate::state::AppState;

#[derive(Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, max = 200))]
    pub recipient_name: String,
    #[validate(length(min = 1, max = 32))]
    pub recipient_phone: String,
    #[validate(length(min = 1, max = 500))]
    pub shipping_address: String,
    #[validate(length(max = 500))]
    pub note: Option<String>,
    #[validate(length(max = 64))]
    pub coupon_code: Option<String>,
    /// "COD" or "GATEWAY"
    pub payment_method: String,
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub order_id: i64,
    pub order_number: String,
    pub total: Decimal,
    /// Where to send the shopper next; None for COD
    pub payment_url: Option<String>,
}

/// POST /api/checkout
pub async fn checkout(
    State(state): State<AppState>,
    Extension(identity): Extension<CustomerIdentity>,
    headers: HeaderMap,
    Json(req): Json<CheckoutRequest>,
) -> ApiResult<CheckoutResponse> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;
    let payment_method: PaymentMethod = req
        .payment_method
        .parse()
        .map_err(|_| AppError::validation("payment_method must be COD or GATEWAY"))?;

    let outcome = place_order(
        &state,
        &identity,
        &CheckoutInput {
            payment_method,
            recipient_name: &req.recipient_name,
            recipient_phone: &req.recipient_phone,
            shipping_address: &req.shipping_address,
            note: req.note.as_deref(),
            coupon_code: req.coupon_code.as_deref(),
            client_ip: &client_ip(&headers),
        },
    )
    .await?;

    Ok(Json(CheckoutResponse {
        order_id: outcome.order_id,
        order_number: outcome.order_number,
        total: outcome.total,
        payment_url: outcome.payment_url,
    }))
}

/// POST /api/my/orders/{id}/pay
pub async fn retry_pay(
    State(state): State<AppState>,
    Extension(identity): Extension<CustomerIdentity>,
    Path(order_id): Path<i64>,
    headers: HeaderMap,
) -> ApiResult<CheckoutResponse> {
    let outcome = retry_payment(&state, &identity, order_id, &client_ip(&headers)).await?;
    Ok(Json(CheckoutResponse {
        order_id: outcome.order_id,
        order_number: outcome.order_number,
        total: outcome.total,
        payment_url: outcome.payment_url,
    }))
}
