//! HTTP API for the store server

pub mod admin_orders;
pub mod checkout;
pub mod health;
pub mod my_orders;
pub mod payment;

use axum::http::HeaderMap;
use axum::routing::{get, post, put};
use axum::{Router, middleware};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::error::AppError;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::customer::customer_auth_middleware;
use crate::auth::staff::staff_auth_middleware;
use crate::db::audit::AuditEntryRow;
use crate::db::orders::{OrderItemRow, OrderRow};
use crate::db::payments::PaymentRow;
use crate::state::AppState;

pub type ApiResult<T> = Result<axum::Json<T>, AppError>;

/// Paged list response
#[derive(Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i32,
    pub per_page: i32,
}

#[derive(Serialize)]
pub struct OrderSummary {
    pub id: i64,
    pub order_number: String,
    pub status: String,
    pub payment_status: String,
    pub payment_method: String,
    pub total: Decimal,
    pub created_at: i64,
}

impl From<&OrderRow> for OrderSummary {
    fn from(row: &OrderRow) -> Self {
        Self {
            id: row.id,
            order_number: row.order_number.clone(),
            status: row.status.clone(),
            payment_status: row.payment_status.clone(),
            payment_method: row.payment_method.clone(),
            total: row.total,
            created_at: row.created_at,
        }
    }
}

/// Full order detail, shared by the customer and staff endpoints
#[derive(Serialize)]
pub struct OrderDetailResponse {
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
    pub items: Vec<OrderItemRow>,
    pub payments: Vec<PaymentRow>,
    pub history: Vec<AuditEntryRow>,
}

pub fn order_detail_response(
    row: OrderRow,
    items: Vec<OrderItemRow>,
    payments: Vec<PaymentRow>,
    history: Vec<AuditEntryRow>,
) -> OrderDetailResponse {
    OrderDetailResponse {
        id: row.id,
        order_number: row.order_number,
        customer_id: row.customer_id,
        customer_email: row.customer_email,
        status: row.status,
        payment_status: row.payment_status,
        payment_method: row.payment_method,
        subtotal: row.subtotal,
        discount: row.discount,
        shipping_fee: row.shipping_fee,
        total: row.total,
        coupon_code: row.coupon_code,
        recipient_name: row.recipient_name,
        recipient_phone: row.recipient_phone,
        shipping_address: row.shipping_address,
        note: row.note,
        cancel_reason: row.cancel_reason,
        dispute_reason: row.dispute_reason,
        stock_returned: row.stock_returned,
        cod_paid_at: row.cod_paid_at,
        created_at: row.created_at,
        updated_at: row.updated_at,
        items,
        payments,
        history,
    }
}

/// Fetch the detail response for an order that is already authorized.
pub async fn load_order_detail(state: &AppState, id: i64) -> Result<OrderDetailResponse, AppError> {
    let (row, _) = crate::orders::execute::load_order(state, id).await?;
    let items = crate::db::orders::items_for_order(&state.pool, id)
        .await
        .map_err(crate::error::ServiceError::from)?;
    let payments = crate::db::payments::list_for_order(&state.pool, id)
        .await
        .map_err(crate::error::ServiceError::from)?;
    let history = crate::db::audit::list_for_order(&state.pool, id)
        .await
        .map_err(crate::error::ServiceError::from)?;
    Ok(order_detail_response(row, items, payments, history))
}

/// Send the notification a committed transition asks for. Failures are
/// ignored; the order change already happened.
pub async fn dispatch_transition_notice(
    state: &AppState,
    plan: &crate::orders::transition::TransitionPlan,
    order_number: &str,
) {
    use crate::orders::transition::NotifyKind;
    match plan.notify {
        NotifyKind::None => {}
        NotifyKind::StatusChanged => {
            let _ = crate::notify::order_status_changed(
                &state.http,
                state.config.notify_webhook_url.as_deref(),
                order_number,
                plan.from.as_str(),
                plan.to.as_str(),
            )
            .await;
        }
        NotifyKind::Cancelled => {
            let reason = plan
                .audit
                .detail
                .as_ref()
                .and_then(|d| d.get("reason"))
                .and_then(|r| r.as_str())
                .unwrap_or("");
            let _ = crate::notify::order_cancelled(
                &state.http,
                state.config.notify_webhook_url.as_deref(),
                order_number,
                reason,
            )
            .await;
        }
    }
}

/// Best-effort client address for gateway bookkeeping. The server sits
/// behind a reverse proxy, so the first X-Forwarded-For hop is the real
/// peer when present.
pub fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "127.0.0.1".to_string())
}

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    // Customer self-service (JWT authenticated)
    let customer = Router::new()
        .route("/api/checkout", post(checkout::checkout))
        .route("/api/my/orders", get(my_orders::list_my_orders))
        .route("/api/my/orders/{id}", get(my_orders::my_order_detail))
        .route("/api/my/orders/{id}/cancel", post(my_orders::cancel_my_order))
        .route(
            "/api/my/orders/{id}/confirm-delivery",
            post(my_orders::confirm_delivery),
        )
        .route("/api/my/orders/{id}/report-issue", post(my_orders::report_issue))
        .route("/api/my/orders/{id}/pay", post(checkout::retry_pay))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            customer_auth_middleware,
        ));

    // Back office (staff JWT with role claims)
    let staff = Router::new()
        .route("/api/admin/orders", get(admin_orders::list_orders))
        .route("/api/admin/orders/{id}", get(admin_orders::order_detail))
        .route("/api/admin/orders/{id}/status", put(admin_orders::update_status))
        .route("/api/admin/orders/{id}/refund", post(admin_orders::refund))
        .route(
            "/api/admin/orders/{id}/confirm-stock-return",
            post(admin_orders::confirm_stock_return),
        )
        .route("/api/admin/orders/{id}/history", get(admin_orders::order_history))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            staff_auth_middleware,
        ));

    // Gateway callbacks (signature-verified, no JWT)
    let gateway = Router::new()
        .route("/api/payment/gateway/return", get(payment::gateway_return))
        .route("/api/payment/gateway/ipn", get(payment::gateway_ipn));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(customer)
        .merge(staff)
        .merge(gateway)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
