//! Back-office order management endpoints

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::HeaderMap,
};
use serde::Deserialize;
use shared::error::AppError;
use shared::order::{OrderStatus, PaymentStatus};

use super::{
    ApiResult, OrderDetailResponse, OrderSummary, Paginated, client_ip,
    dispatch_transition_notice, load_order_detail,
};
use crate::auth::staff::StaffIdentity;
use crate::db;
use crate::db::audit::AuditEntryRow;
use crate::db::orders::AdminListFilter;
use crate::error::ServiceError;
use crate::orders::execute::{execute_plan, execute_stock_return, load_order};
use crate::orders::refund::refund_order;
use crate::orders::transition::{plan_stock_return, plan_transition};
use crate::state::AppState;
use crate::utils::validation::{MAX_NOTE_LEN, validate_optional_text};

#[derive(Deserialize)]
pub struct AdminOrdersQuery {
    pub page: Option<i32>,
    pub per_page: Option<i32>,
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub order_number: Option<String>,
}

/// GET /api/admin/orders
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<AdminOrdersQuery>,
) -> ApiResult<Paginated<OrderSummary>> {
    if let Some(s) = &query.status {
        s.parse::<OrderStatus>()
            .map_err(|_| AppError::validation(format!("Unknown status filter: {s}")))?;
    }
    if let Some(s) = &query.payment_status {
        s.parse::<PaymentStatus>()
            .map_err(|_| AppError::validation(format!("Unknown payment status filter: {s}")))?;
    }

    let per_page = query.per_page.unwrap_or(20).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let filter = AdminListFilter {
        status: query.status.as_deref(),
        payment_status: query.payment_status.as_deref(),
        order_number: query.order_number.as_deref(),
        limit: per_page,
        offset: (page - 1) * per_page,
    };

    let rows = db::orders::admin_list(&state.pool, &filter)
        .await
        .map_err(ServiceError::from)?;
    let total = db::orders::admin_count(&state.pool, &filter)
        .await
        .map_err(ServiceError::from)?;

    Ok(Json(Paginated {
        items: rows.iter().map(OrderSummary::from).collect(),
        total,
        page,
        per_page,
    }))
}

/// GET /api/admin/orders/{id}
pub async fn order_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<OrderDetailResponse> {
    Ok(Json(load_order_detail(&state, id).await?))
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    /// Required when moving to CANCELLED or DISPUTE
    pub reason: Option<String>,
}

/// PUT /api/admin/orders/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    Extension(identity): Extension<StaffIdentity>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<OrderDetailResponse> {
    let to: OrderStatus = req
        .status
        .parse()
        .map_err(|_| AppError::validation(format!("Unknown status: {}", req.status)))?;
    validate_optional_text(&req.reason, "reason", MAX_NOTE_LEN)?;

    let (row, view) = load_order(&state, id).await?;
    let actor = identity.actor();
    let plan = plan_transition(&view, to, req.reason.as_deref(), &actor)?;
    execute_plan(&state, &plan, &actor).await?;
    dispatch_transition_notice(&state, &plan, &row.order_number).await;

    Ok(Json(load_order_detail(&state, id).await?))
}

/// POST /api/admin/orders/{id}/refund
pub async fn refund(
    State(state): State<AppState>,
    Extension(identity): Extension<StaffIdentity>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> ApiResult<OrderDetailResponse> {
    let actor = identity.actor();
    refund_order(&state, id, &actor, &client_ip(&headers)).await?;
    Ok(Json(load_order_detail(&state, id).await?))
}

/// POST /api/admin/orders/{id}/confirm-stock-return
pub async fn confirm_stock_return(
    State(state): State<AppState>,
    Extension(identity): Extension<StaffIdentity>,
    Path(id): Path<i64>,
) -> ApiResult<OrderDetailResponse> {
    let (_, view) = load_order(&state, id).await?;
    let actor = identity.actor();
    let lines = plan_stock_return(&view, &actor)?;
    execute_stock_return(&state, id, &lines, &actor).await?;
    Ok(Json(load_order_detail(&state, id).await?))
}

/// GET /api/admin/orders/{id}/history
pub async fn order_history(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<AuditEntryRow>> {
    // 404 for unknown ids rather than an empty trail
    load_order(&state, id).await?;
    let entries = db::audit::list_for_order(&state.pool, id)
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(entries))
}
