//! Customer self-service order endpoints
//!
//! Every endpoint here is scoped to the authenticated customer. Orders
//! belonging to someone else come back as not-found rather than forbidden
//! so order ids cannot be probed.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};

use super::{
    ApiResult, OrderDetailResponse, OrderSummary, Paginated, dispatch_transition_notice,
    load_order_detail, order_detail_response,
};
use crate::auth::customer::CustomerIdentity;
use crate::db;
use crate::error::ServiceError;
use crate::orders::OrderView;
use crate::orders::execute::{execute_plan, load_order};
use crate::orders::transition::{plan_confirm_delivery, plan_customer_cancel, plan_report_issue};
use crate::state::AppState;
use crate::utils::validation::{MAX_NOTE_LEN, validate_optional_text, validate_required_text};

fn ensure_mine(view: &OrderView, identity: &CustomerIdentity) -> Result<(), AppError> {
    if view.customer_id != identity.customer_id {
        return Err(AppError::with_message(ErrorCode::OrderNotFound, "Order not found"));
    }
    Ok(())
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<i32>,
    pub per_page: Option<i32>,
}

/// GET /api/my/orders
pub async fn list_my_orders(
    State(state): State<AppState>,
    Extension(identity): Extension<CustomerIdentity>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Paginated<OrderSummary>> {
    let per_page = query.per_page.unwrap_or(20).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    let rows = db::orders::list_by_customer(&state.pool, identity.customer_id, per_page, offset)
        .await
        .map_err(ServiceError::from)?;
    let total = db::orders::count_by_customer(&state.pool, identity.customer_id)
        .await
        .map_err(ServiceError::from)?;

    Ok(Json(Paginated {
        items: rows.iter().map(OrderSummary::from).collect(),
        total,
        page,
        per_page,
    }))
}

/// GET /api/my/orders/{id}
pub async fn my_order_detail(
    State(state): State<AppState>,
    Extension(identity): Extension<CustomerIdentity>,
    Path(id): Path<i64>,
) -> ApiResult<OrderDetailResponse> {
    let (row, view) = load_order(&state, id).await?;
    ensure_mine(&view, &identity)?;
    let items = db::orders::items_for_order(&state.pool, id)
        .await
        .map_err(ServiceError::from)?;
    let payments = db::payments::list_for_order(&state.pool, id)
        .await
        .map_err(ServiceError::from)?;
    let history = db::audit::list_for_order(&state.pool, id)
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(order_detail_response(row, items, payments, history)))
}

#[derive(Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

/// POST /api/my/orders/{id}/cancel
pub async fn cancel_my_order(
    State(state): State<AppState>,
    Extension(identity): Extension<CustomerIdentity>,
    Path(id): Path<i64>,
    Json(req): Json<CancelRequest>,
) -> ApiResult<OrderDetailResponse> {
    validate_optional_text(&req.reason, "reason", MAX_NOTE_LEN)?;
    let (row, view) = load_order(&state, id).await?;
    ensure_mine(&view, &identity)?;

    let actor = identity.actor();
    let plan = plan_customer_cancel(&view, req.reason.as_deref(), &actor)?;
    execute_plan(&state, &plan, &actor).await?;
    dispatch_transition_notice(&state, &plan, &row.order_number).await;

    Ok(Json(load_order_detail(&state, id).await?))
}

/// POST /api/my/orders/{id}/confirm-delivery
pub async fn confirm_delivery(
    State(state): State<AppState>,
    Extension(identity): Extension<CustomerIdentity>,
    Path(id): Path<i64>,
) -> ApiResult<OrderDetailResponse> {
    let (row, view) = load_order(&state, id).await?;
    ensure_mine(&view, &identity)?;

    let actor = identity.actor();
    let plan = plan_confirm_delivery(&view, &actor)?;
    execute_plan(&state, &plan, &actor).await?;
    dispatch_transition_notice(&state, &plan, &row.order_number).await;

    Ok(Json(load_order_detail(&state, id).await?))
}

#[derive(Deserialize)]
pub struct ReportIssueRequest {
    pub reason: String,
}

/// POST /api/my/orders/{id}/report-issue
pub async fn report_issue(
    State(state): State<AppState>,
    Extension(identity): Extension<CustomerIdentity>,
    Path(id): Path<i64>,
    Json(req): Json<ReportIssueRequest>,
) -> ApiResult<OrderDetailResponse> {
    validate_required_text(&req.reason, "reason", MAX_NOTE_LEN)?;
    let (row, view) = load_order(&state, id).await?;
    ensure_mine(&view, &identity)?;

    let actor = identity.actor();
    let plan = plan_report_issue(&view, Some(&req.reason), &actor)?;
    execute_plan(&state, &plan, &actor).await?;
    dispatch_transition_notice(&state, &plan, &row.order_number).await;

    Ok(Json(load_order_detail(&state, id).await?))
}
