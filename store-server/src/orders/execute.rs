//! Applies a [`TransitionPlan`] to the database.
//!
//! The status flip is a guarded compare-and-swap on the row; if another
//! request moved the order first the update touches zero rows and the whole
//! transaction rolls back. Stock deductions use the same trick per variant,
//! so two orders racing for the last unit cannot both win.

use shared::error::{AppError, ErrorCode};
use shared::util::now_millis;

use crate::auth::Actor;
use crate::db;
use crate::db::audit::NewAuditEntry;
use crate::db::orders::OrderRow;
use crate::error::{ServiceError, ServiceResult};
use crate::orders::transition::{SideEffect, TransitionPlan};
use crate::orders::{OrderView, StockLine};
use crate::state::AppState;

/// Fetch an order plus its lines and parse into the domain view.
pub async fn load_order(state: &AppState, id: i64) -> ServiceResult<(OrderRow, OrderView)> {
    let row = db::orders::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    let items = db::orders::items_for_order(&state.pool, id).await?;
    let view = OrderView::from_row(&row, &items)?;
    Ok((row, view))
}

/// Run a planned transition in one transaction. The transaction rolls back
/// on any error, including a lost status race or a stock shortage.
pub async fn execute_plan(
    state: &AppState,
    plan: &TransitionPlan,
    actor: &Actor,
) -> Result<(), ServiceError> {
    let now = now_millis();
    let mut tx = state.pool.begin().await?;

    let flipped = db::orders::update_status(
        &mut tx,
        plan.order_id,
        plan.from.as_str(),
        plan.to.as_str(),
        now,
    )
    .await?;
    if flipped == 0 {
        return Err(AppError::with_message(
            ErrorCode::InvalidTransition,
            "Order was modified concurrently; refresh and retry",
        )
        .into());
    }

    for effect in &plan.effects {
        apply_effect(&mut tx, plan.order_id, effect, now).await?;
    }

    db::audit::record(
        &mut tx,
        &NewAuditEntry {
            order_id: plan.order_id,
            action: plan.audit.action,
            actor_type: actor.actor_type(),
            actor_id: actor.actor_id(),
            actor_name: actor.display_name(),
            from_status: Some(plan.from.as_str()),
            to_status: Some(plan.to.as_str()),
            detail: plan.audit.detail.as_ref(),
            now,
        },
    )
    .await?;

    tx.commit().await?;
    Ok(())
}

async fn apply_effect(
    tx: &mut sqlx::PgConnection,
    order_id: i64,
    effect: &SideEffect,
    now: i64,
) -> Result<(), ServiceError> {
    match effect {
        SideEffect::DeductStock(lines) => deduct_lines(tx, lines, now).await,
        SideEffect::RestockAll(lines) => {
            for line in lines {
                db::variants::restock(tx, line.variant_id, line.quantity, now).await?;
            }
            Ok(())
        }
        SideEffect::SetPaymentStatus(status) => {
            db::orders::set_payment_status(tx, order_id, status.as_str(), now).await?;
            Ok(())
        }
        SideEffect::StampCodPaid => {
            db::orders::stamp_cod_paid(tx, order_id, now).await?;
            db::payments::mark_cod_paid_for_order(tx, order_id, now).await?;
            Ok(())
        }
        SideEffect::SetCancellation {
            reason,
            stock_returned,
        } => {
            db::orders::set_cancellation(tx, order_id, reason, *stock_returned, now).await?;
            Ok(())
        }
        SideEffect::SetDisputeReason(reason) => {
            db::orders::set_dispute_reason(tx, order_id, reason, now).await?;
            Ok(())
        }
    }
}

/// CAS-deduct every line; the first variant without enough stock aborts.
pub async fn deduct_lines(
    tx: &mut sqlx::PgConnection,
    lines: &[StockLine],
    now: i64,
) -> Result<(), ServiceError> {
    for line in lines {
        let rows = db::variants::deduct_stock(tx, line.variant_id, line.quantity, now).await?;
        if rows == 0 {
            return Err(AppError::new(ErrorCode::InsufficientStock)
                .with_detail("variant_id", serde_json::json!(line.variant_id))
                .into());
        }
    }
    Ok(())
}

/// Restock a cancelled order's lines once the goods physically returned.
/// The flag flip is guarded so a double submit cannot restock twice.
pub async fn execute_stock_return(
    state: &AppState,
    order_id: i64,
    lines: &[StockLine],
    actor: &Actor,
) -> Result<(), ServiceError> {
    let now = now_millis();
    let mut tx = state.pool.begin().await?;

    let flipped = db::orders::confirm_stock_return(&mut tx, order_id, now).await?;
    if flipped == 0 {
        return Err(AppError::new(ErrorCode::StockAlreadyReturned).into());
    }
    for line in lines {
        db::variants::restock(&mut tx, line.variant_id, line.quantity, now).await?;
    }
    db::audit::record(
        &mut tx,
        &NewAuditEntry {
            order_id,
            action: "stock_return_confirmed",
            actor_type: actor.actor_type(),
            actor_id: actor.actor_id(),
            actor_name: actor.display_name(),
            from_status: None,
            to_status: None,
            detail: None,
            now,
        },
    )
    .await?;

    tx.commit().await?;
    Ok(())
}
