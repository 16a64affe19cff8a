//! Pure transition planning
//!
//! Every status change goes through [`plan_transition`] (staff paths) or one
//! of the customer self-service planners. The planner validates the move
//! against the transition graph and the actor's role, then returns a
//! [`TransitionPlan`] describing the side effects the executor must apply.
//! Nothing in this module touches the database.

use serde_json::json;
use shared::error::{AppError, ErrorCode};
use shared::order::{OrderStatus, PaymentStatus};

use crate::auth::Actor;
use crate::orders::{OrderView, StockLine};

/// Side effects applied alongside the status flip, in order
#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    /// Compare-and-swap deduction per line; short stock fails the transition
    DeductStock(Vec<StockLine>),
    /// Return every line to the shelf
    RestockAll(Vec<StockLine>),
    SetPaymentStatus(PaymentStatus),
    /// COD money changes hands at the door
    StampCodPaid,
    SetCancellation { reason: String, stock_returned: bool },
    SetDisputeReason(String),
}

/// What the executor writes to the audit trail
#[derive(Debug, Clone, PartialEq)]
pub struct AuditNote {
    pub action: &'static str,
    pub detail: Option<serde_json::Value>,
}

/// Which notification goes out after the transaction commits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    None,
    StatusChanged,
    Cancelled,
}

/// A validated transition, ready for the executor
#[derive(Debug, Clone)]
pub struct TransitionPlan {
    pub order_id: i64,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub effects: Vec<SideEffect>,
    pub audit: AuditNote,
    pub notify: NotifyKind,
}

/// Stock is deducted when an order reaches CONFIRMED only if the money is
/// certain: COD, or a gateway payment that already settled. A staff member
/// confirming an unpaid gateway order reserves nothing; the deduction
/// happens when the IPN lands.
fn stock_deducted_at_confirm(order: &OrderView) -> bool {
    order.payment_method.is_cod() || order.payment_status == PaymentStatus::Paid
}

fn require_manager(actor: &Actor) -> Result<(), AppError> {
    if actor.is_manager() {
        return Ok(());
    }
    Err(AppError::new(ErrorCode::ManagerRequired))
}

fn require_reason(reason: Option<&str>, code: ErrorCode) -> Result<String, AppError> {
    match reason.map(str::trim) {
        Some(r) if !r.is_empty() => Ok(r.to_string()),
        _ => Err(AppError::new(code)),
    }
}

fn invalid_transition(from: OrderStatus, to: OrderStatus) -> AppError {
    AppError::new(ErrorCode::InvalidTransition)
        .with_detail("from", json!(from.as_str()))
        .with_detail("to", json!(to.as_str()))
}

/// Cancellation side effects shared by the staff and customer paths.
///
/// Orders cancelled before shipment keep their books balanced immediately:
/// either nothing was deducted yet, or the goods never left and go straight
/// back. Once the parcel is moving, the record flags a pending physical
/// return instead and a manager confirms it later.
fn cancel_effects(order: &OrderView, reason: String) -> Vec<SideEffect> {
    let mut effects = Vec::new();
    let stock_returned = match order.status {
        OrderStatus::Pending => true,
        OrderStatus::Confirmed => {
            if stock_deducted_at_confirm(order) {
                effects.push(SideEffect::RestockAll(order.lines.clone()));
            }
            true
        }
        _ => false,
    };
    if order.payment_status == PaymentStatus::Paid {
        effects.push(SideEffect::SetPaymentStatus(PaymentStatus::PendingRefund));
    }
    effects.push(SideEffect::SetCancellation {
        reason,
        stock_returned,
    });
    effects
}

/// Plan a staff-driven status change.
pub fn plan_transition(
    order: &OrderView,
    to: OrderStatus,
    reason: Option<&str>,
    actor: &Actor,
) -> Result<TransitionPlan, AppError> {
    if matches!(actor, Actor::Customer { .. }) {
        return Err(AppError::forbidden(
            "Customers cannot change order status directly",
        ));
    }
    if order.status.is_terminal() {
        return Err(AppError::new(ErrorCode::OrderAlreadyTerminal)
            .with_detail("status", json!(order.status.as_str())));
    }
    if !order.status.can_transition(to) {
        return Err(invalid_transition(order.status, to));
    }

    let from = order.status;
    let (effects, audit, notify) = match (from, to) {
        (OrderStatus::Pending, OrderStatus::Confirmed) => {
            let deduct = stock_deducted_at_confirm(order);
            let effects = if deduct {
                vec![SideEffect::DeductStock(order.lines.clone())]
            } else {
                Vec::new()
            };
            let detail = (!deduct).then(|| json!({ "awaiting_payment": true }));
            (
                effects,
                AuditNote {
                    action: "order_confirmed",
                    detail,
                },
                NotifyKind::StatusChanged,
            )
        }
        (OrderStatus::Confirmed, OrderStatus::Pending) => {
            require_manager(actor)?;
            let effects = if stock_deducted_at_confirm(order) {
                vec![SideEffect::RestockAll(order.lines.clone())]
            } else {
                Vec::new()
            };
            (
                effects,
                AuditNote {
                    action: "order_reverted",
                    detail: None,
                },
                NotifyKind::StatusChanged,
            )
        }
        (OrderStatus::Confirmed, OrderStatus::Shipping) => (
            Vec::new(),
            AuditNote {
                action: "order_shipped",
                detail: None,
            },
            NotifyKind::StatusChanged,
        ),
        (OrderStatus::Shipping, OrderStatus::Delivered) => {
            let effects = if order.payment_method.is_cod() {
                vec![SideEffect::StampCodPaid]
            } else {
                Vec::new()
            };
            (
                effects,
                AuditNote {
                    action: "order_delivered",
                    detail: None,
                },
                NotifyKind::StatusChanged,
            )
        }
        (OrderStatus::Delivered, OrderStatus::Dispute) => {
            let reason = require_reason(reason, ErrorCode::MissingDisputeReason)?;
            (
                vec![SideEffect::SetDisputeReason(reason.clone())],
                AuditNote {
                    action: "order_disputed",
                    detail: Some(json!({ "reason": reason })),
                },
                NotifyKind::StatusChanged,
            )
        }
        (OrderStatus::Delivered, OrderStatus::Completed)
        | (OrderStatus::Dispute, OrderStatus::Completed) => (
            Vec::new(),
            AuditNote {
                action: "order_completed",
                detail: None,
            },
            NotifyKind::StatusChanged,
        ),
        (_, OrderStatus::Cancelled) => {
            let reason = require_reason(reason, ErrorCode::MissingCancellationReason)?;
            if from != OrderStatus::Pending {
                require_manager(actor)?;
            }
            (
                cancel_effects(order, reason.clone()),
                AuditNote {
                    action: "order_cancelled",
                    detail: Some(json!({ "reason": reason })),
                },
                NotifyKind::Cancelled,
            )
        }
        _ => return Err(invalid_transition(from, to)),
    };

    Ok(TransitionPlan {
        order_id: order.id,
        from,
        to,
        effects,
        audit,
        notify,
    })
}

fn require_owner(order: &OrderView, actor: &Actor) -> Result<(), AppError> {
    match actor {
        Actor::Customer { id, .. } if *id == order.customer_id => Ok(()),
        _ => Err(AppError::new(ErrorCode::NotOrderOwner)),
    }
}

/// Customer cancellation. Only allowed while the order is still in the
/// warehouse; anything already moving needs support staff.
pub fn plan_customer_cancel(
    order: &OrderView,
    reason: Option<&str>,
    actor: &Actor,
) -> Result<TransitionPlan, AppError> {
    require_owner(order, actor)?;
    if order.status.is_terminal() {
        return Err(AppError::new(ErrorCode::OrderAlreadyTerminal)
            .with_detail("status", json!(order.status.as_str())));
    }
    if !matches!(order.status, OrderStatus::Pending | OrderStatus::Confirmed) {
        return Err(AppError::with_message(
            ErrorCode::InvalidTransition,
            "This order can no longer be cancelled online; please contact support",
        ));
    }
    let reason = require_reason(reason, ErrorCode::MissingCancellationReason)?;

    Ok(TransitionPlan {
        order_id: order.id,
        from: order.status,
        to: OrderStatus::Cancelled,
        effects: cancel_effects(order, reason.clone()),
        audit: AuditNote {
            action: "order_cancelled",
            detail: Some(json!({ "reason": reason })),
        },
        notify: NotifyKind::Cancelled,
    })
}

/// Customer confirms the parcel arrived in good shape. Also the path that
/// closes a dispute the customer considers resolved.
pub fn plan_confirm_delivery(order: &OrderView, actor: &Actor) -> Result<TransitionPlan, AppError> {
    require_owner(order, actor)?;
    if !matches!(order.status, OrderStatus::Delivered | OrderStatus::Dispute) {
        return Err(AppError::with_message(
            ErrorCode::InvalidTransition,
            "This order is not awaiting delivery confirmation",
        ));
    }
    Ok(TransitionPlan {
        order_id: order.id,
        from: order.status,
        to: OrderStatus::Completed,
        effects: Vec::new(),
        audit: AuditNote {
            action: "order_completed",
            detail: None,
        },
        notify: NotifyKind::StatusChanged,
    })
}

/// Customer reports a problem with a delivered order.
pub fn plan_report_issue(
    order: &OrderView,
    reason: Option<&str>,
    actor: &Actor,
) -> Result<TransitionPlan, AppError> {
    require_owner(order, actor)?;
    if order.status != OrderStatus::Delivered {
        return Err(AppError::with_message(
            ErrorCode::InvalidTransition,
            "Only delivered orders can be reported",
        ));
    }
    let reason = require_reason(reason, ErrorCode::MissingDisputeReason)?;
    Ok(TransitionPlan {
        order_id: order.id,
        from: order.status,
        to: OrderStatus::Dispute,
        effects: vec![SideEffect::SetDisputeReason(reason.clone())],
        audit: AuditNote {
            action: "order_disputed",
            detail: Some(json!({ "reason": reason })),
        },
        notify: NotifyKind::StatusChanged,
    })
}

/// Goods from a shipped-then-cancelled order made it back to the warehouse.
/// Returns the lines to restock; the executor flips the flag and adjusts
/// stock in one transaction.
pub fn plan_stock_return(order: &OrderView, actor: &Actor) -> Result<Vec<StockLine>, AppError> {
    require_manager(actor)?;
    if order.status != OrderStatus::Cancelled {
        return Err(AppError::new(ErrorCode::StockReturnNotPending));
    }
    if order.stock_returned {
        return Err(AppError::new(ErrorCode::StockAlreadyReturned));
    }
    Ok(order.lines.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaffRole;
    use rust_decimal::Decimal;
    use shared::order::PaymentMethod;

    fn staff() -> Actor {
        Actor::Staff {
            id: 11,
            name: "liam".into(),
            role: StaffRole::Staff,
        }
    }

    fn manager() -> Actor {
        Actor::Staff {
            id: 12,
            name: "maria".into(),
            role: StaffRole::Manager,
        }
    }

    fn customer(id: i64) -> Actor {
        Actor::Customer {
            id,
            name: "casey".into(),
        }
    }

    fn order(
        status: OrderStatus,
        payment_status: PaymentStatus,
        method: PaymentMethod,
    ) -> OrderView {
        OrderView {
            id: 900,
            order_number: "ORD-20260101-ABCDEF".into(),
            customer_id: 77,
            status,
            payment_status,
            payment_method: method,
            total: Decimal::new(250_000, 0),
            stock_returned: false,
            lines: vec![
                StockLine {
                    variant_id: 1,
                    quantity: 2,
                },
                StockLine {
                    variant_id: 2,
                    quantity: 1,
                },
            ],
        }
    }

    #[test]
    fn test_confirm_cod_deducts_stock() {
        let o = order(OrderStatus::Pending, PaymentStatus::Pending, PaymentMethod::Cod);
        let plan = plan_transition(&o, OrderStatus::Confirmed, None, &staff()).unwrap();
        assert_eq!(plan.effects, vec![SideEffect::DeductStock(o.lines.clone())]);
        assert_eq!(plan.audit.action, "order_confirmed");
        assert_eq!(plan.notify, NotifyKind::StatusChanged);
    }

    #[test]
    fn test_confirm_unpaid_gateway_reserves_nothing() {
        let o = order(
            OrderStatus::Pending,
            PaymentStatus::Pending,
            PaymentMethod::Gateway,
        );
        let plan = plan_transition(&o, OrderStatus::Confirmed, None, &staff()).unwrap();
        assert!(plan.effects.is_empty());
        assert_eq!(
            plan.audit.detail,
            Some(json!({ "awaiting_payment": true }))
        );
    }

    #[test]
    fn test_confirm_paid_gateway_deducts_stock() {
        // Re-confirming after a stock shortage held the order in PENDING
        let o = order(
            OrderStatus::Pending,
            PaymentStatus::Paid,
            PaymentMethod::Gateway,
        );
        let plan = plan_transition(&o, OrderStatus::Confirmed, None, &staff()).unwrap();
        assert_eq!(plan.effects, vec![SideEffect::DeductStock(o.lines.clone())]);
    }

    #[test]
    fn test_revert_requires_manager() {
        let o = order(OrderStatus::Confirmed, PaymentStatus::Pending, PaymentMethod::Cod);
        let err = plan_transition(&o, OrderStatus::Pending, None, &staff()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ManagerRequired);

        let plan = plan_transition(&o, OrderStatus::Pending, None, &manager()).unwrap();
        assert_eq!(plan.effects, vec![SideEffect::RestockAll(o.lines.clone())]);
    }

    #[test]
    fn test_revert_unpaid_gateway_restocks_nothing() {
        let o = order(
            OrderStatus::Confirmed,
            PaymentStatus::Pending,
            PaymentMethod::Gateway,
        );
        let plan = plan_transition(&o, OrderStatus::Pending, None, &manager()).unwrap();
        assert!(plan.effects.is_empty());
    }

    #[test]
    fn test_deliver_cod_stamps_collection() {
        let o = order(OrderStatus::Shipping, PaymentStatus::Pending, PaymentMethod::Cod);
        let plan = plan_transition(&o, OrderStatus::Delivered, None, &staff()).unwrap();
        assert_eq!(plan.effects, vec![SideEffect::StampCodPaid]);
    }

    #[test]
    fn test_deliver_gateway_has_no_stamp() {
        let o = order(
            OrderStatus::Shipping,
            PaymentStatus::Paid,
            PaymentMethod::Gateway,
        );
        let plan = plan_transition(&o, OrderStatus::Delivered, None, &staff()).unwrap();
        assert!(plan.effects.is_empty());
    }

    #[test]
    fn test_graph_rejects_skipping_states() {
        let o = order(OrderStatus::Pending, PaymentStatus::Pending, PaymentMethod::Cod);
        let err = plan_transition(&o, OrderStatus::Shipping, None, &staff()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTransition);
        let details = err.details.unwrap();
        assert_eq!(details["from"], json!("PENDING"));
        assert_eq!(details["to"], json!("SHIPPING"));
    }

    #[test]
    fn test_terminal_order_rejects_everything() {
        let o = order(
            OrderStatus::Completed,
            PaymentStatus::Paid,
            PaymentMethod::Gateway,
        );
        let err = plan_transition(&o, OrderStatus::Cancelled, Some("why not"), &manager()).unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderAlreadyTerminal);
    }

    #[test]
    fn test_cancel_requires_reason() {
        let o = order(OrderStatus::Pending, PaymentStatus::Pending, PaymentMethod::Cod);
        let err = plan_transition(&o, OrderStatus::Cancelled, None, &staff()).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingCancellationReason);

        let err = plan_transition(&o, OrderStatus::Cancelled, Some("   "), &staff()).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingCancellationReason);
    }

    #[test]
    fn test_cancel_pending_open_to_plain_staff() {
        let o = order(OrderStatus::Pending, PaymentStatus::Pending, PaymentMethod::Cod);
        let plan =
            plan_transition(&o, OrderStatus::Cancelled, Some("out of stock"), &staff()).unwrap();
        assert_eq!(
            plan.effects,
            vec![SideEffect::SetCancellation {
                reason: "out of stock".into(),
                stock_returned: true,
            }]
        );
        assert_eq!(plan.notify, NotifyKind::Cancelled);
    }

    #[test]
    fn test_cancel_confirmed_needs_manager_and_restocks() {
        let o = order(OrderStatus::Confirmed, PaymentStatus::Pending, PaymentMethod::Cod);
        let err =
            plan_transition(&o, OrderStatus::Cancelled, Some("customer asked"), &staff()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ManagerRequired);

        let plan =
            plan_transition(&o, OrderStatus::Cancelled, Some("customer asked"), &manager()).unwrap();
        assert_eq!(
            plan.effects,
            vec![
                SideEffect::RestockAll(o.lines.clone()),
                SideEffect::SetCancellation {
                    reason: "customer asked".into(),
                    stock_returned: true,
                },
            ]
        );
    }

    #[test]
    fn test_cancel_shipping_paid_flags_refund_and_pending_return() {
        let o = order(
            OrderStatus::Shipping,
            PaymentStatus::Paid,
            PaymentMethod::Gateway,
        );
        let plan =
            plan_transition(&o, OrderStatus::Cancelled, Some("lost parcel"), &manager()).unwrap();
        assert_eq!(
            plan.effects,
            vec![
                SideEffect::SetPaymentStatus(PaymentStatus::PendingRefund),
                SideEffect::SetCancellation {
                    reason: "lost parcel".into(),
                    stock_returned: false,
                },
            ]
        );
    }

    #[test]
    fn test_staff_dispute_needs_reason() {
        let o = order(
            OrderStatus::Delivered,
            PaymentStatus::Paid,
            PaymentMethod::Gateway,
        );
        let err = plan_transition(&o, OrderStatus::Dispute, None, &staff()).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingDisputeReason);

        let plan = plan_transition(&o, OrderStatus::Dispute, Some("wrong size"), &staff()).unwrap();
        assert_eq!(
            plan.effects,
            vec![SideEffect::SetDisputeReason("wrong size".into())]
        );
    }

    #[test]
    fn test_customer_blocked_from_staff_path() {
        let o = order(OrderStatus::Pending, PaymentStatus::Pending, PaymentMethod::Cod);
        let err = plan_transition(&o, OrderStatus::Confirmed, None, &customer(77)).unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
    }

    #[test]
    fn test_customer_cancel_pending() {
        let o = order(OrderStatus::Pending, PaymentStatus::Pending, PaymentMethod::Cod);
        let plan = plan_customer_cancel(&o, Some("ordered twice"), &customer(77)).unwrap();
        assert_eq!(plan.to, OrderStatus::Cancelled);
        assert_eq!(
            plan.effects,
            vec![SideEffect::SetCancellation {
                reason: "ordered twice".into(),
                stock_returned: true,
            }]
        );
    }

    #[test]
    fn test_customer_cancel_needs_reason() {
        let o = order(OrderStatus::Pending, PaymentStatus::Pending, PaymentMethod::Cod);
        let err = plan_customer_cancel(&o, None, &customer(77)).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingCancellationReason);

        let err = plan_customer_cancel(&o, Some("   "), &customer(77)).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingCancellationReason);
    }

    #[test]
    fn test_customer_cancel_confirmed_restocks() {
        let o = order(OrderStatus::Confirmed, PaymentStatus::Pending, PaymentMethod::Cod);
        let plan = plan_customer_cancel(&o, Some("changed my mind"), &customer(77)).unwrap();
        assert_eq!(
            plan.effects,
            vec![
                SideEffect::RestockAll(o.lines.clone()),
                SideEffect::SetCancellation {
                    reason: "changed my mind".into(),
                    stock_returned: true,
                },
            ]
        );
    }

    #[test]
    fn test_customer_cancel_shipping_refused() {
        let o = order(
            OrderStatus::Shipping,
            PaymentStatus::Paid,
            PaymentMethod::Gateway,
        );
        let err = plan_customer_cancel(&o, Some("too slow"), &customer(77)).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTransition);
        assert!(err.message.contains("contact support"));
    }

    #[test]
    fn test_customer_cancel_wrong_owner() {
        let o = order(OrderStatus::Pending, PaymentStatus::Pending, PaymentMethod::Cod);
        let err = plan_customer_cancel(&o, None, &customer(78)).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotOrderOwner);
    }

    #[test]
    fn test_confirm_delivery_from_delivered_and_dispute() {
        let delivered = order(
            OrderStatus::Delivered,
            PaymentStatus::Paid,
            PaymentMethod::Gateway,
        );
        let plan = plan_confirm_delivery(&delivered, &customer(77)).unwrap();
        assert_eq!(plan.to, OrderStatus::Completed);

        let disputed = order(
            OrderStatus::Dispute,
            PaymentStatus::Paid,
            PaymentMethod::Gateway,
        );
        let plan = plan_confirm_delivery(&disputed, &customer(77)).unwrap();
        assert_eq!(plan.to, OrderStatus::Completed);

        let shipping = order(
            OrderStatus::Shipping,
            PaymentStatus::Paid,
            PaymentMethod::Gateway,
        );
        let err = plan_confirm_delivery(&shipping, &customer(77)).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTransition);
    }

    #[test]
    fn test_report_issue_requires_delivered_and_reason() {
        let o = order(
            OrderStatus::Delivered,
            PaymentStatus::Paid,
            PaymentMethod::Gateway,
        );
        let err = plan_report_issue(&o, Some(""), &customer(77)).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingDisputeReason);

        let plan = plan_report_issue(&o, Some("arrived broken"), &customer(77)).unwrap();
        assert_eq!(plan.to, OrderStatus::Dispute);
        assert_eq!(
            plan.effects,
            vec![SideEffect::SetDisputeReason("arrived broken".into())]
        );

        let shipping = order(
            OrderStatus::Shipping,
            PaymentStatus::Paid,
            PaymentMethod::Gateway,
        );
        let err = plan_report_issue(&shipping, Some("broken"), &customer(77)).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTransition);
    }

    #[test]
    fn test_stock_return_rules() {
        let mut o = order(
            OrderStatus::Cancelled,
            PaymentStatus::PendingRefund,
            PaymentMethod::Gateway,
        );

        let err = plan_stock_return(&o, &staff()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ManagerRequired);

        let lines = plan_stock_return(&o, &manager()).unwrap();
        assert_eq!(lines, o.lines);

        o.stock_returned = true;
        let err = plan_stock_return(&o, &manager()).unwrap_err();
        assert_eq!(err.code, ErrorCode::StockAlreadyReturned);

        let open = order(
            OrderStatus::Shipping,
            PaymentStatus::Paid,
            PaymentMethod::Gateway,
        );
        let err = plan_stock_return(&open, &manager()).unwrap_err();
        assert_eq!(err.code, ErrorCode::StockReturnNotPending);
    }
}
