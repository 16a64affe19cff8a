//! Checkout: turn a cart into a PENDING order
//!
//! Pricing is snapshotted at checkout time; later catalog edits never touch
//! an existing order. Stock is NOT reserved here. The deduction happens when
//! the order is confirmed (COD) or when the gateway payment settles, so an
//! abandoned checkout cannot hold inventory hostage.

use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::order::{PaymentMethod, PaymentStatus};
use shared::util::{now_millis, order_number, snowflake_id};

use crate::auth::customer::CustomerIdentity;
use crate::db;
use crate::db::audit::NewAuditEntry;
use crate::db::carts::CartLine;
use crate::db::coupons::CouponRow;
use crate::db::orders::{NewOrder, NewOrderItem};
use crate::db::payments::NewPayment;
use crate::error::ServiceError;
use crate::notify;
use crate::orders::coupon::{compute_discount, validate_coupon};
use crate::orders::execute::load_order;
use crate::state::AppState;
use crate::vnpay;

pub struct CheckoutInput<'a> {
    pub payment_method: PaymentMethod,
    pub recipient_name: &'a str,
    pub recipient_phone: &'a str,
    pub shipping_address: &'a str,
    pub note: Option<&'a str>,
    pub coupon_code: Option<&'a str>,
    pub client_ip: &'a str,
}

pub struct CheckoutOutcome {
    pub order_id: i64,
    pub order_number: String,
    pub total: Decimal,
    /// Hosted payment page link; None for COD
    pub payment_url: Option<String>,
}

struct Pricing {
    subtotal: Decimal,
    discount: Decimal,
    shipping_fee: Decimal,
    total: Decimal,
}

pub async fn place_order(
    state: &AppState,
    customer: &CustomerIdentity,
    input: &CheckoutInput<'_>,
) -> Result<CheckoutOutcome, ServiceError> {
    let lines = db::carts::lines_for_customer(&state.pool, customer.customer_id).await?;
    if lines.is_empty() {
        return Err(AppError::new(ErrorCode::CartEmpty).into());
    }

    let now = now_millis();
    let subtotal: Decimal = lines
        .iter()
        .map(|l| l.price * Decimal::from(l.quantity))
        .sum();

    // A blank code means no coupon, not a lookup failure
    let coupon = match input.coupon_code.map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => {
            let c = db::coupons::find_by_code(&state.pool, code)
                .await?
                .ok_or_else(|| AppError::new(ErrorCode::CouponNotFound))?;
            validate_coupon(&c, subtotal, now)?;
            Some(c)
        }
        None => None,
    };
    let discount = coupon
        .as_ref()
        .map(|c| compute_discount(c, subtotal))
        .unwrap_or(Decimal::ZERO);

    let goods_total = subtotal - discount;
    let shipping_fee = match state.config.free_shipping_threshold {
        Some(threshold) if goods_total >= threshold => Decimal::ZERO,
        _ => state.config.shipping_fee,
    };
    let pricing = Pricing {
        subtotal,
        discount,
        shipping_fee,
        total: goods_total + shipping_fee,
    };

    // Order numbers are short and random; on the rare collision retry the
    // whole transaction with a fresh one
    let mut created = None;
    for _ in 0..3 {
        match create_order_tx(state, customer, input, &lines, coupon.as_ref(), &pricing, now).await
        {
            Err(err) if is_unique_violation(&err) => continue,
            Err(err) => return Err(err),
            Ok(ok) => {
                created = Some(ok);
                break;
            }
        }
    }
    let Some((order_id, number, txn_ref)) = created else {
        tracing::error!(customer_id = customer.customer_id, "Order number collisions exhausted retries");
        return Err(AppError::new(ErrorCode::InternalError).into());
    };

    let payment_url = match txn_ref.as_deref() {
        Some(txn_ref) => Some(payment_link(state, &number, txn_ref, pricing.total, input.client_ip, now)?),
        None => None,
    };

    let _ = notify::order_placed(
        &state.http,
        state.config.notify_webhook_url.as_deref(),
        &number,
        pricing.total,
        &customer.email,
        input.payment_method.as_str(),
    )
    .await;

    Ok(CheckoutOutcome {
        order_id,
        order_number: number,
        total: pricing.total,
        payment_url,
    })
}

async fn create_order_tx(
    state: &AppState,
    customer: &CustomerIdentity,
    input: &CheckoutInput<'_>,
    lines: &[CartLine],
    coupon: Option<&CouponRow>,
    pricing: &Pricing,
    now: i64,
) -> Result<(i64, String, Option<String>), ServiceError> {
    let order_id = snowflake_id();
    let number = order_number();
    let txn_ref = matches!(input.payment_method, PaymentMethod::Gateway)
        .then(|| format!("{order_id}_{}", snowflake_id()));

    let mut tx = state.pool.begin().await?;

    db::orders::insert(
        &mut tx,
        &NewOrder {
            id: order_id,
            order_number: &number,
            customer_id: customer.customer_id,
            customer_email: &customer.email,
            payment_method: input.payment_method.as_str(),
            subtotal: pricing.subtotal,
            discount: pricing.discount,
            shipping_fee: pricing.shipping_fee,
            total: pricing.total,
            coupon_code: coupon.map(|c| c.code.as_str()),
            recipient_name: input.recipient_name,
            recipient_phone: input.recipient_phone,
            shipping_address: input.shipping_address,
            note: input.note,
            now,
        },
    )
    .await?;

    for line in lines {
        db::orders::insert_item(
            &mut tx,
            &NewOrderItem {
                order_id,
                variant_id: line.variant_id,
                product_name: &line.product_name,
                variant_name: &line.variant_name,
                sku: &line.sku,
                unit_price: line.price,
                quantity: line.quantity,
            },
        )
        .await?;
    }

    db::payments::insert(
        &mut tx,
        &NewPayment {
            id: snowflake_id(),
            order_id,
            method: input.payment_method.as_str(),
            amount: pricing.total,
            txn_ref: txn_ref.as_deref(),
            now,
        },
    )
    .await?;

    if let Some(c) = coupon {
        let taken = db::coupons::consume(&mut tx, c.id).await?;
        if taken == 0 {
            return Err(AppError::new(ErrorCode::CouponExhausted).into());
        }
    }

    db::carts::clear_for_customer(&mut tx, customer.customer_id).await?;

    let detail = serde_json::json!({
        "total": pricing.total.to_string(),
        "items": lines.len(),
        "payment_method": input.payment_method.as_str(),
    });
    db::audit::record(
        &mut tx,
        &NewAuditEntry {
            order_id,
            action: "order_placed",
            actor_type: "CUSTOMER",
            actor_id: Some(customer.customer_id),
            actor_name: &customer.name,
            from_status: None,
            to_status: Some("PENDING"),
            detail: Some(&detail),
            now,
        },
    )
    .await?;

    tx.commit().await?;
    Ok((order_id, number, txn_ref))
}

/// A fresh payment link for an order whose gateway payment has not settled.
/// Any open attempt is closed first; the partial unique index on payments
/// guarantees one open attempt per order even under concurrent requests.
pub async fn retry_payment(
    state: &AppState,
    customer: &CustomerIdentity,
    order_id: i64,
    client_ip: &str,
) -> Result<CheckoutOutcome, ServiceError> {
    let (row, view) = load_order(state, order_id).await?;
    if view.customer_id != customer.customer_id {
        return Err(AppError::new(ErrorCode::NotOrderOwner).into());
    }
    if !matches!(view.payment_method, PaymentMethod::Gateway) {
        return Err(AppError::invalid_request("Cash on delivery orders have no payment link").into());
    }
    match view.payment_status {
        PaymentStatus::Pending | PaymentStatus::Failed => {}
        _ => {
            return Err(AppError::invalid_request("Order is already paid").into());
        }
    }
    if view.status.is_terminal() {
        return Err(AppError::invalid_request("This order can no longer be paid").into());
    }

    let attempt = db::payments::list_for_order(&state.pool, order_id).await?.len() + 1;
    let txn_ref = format!("{order_id}_{}", snowflake_id());
    let now = now_millis();

    let mut tx = state.pool.begin().await?;
    db::payments::mark_failed_pending_for_order(&mut tx, order_id, now).await?;
    if view.payment_status == PaymentStatus::Failed {
        db::orders::set_payment_status(&mut tx, order_id, PaymentStatus::Pending.as_str(), now)
            .await?;
    }
    if let Err(err) = db::payments::insert(
        &mut tx,
        &NewPayment {
            id: snowflake_id(),
            order_id,
            method: view.payment_method.as_str(),
            amount: view.total,
            txn_ref: Some(&txn_ref),
            now,
        },
    )
    .await
    {
        if sqlx_unique_violation(&err) {
            return Err(AppError::new(ErrorCode::PaymentPendingExists).into());
        }
        return Err(err.into());
    }
    let detail = serde_json::json!({ "attempt": attempt });
    db::audit::record(
        &mut tx,
        &NewAuditEntry {
            order_id,
            action: "payment_retried",
            actor_type: "CUSTOMER",
            actor_id: Some(customer.customer_id),
            actor_name: &customer.name,
            from_status: None,
            to_status: None,
            detail: Some(&detail),
            now,
        },
    )
    .await?;
    tx.commit().await?;

    let url = payment_link(state, &row.order_number, &txn_ref, view.total, client_ip, now)?;
    Ok(CheckoutOutcome {
        order_id,
        order_number: row.order_number,
        total: view.total,
        payment_url: Some(url),
    })
}

fn payment_link(
    state: &AppState,
    order_number: &str,
    txn_ref: &str,
    total: Decimal,
    client_ip: &str,
    now: i64,
) -> Result<String, ServiceError> {
    let amount = vnpay::amount_x100(total)
        .ok_or_else(|| AppError::internal("Order total exceeds the gateway amount range"))?;
    let order_info = format!("Payment for {order_number}");
    Ok(vnpay::build_payment_url(&vnpay::PaymentUrlParams {
        tmn_code: &state.config.vnpay_tmn_code,
        secret: &state.config.vnpay_hash_secret,
        pay_url: &state.config.vnpay_pay_url,
        return_url: &state.config.vnpay_return_url,
        txn_ref,
        amount_x100: amount,
        order_info: &order_info,
        client_ip,
        now_millis: now,
    }))
}

fn sqlx_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|d| d.kind() == sqlx::error::ErrorKind::UniqueViolation)
}

fn is_unique_violation(err: &ServiceError) -> bool {
    let ServiceError::Db(inner) = err else {
        return false;
    };
    inner
        .downcast_ref::<sqlx::Error>()
        .is_some_and(sqlx_unique_violation)
}
