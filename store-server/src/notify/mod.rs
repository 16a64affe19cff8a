//! Outbound order notifications
//!
//! Events are POSTed as JSON to the configured webhook (a storefront
//! service fans them out to email and chat). Notification failures never
//! fail the request that triggered them; call sites ignore the result.

use rust_decimal::Decimal;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub async fn order_placed(
    http: &reqwest::Client,
    webhook_url: Option<&str>,
    order_number: &str,
    total: Decimal,
    customer_email: &str,
    payment_method: &str,
) -> Result<(), BoxError> {
    let Some(url) = webhook_url else {
        tracing::debug!(order_number, "Notification webhook not configured; skipping");
        return Ok(());
    };
    http.post(url)
        .json(&serde_json::json!({
            "event": "order_placed",
            "order_number": order_number,
            "total": total.to_string(),
            "customer_email": customer_email,
            "payment_method": payment_method,
        }))
        .send()
        .await?
        .error_for_status()?;
    tracing::info!(order_number, "Order placed notification sent");
    Ok(())
}

pub async fn order_status_changed(
    http: &reqwest::Client,
    webhook_url: Option<&str>,
    order_number: &str,
    from: &str,
    to: &str,
) -> Result<(), BoxError> {
    let Some(url) = webhook_url else {
        tracing::debug!(order_number, "Notification webhook not configured; skipping");
        return Ok(());
    };
    http.post(url)
        .json(&serde_json::json!({
            "event": "order_status_changed",
            "order_number": order_number,
            "from": from,
            "to": to,
        }))
        .send()
        .await?
        .error_for_status()?;
    tracing::info!(order_number, from, to, "Status change notification sent");
    Ok(())
}

pub async fn order_cancelled(
    http: &reqwest::Client,
    webhook_url: Option<&str>,
    order_number: &str,
    reason: &str,
) -> Result<(), BoxError> {
    let Some(url) = webhook_url else {
        tracing::debug!(order_number, "Notification webhook not configured; skipping");
        return Ok(());
    };
    http.post(url)
        .json(&serde_json::json!({
            "event": "order_cancelled",
            "order_number": order_number,
            "reason": reason,
        }))
        .send()
        .await?
        .error_for_status()?;
    tracing::info!(order_number, "Cancellation notification sent");
    Ok(())
}

pub async fn payment_succeeded(
    http: &reqwest::Client,
    webhook_url: Option<&str>,
    order_number: &str,
    amount: Decimal,
) -> Result<(), BoxError> {
    let Some(url) = webhook_url else {
        tracing::debug!(order_number, "Notification webhook not configured; skipping");
        return Ok(());
    };
    http.post(url)
        .json(&serde_json::json!({
            "event": "payment_succeeded",
            "order_number": order_number,
            "amount": amount.to_string(),
        }))
        .send()
        .await?
        .error_for_status()?;
    tracing::info!(order_number, "Payment notification sent");
    Ok(())
}

pub async fn refund_processed(
    http: &reqwest::Client,
    webhook_url: Option<&str>,
    order_number: &str,
    amount: Decimal,
) -> Result<(), BoxError> {
    let Some(url) = webhook_url else {
        tracing::debug!(order_number, "Notification webhook not configured; skipping");
        return Ok(());
    };
    http.post(url)
        .json(&serde_json::json!({
            "event": "refund_processed",
            "order_number": order_number,
            "amount": amount.to_string(),
        }))
        .send()
        .await?
        .error_for_status()?;
    tracing::info!(order_number, "Refund notification sent");
    Ok(())
}
