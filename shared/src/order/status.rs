//! Order and payment status enums with the transition rules between them
//!
//! Statuses are stored in the database as their SCREAMING_SNAKE_CASE string
//! form and parsed back into these enums at the domain boundary. `as_str`
//! and the serde representation must stay identical for that reason.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error when parsing a status string from the database or a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError(pub String);

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid status value: {}", self.0)
    }
}

impl std::error::Error for ParseStatusError {}

/// Order fulfillment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Placed, awaiting confirmation
    Pending,
    /// Accepted by staff, stock reserved once payment is covered
    Confirmed,
    /// Handed to the carrier
    Shipping,
    /// Carrier reports delivery
    Delivered,
    /// Customer reported a problem after delivery
    Dispute,
    /// Finished successfully (terminal)
    Completed,
    /// Cancelled (terminal)
    Cancelled,
}

impl OrderStatus {
    /// String form, identical to the serde representation and the
    /// value stored in the `orders.status` column
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Shipping => "SHIPPING",
            Self::Delivered => "DELIVERED",
            Self::Dispute => "DISPUTE",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Terminal statuses admit no further transition
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// The statuses this one may move to
    pub const fn allowed_next(&self) -> &'static [OrderStatus] {
        match self {
            Self::Pending => &[Self::Confirmed, Self::Cancelled],
            Self::Confirmed => &[Self::Shipping, Self::Pending, Self::Cancelled],
            Self::Shipping => &[Self::Delivered, Self::Cancelled],
            Self::Delivered => &[Self::Completed, Self::Dispute, Self::Cancelled],
            Self::Dispute => &[Self::Completed, Self::Cancelled],
            Self::Completed | Self::Cancelled => &[],
        }
    }

    /// Check whether a direct transition to `to` is allowed by the graph.
    /// Role and payload requirements are enforced separately.
    pub fn can_transition(&self, to: OrderStatus) -> bool {
        self.allowed_next().contains(&to)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "CONFIRMED" => Ok(Self::Confirmed),
            "SHIPPING" => Ok(Self::Shipping),
            "DELIVERED" => Ok(Self::Delivered),
            "DISPUTE" => Ok(Self::Dispute),
            "COMPLETED" => Ok(Self::Completed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// Payment status of an order (and of individual payment attempts)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Awaiting payment (gateway attempt open, or COD before delivery)
    Pending,
    /// Money captured
    Paid,
    /// Gateway reported failure for the last attempt
    Failed,
    /// Paid order was cancelled, refund owed
    PendingRefund,
    /// Refund executed
    Refunded,
}

impl PaymentStatus {
    /// String form, identical to the serde representation and the
    /// value stored in the database
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Failed => "FAILED",
            Self::PendingRefund => "PENDING_REFUND",
            Self::Refunded => "REFUNDED",
        }
    }

    /// The payment statuses this one may move to
    pub const fn allowed_next(&self) -> &'static [PaymentStatus] {
        match self {
            // FAILED -> PENDING covers the customer opening a fresh attempt
            Self::Pending => &[Self::Paid, Self::Failed],
            Self::Paid => &[Self::PendingRefund],
            Self::Failed => &[Self::Pending],
            Self::PendingRefund => &[Self::Refunded],
            Self::Refunded => &[],
        }
    }

    /// Check whether a direct transition to `to` is allowed
    pub fn can_transition(&self, to: PaymentStatus) -> bool {
        self.allowed_next().contains(&to)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PAID" => Ok(Self::Paid),
            "FAILED" => Ok(Self::Failed),
            "PENDING_REFUND" => Ok(Self::PendingRefund),
            "REFUNDED" => Ok(Self::Refunded),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// How the customer chose to pay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Cash on delivery
    Cod,
    /// Online payment through the gateway
    Gateway,
}

impl PaymentMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cod => "COD",
            Self::Gateway => "GATEWAY",
        }
    }

    pub const fn is_cod(&self) -> bool {
        matches!(self, Self::Cod)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COD" => Ok(Self::Cod),
            "GATEWAY" => Ok(Self::Gateway),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_transitions_from_pending() {
        assert!(OrderStatus::Pending.can_transition(OrderStatus::Confirmed));
        assert!(OrderStatus::Pending.can_transition(OrderStatus::Cancelled));
        assert!(!OrderStatus::Pending.can_transition(OrderStatus::Shipping));
        assert!(!OrderStatus::Pending.can_transition(OrderStatus::Delivered));
        assert!(!OrderStatus::Pending.can_transition(OrderStatus::Completed));
        assert!(!OrderStatus::Pending.can_transition(OrderStatus::Dispute));
        assert!(!OrderStatus::Pending.can_transition(OrderStatus::Pending));
    }

    #[test]
    fn test_order_status_transitions_from_confirmed() {
        assert!(OrderStatus::Confirmed.can_transition(OrderStatus::Shipping));
        assert!(OrderStatus::Confirmed.can_transition(OrderStatus::Pending));
        assert!(OrderStatus::Confirmed.can_transition(OrderStatus::Cancelled));
        assert!(!OrderStatus::Confirmed.can_transition(OrderStatus::Delivered));
        assert!(!OrderStatus::Confirmed.can_transition(OrderStatus::Completed));
        assert!(!OrderStatus::Confirmed.can_transition(OrderStatus::Dispute));
    }

    #[test]
    fn test_order_status_transitions_from_shipping() {
        assert!(OrderStatus::Shipping.can_transition(OrderStatus::Delivered));
        assert!(OrderStatus::Shipping.can_transition(OrderStatus::Cancelled));
        assert!(!OrderStatus::Shipping.can_transition(OrderStatus::Pending));
        assert!(!OrderStatus::Shipping.can_transition(OrderStatus::Confirmed));
        assert!(!OrderStatus::Shipping.can_transition(OrderStatus::Completed));
        assert!(!OrderStatus::Shipping.can_transition(OrderStatus::Dispute));
    }

    #[test]
    fn test_order_status_transitions_from_delivered() {
        assert!(OrderStatus::Delivered.can_transition(OrderStatus::Completed));
        assert!(OrderStatus::Delivered.can_transition(OrderStatus::Dispute));
        assert!(OrderStatus::Delivered.can_transition(OrderStatus::Cancelled));
        assert!(!OrderStatus::Delivered.can_transition(OrderStatus::Shipping));
        assert!(!OrderStatus::Delivered.can_transition(OrderStatus::Pending));
    }

    #[test]
    fn test_order_status_transitions_from_dispute() {
        assert!(OrderStatus::Dispute.can_transition(OrderStatus::Completed));
        assert!(OrderStatus::Dispute.can_transition(OrderStatus::Cancelled));
        assert!(!OrderStatus::Dispute.can_transition(OrderStatus::Delivered));
        assert!(!OrderStatus::Dispute.can_transition(OrderStatus::Shipping));
        assert!(!OrderStatus::Dispute.can_transition(OrderStatus::Pending));
    }

    #[test]
    fn test_terminal_statuses_admit_nothing() {
        for to in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Shipping,
            OrderStatus::Delivered,
            OrderStatus::Dispute,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            assert!(!OrderStatus::Completed.can_transition(to));
            assert!(!OrderStatus::Cancelled.can_transition(to));
        }
    }

    #[test]
    fn test_is_terminal() {
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Confirmed.is_terminal());
        assert!(!OrderStatus::Shipping.is_terminal());
        assert!(!OrderStatus::Delivered.is_terminal());
        assert!(!OrderStatus::Dispute.is_terminal());
    }

    #[test]
    fn test_every_status_can_reach_cancelled_except_terminals() {
        for from in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Shipping,
            OrderStatus::Delivered,
            OrderStatus::Dispute,
        ] {
            assert!(
                from.can_transition(OrderStatus::Cancelled),
                "{} should allow cancellation",
                from
            );
        }
    }

    #[test]
    fn test_order_status_str_roundtrip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Shipping,
            OrderStatus::Delivered,
            OrderStatus::Dispute,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            let parsed: OrderStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_order_status_parse_invalid() {
        assert!("SHIPPED".parse::<OrderStatus>().is_err());
        assert!("pending".parse::<OrderStatus>().is_err());
        assert!("".parse::<OrderStatus>().is_err());

        let err = "VOID".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err, ParseStatusError("VOID".to_string()));
    }

    #[test]
    fn test_payment_status_transitions() {
        assert!(PaymentStatus::Pending.can_transition(PaymentStatus::Paid));
        assert!(PaymentStatus::Pending.can_transition(PaymentStatus::Failed));
        assert!(!PaymentStatus::Pending.can_transition(PaymentStatus::Refunded));

        assert!(PaymentStatus::Paid.can_transition(PaymentStatus::PendingRefund));
        assert!(!PaymentStatus::Paid.can_transition(PaymentStatus::Pending));
        assert!(!PaymentStatus::Paid.can_transition(PaymentStatus::Refunded));

        assert!(PaymentStatus::Failed.can_transition(PaymentStatus::Pending));
        assert!(!PaymentStatus::Failed.can_transition(PaymentStatus::Paid));

        assert!(PaymentStatus::PendingRefund.can_transition(PaymentStatus::Refunded));
        assert!(!PaymentStatus::PendingRefund.can_transition(PaymentStatus::Paid));

        assert!(!PaymentStatus::Refunded.can_transition(PaymentStatus::Pending));
        assert!(!PaymentStatus::Refunded.can_transition(PaymentStatus::Paid));
    }

    #[test]
    fn test_payment_status_str_roundtrip() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Paid,
            PaymentStatus::Failed,
            PaymentStatus::PendingRefund,
            PaymentStatus::Refunded,
        ] {
            let parsed: PaymentStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_payment_method() {
        assert_eq!(PaymentMethod::Cod.as_str(), "COD");
        assert_eq!(PaymentMethod::Gateway.as_str(), "GATEWAY");
        assert!(PaymentMethod::Cod.is_cod());
        assert!(!PaymentMethod::Gateway.is_cod());

        assert_eq!("COD".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cod);
        assert_eq!(
            "GATEWAY".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::Gateway
        );
        assert!("CASH".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_serde_representation() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Pending).unwrap(),
            "\"PENDING\""
        );
        assert_eq!(
            serde_json::to_string(&OrderStatus::Cancelled).unwrap(),
            "\"CANCELLED\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentStatus::PendingRefund).unwrap(),
            "\"PENDING_REFUND\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentMethod::Cod).unwrap(),
            "\"COD\""
        );

        let status: OrderStatus = serde_json::from_str("\"DISPUTE\"").unwrap();
        assert_eq!(status, OrderStatus::Dispute);

        let status: PaymentStatus = serde_json::from_str("\"PAID\"").unwrap();
        assert_eq!(status, PaymentStatus::Paid);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", OrderStatus::Shipping), "SHIPPING");
        assert_eq!(format!("{}", PaymentStatus::PendingRefund), "PENDING_REFUND");
        assert_eq!(format!("{}", PaymentMethod::Gateway), "GATEWAY");
    }
}
