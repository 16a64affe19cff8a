//! Unified error codes for the store backend
//!
//! This module defines all error codes used across the server and frontend.
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Order errors
//! - 5xxx: Payment / gateway errors
//! - 6xxx: Catalog / coupon errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Invalid credentials
    InvalidCredentials = 1002,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,
    /// Token carries a role this server does not know
    UnknownRole = 1005,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Manager role required
    ManagerRequired = 2002,
    /// Order belongs to a different customer
    NotOrderOwner = 2003,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Requested status transition is not allowed
    InvalidTransition = 4002,
    /// Order is in a terminal status
    OrderAlreadyTerminal = 4003,
    /// Cancellation requires a reason
    MissingCancellationReason = 4004,
    /// Reporting an issue requires a reason
    MissingDisputeReason = 4005,
    /// Cart is empty
    CartEmpty = 4006,
    /// Stock for this order has already been returned
    StockAlreadyReturned = 4007,
    /// Order is not awaiting a stock return
    StockReturnNotPending = 4008,

    // ==================== 5xxx: Payment / Gateway ====================
    /// Payment record not found
    PaymentNotFound = 5001,
    /// Payment processing failed
    PaymentFailed = 5002,
    /// Callback amount does not match the order total
    AmountMismatch = 5003,
    /// Gateway signature verification failed
    ChecksumInvalid = 5004,
    /// Gateway rejected the request
    GatewayRejected = 5005,
    /// Payment is missing the gateway data required for a refund
    RefundMissingGatewayData = 5006,
    /// Payment is not in a refundable state
    PaymentNotRefundable = 5007,
    /// Payment has already been refunded
    PaymentAlreadyRefunded = 5008,
    /// Order already has a pending payment attempt
    PaymentPendingExists = 5009,

    // ==================== 6xxx: Catalog / Coupon ====================
    /// Variant not found
    VariantNotFound = 6001,
    /// Not enough stock to cover the requested quantity
    InsufficientStock = 6002,
    /// Coupon not found
    CouponNotFound = 6101,
    /// Coupon is inactive
    CouponInactive = 6102,
    /// Coupon validity window has not started
    CouponNotStarted = 6103,
    /// Coupon has expired
    CouponExpired = 6104,
    /// Coupon usage limit reached
    CouponExhausted = 6105,
    /// Order subtotal is below the coupon minimum
    CouponMinOrderNotMet = 6106,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Network error
    NetworkError = 9003,
    /// Operation timeout
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::ValueOutOfRange => "Value is out of range",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::InvalidCredentials => "Invalid credentials",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",
            ErrorCode::UnknownRole => "Token carries an unknown role",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::ManagerRequired => "Manager role is required",
            ErrorCode::NotOrderOwner => "Order belongs to a different customer",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::InvalidTransition => "Order status transition is not allowed",
            ErrorCode::OrderAlreadyTerminal => "Order is in a terminal status",
            ErrorCode::MissingCancellationReason => "Cancellation requires a reason",
            ErrorCode::MissingDisputeReason => "Reporting an issue requires a reason",
            ErrorCode::CartEmpty => "Cart is empty",
            ErrorCode::StockAlreadyReturned => "Stock has already been returned",
            ErrorCode::StockReturnNotPending => "Order is not awaiting a stock return",

            // Payment / Gateway
            ErrorCode::PaymentNotFound => "Payment record not found",
            ErrorCode::PaymentFailed => "Payment processing failed",
            ErrorCode::AmountMismatch => "Paid amount does not match the order total",
            ErrorCode::ChecksumInvalid => "Gateway signature verification failed",
            ErrorCode::GatewayRejected => "Gateway rejected the request",
            ErrorCode::RefundMissingGatewayData => {
                "Payment is missing the gateway data required for a refund"
            }
            ErrorCode::PaymentNotRefundable => "Payment is not in a refundable state",
            ErrorCode::PaymentAlreadyRefunded => "Payment has already been refunded",
            ErrorCode::PaymentPendingExists => "Order already has a pending payment attempt",

            // Catalog / Coupon
            ErrorCode::VariantNotFound => "Variant not found",
            ErrorCode::InsufficientStock => "Not enough stock",
            ErrorCode::CouponNotFound => "Coupon not found",
            ErrorCode::CouponInactive => "Coupon is inactive",
            ErrorCode::CouponNotStarted => "Coupon is not valid yet",
            ErrorCode::CouponExpired => "Coupon has expired",
            ErrorCode::CouponExhausted => "Coupon usage limit reached",
            ErrorCode::CouponMinOrderNotMet => "Order subtotal is below the coupon minimum",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::NetworkError => "Network error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1002 => Ok(ErrorCode::InvalidCredentials),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),
            1005 => Ok(ErrorCode::UnknownRole),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2002 => Ok(ErrorCode::ManagerRequired),
            2003 => Ok(ErrorCode::NotOrderOwner),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::InvalidTransition),
            4003 => Ok(ErrorCode::OrderAlreadyTerminal),
            4004 => Ok(ErrorCode::MissingCancellationReason),
            4005 => Ok(ErrorCode::MissingDisputeReason),
            4006 => Ok(ErrorCode::CartEmpty),
            4007 => Ok(ErrorCode::StockAlreadyReturned),
            4008 => Ok(ErrorCode::StockReturnNotPending),

            // Payment / Gateway
            5001 => Ok(ErrorCode::PaymentNotFound),
            5002 => Ok(ErrorCode::PaymentFailed),
            5003 => Ok(ErrorCode::AmountMismatch),
            5004 => Ok(ErrorCode::ChecksumInvalid),
            5005 => Ok(ErrorCode::GatewayRejected),
            5006 => Ok(ErrorCode::RefundMissingGatewayData),
            5007 => Ok(ErrorCode::PaymentNotRefundable),
            5008 => Ok(ErrorCode::PaymentAlreadyRefunded),
            5009 => Ok(ErrorCode::PaymentPendingExists),

            // Catalog / Coupon
            6001 => Ok(ErrorCode::VariantNotFound),
            6002 => Ok(ErrorCode::InsufficientStock),
            6101 => Ok(ErrorCode::CouponNotFound),
            6102 => Ok(ErrorCode::CouponInactive),
            6103 => Ok(ErrorCode::CouponNotStarted),
            6104 => Ok(ErrorCode::CouponExpired),
            6105 => Ok(ErrorCode::CouponExhausted),
            6106 => Ok(ErrorCode::CouponMinOrderNotMet),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::NetworkError),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        // General
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::Unknown.code(), 1);
        assert_eq!(ErrorCode::ValidationFailed.code(), 2);
        assert_eq!(ErrorCode::NotFound.code(), 3);
        assert_eq!(ErrorCode::AlreadyExists.code(), 4);
        assert_eq!(ErrorCode::InvalidRequest.code(), 5);
        assert_eq!(ErrorCode::InvalidFormat.code(), 6);
        assert_eq!(ErrorCode::RequiredField.code(), 7);
        assert_eq!(ErrorCode::ValueOutOfRange.code(), 8);

        // Auth
        assert_eq!(ErrorCode::NotAuthenticated.code(), 1001);
        assert_eq!(ErrorCode::InvalidCredentials.code(), 1002);
        assert_eq!(ErrorCode::TokenExpired.code(), 1003);
        assert_eq!(ErrorCode::TokenInvalid.code(), 1004);
        assert_eq!(ErrorCode::UnknownRole.code(), 1005);

        // Permission
        assert_eq!(ErrorCode::PermissionDenied.code(), 2001);
        assert_eq!(ErrorCode::ManagerRequired.code(), 2002);
        assert_eq!(ErrorCode::NotOrderOwner.code(), 2003);

        // Order
        assert_eq!(ErrorCode::OrderNotFound.code(), 4001);
        assert_eq!(ErrorCode::InvalidTransition.code(), 4002);
        assert_eq!(ErrorCode::OrderAlreadyTerminal.code(), 4003);
        assert_eq!(ErrorCode::MissingCancellationReason.code(), 4004);
        assert_eq!(ErrorCode::MissingDisputeReason.code(), 4005);
        assert_eq!(ErrorCode::CartEmpty.code(), 4006);
        assert_eq!(ErrorCode::StockAlreadyReturned.code(), 4007);
        assert_eq!(ErrorCode::StockReturnNotPending.code(), 4008);

        // Payment / Gateway
        assert_eq!(ErrorCode::PaymentNotFound.code(), 5001);
        assert_eq!(ErrorCode::PaymentFailed.code(), 5002);
        assert_eq!(ErrorCode::AmountMismatch.code(), 5003);
        assert_eq!(ErrorCode::ChecksumInvalid.code(), 5004);
        assert_eq!(ErrorCode::GatewayRejected.code(), 5005);
        assert_eq!(ErrorCode::RefundMissingGatewayData.code(), 5006);
        assert_eq!(ErrorCode::PaymentNotRefundable.code(), 5007);
        assert_eq!(ErrorCode::PaymentAlreadyRefunded.code(), 5008);
        assert_eq!(ErrorCode::PaymentPendingExists.code(), 5009);

        // Catalog / Coupon
        assert_eq!(ErrorCode::VariantNotFound.code(), 6001);
        assert_eq!(ErrorCode::InsufficientStock.code(), 6002);
        assert_eq!(ErrorCode::CouponNotFound.code(), 6101);
        assert_eq!(ErrorCode::CouponInactive.code(), 6102);
        assert_eq!(ErrorCode::CouponNotStarted.code(), 6103);
        assert_eq!(ErrorCode::CouponExpired.code(), 6104);
        assert_eq!(ErrorCode::CouponExhausted.code(), 6105);
        assert_eq!(ErrorCode::CouponMinOrderNotMet.code(), 6106);

        // System
        assert_eq!(ErrorCode::InternalError.code(), 9001);
        assert_eq!(ErrorCode::DatabaseError.code(), 9002);
        assert_eq!(ErrorCode::NetworkError.code(), 9003);
        assert_eq!(ErrorCode::TimeoutError.code(), 9004);
        assert_eq!(ErrorCode::ConfigError.code(), 9005);
    }

    #[test]
    fn test_is_success() {
        assert!(ErrorCode::Success.is_success());
        assert!(!ErrorCode::Unknown.is_success());
        assert!(!ErrorCode::OrderNotFound.is_success());
        assert!(!ErrorCode::InternalError.is_success());
    }

    #[test]
    fn test_try_from_valid() {
        assert_eq!(ErrorCode::try_from(0), Ok(ErrorCode::Success));
        assert_eq!(ErrorCode::try_from(1001), Ok(ErrorCode::NotAuthenticated));
        assert_eq!(ErrorCode::try_from(4001), Ok(ErrorCode::OrderNotFound));
        assert_eq!(ErrorCode::try_from(4002), Ok(ErrorCode::InvalidTransition));
        assert_eq!(ErrorCode::try_from(5003), Ok(ErrorCode::AmountMismatch));
        assert_eq!(ErrorCode::try_from(5004), Ok(ErrorCode::ChecksumInvalid));
        assert_eq!(ErrorCode::try_from(6002), Ok(ErrorCode::InsufficientStock));
        assert_eq!(ErrorCode::try_from(9001), Ok(ErrorCode::InternalError));
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(999), Err(InvalidErrorCode(999)));
        assert_eq!(ErrorCode::try_from(10000), Err(InvalidErrorCode(10000)));
        assert_eq!(ErrorCode::try_from(4999), Err(InvalidErrorCode(4999)));
    }

    #[test]
    fn test_from_error_code_to_u16() {
        let code: u16 = ErrorCode::Success.into();
        assert_eq!(code, 0);

        let code: u16 = ErrorCode::NotAuthenticated.into();
        assert_eq!(code, 1001);

        let code: u16 = ErrorCode::InternalError.into();
        assert_eq!(code, 9001);
    }

    #[test]
    fn test_serialize() {
        let code = ErrorCode::NotFound;
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "3");

        let code = ErrorCode::OrderNotFound;
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "4001");

        let code = ErrorCode::Success;
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "0");
    }

    #[test]
    fn test_deserialize() {
        let code: ErrorCode = serde_json::from_str("0").unwrap();
        assert_eq!(code, ErrorCode::Success);

        let code: ErrorCode = serde_json::from_str("4001").unwrap();
        assert_eq!(code, ErrorCode::OrderNotFound);

        let code: ErrorCode = serde_json::from_str("6002").unwrap();
        assert_eq!(code, ErrorCode::InsufficientStock);

        let code: ErrorCode = serde_json::from_str("9001").unwrap();
        assert_eq!(code, ErrorCode::InternalError);
    }

    #[test]
    fn test_deserialize_invalid() {
        let result: Result<ErrorCode, _> = serde_json::from_str("999");
        assert!(result.is_err());

        let result: Result<ErrorCode, _> = serde_json::from_str("10000");
        assert!(result.is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", ErrorCode::Success), "0");
        assert_eq!(format!("{}", ErrorCode::NotFound), "3");
        assert_eq!(format!("{}", ErrorCode::OrderNotFound), "4001");
        assert_eq!(format!("{}", ErrorCode::InternalError), "9001");
    }

    #[test]
    fn test_message() {
        assert_eq!(
            ErrorCode::Success.message(),
            "Operation completed successfully"
        );
        assert_eq!(ErrorCode::OrderNotFound.message(), "Order not found");
        assert_eq!(ErrorCode::InsufficientStock.message(), "Not enough stock");
        assert_eq!(
            ErrorCode::InvalidTransition.message(),
            "Order status transition is not allowed"
        );
        assert_eq!(ErrorCode::InternalError.message(), "Internal server error");
    }

    #[test]
    fn test_invalid_error_code_display() {
        let err = InvalidErrorCode(999);
        assert_eq!(format!("{}", err), "invalid error code: 999");
    }

    #[test]
    fn test_roundtrip() {
        let codes = [
            ErrorCode::Success,
            ErrorCode::NotAuthenticated,
            ErrorCode::PermissionDenied,
            ErrorCode::OrderNotFound,
            ErrorCode::InvalidTransition,
            ErrorCode::AmountMismatch,
            ErrorCode::CouponExhausted,
            ErrorCode::InternalError,
        ];

        for code in codes {
            let json = serde_json::to_string(&code).unwrap();
            let parsed: ErrorCode = serde_json::from_str(&json).unwrap();
            assert_eq!(code, parsed);
        }
    }

    #[test]
    fn test_debug() {
        let debug_str = format!("{:?}", ErrorCode::Success);
        assert_eq!(debug_str, "Success");

        let debug_str = format!("{:?}", ErrorCode::OrderNotFound);
        assert_eq!(debug_str, "OrderNotFound");
    }

    #[test]
    fn test_hash() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(ErrorCode::Success);
        set.insert(ErrorCode::NotFound);
        set.insert(ErrorCode::Success); // Duplicate

        assert_eq!(set.len(), 2);
        assert!(set.contains(&ErrorCode::Success));
        assert!(set.contains(&ErrorCode::NotFound));
    }
}
