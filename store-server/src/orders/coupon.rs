//! Coupon rules
//!
//! Validation is pure so the rules are testable without a database. The
//! usage counter is the one thing enforced at write time instead, via the
//! guarded update in [`crate::db::coupons::consume`].

use rust_decimal::Decimal;
use serde_json::json;
use shared::error::{AppError, ErrorCode};

use crate::db::coupons::CouponRow;

/// Check a coupon against the order being built. `now` is epoch millis.
pub fn validate_coupon(coupon: &CouponRow, subtotal: Decimal, now: i64) -> Result<(), AppError> {
    if !coupon.active {
        return Err(AppError::new(ErrorCode::CouponInactive));
    }
    if now < coupon.starts_at {
        return Err(AppError::new(ErrorCode::CouponNotStarted));
    }
    if now >= coupon.expires_at {
        return Err(AppError::new(ErrorCode::CouponExpired));
    }
    if coupon.usage_limit > 0 && coupon.used_count >= coupon.usage_limit {
        return Err(AppError::new(ErrorCode::CouponExhausted));
    }
    if let Some(min) = coupon.min_order_amount {
        if subtotal < min {
            return Err(AppError::new(ErrorCode::CouponMinOrderNotMet)
                .with_detail("min_order_amount", json!(min.to_string())));
        }
    }
    Ok(())
}

/// Percentage discount on the subtotal, rounded to cents, then capped.
pub fn compute_discount(coupon: &CouponRow, subtotal: Decimal) -> Decimal {
    let raw = (subtotal * coupon.discount_percent / Decimal::ONE_HUNDRED).round_dp(2);
    match coupon.max_discount_amount {
        Some(cap) if raw > cap => cap,
        _ => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coupon() -> CouponRow {
        CouponRow {
            id: 1,
            code: "SALE10".into(),
            active: true,
            discount_percent: Decimal::new(10, 0),
            max_discount_amount: None,
            min_order_amount: None,
            starts_at: 1_000,
            expires_at: 2_000,
            usage_limit: 0,
            used_count: 0,
            created_at: 500,
        }
    }

    #[test]
    fn test_ten_percent_off_half_million() {
        let c = coupon();
        assert!(validate_coupon(&c, Decimal::new(500_000, 0), 1_500).is_ok());
        assert_eq!(
            compute_discount(&c, Decimal::new(500_000, 0)),
            Decimal::new(50_000, 0)
        );
    }

    #[test]
    fn test_cap_limits_discount() {
        let mut c = coupon();
        c.max_discount_amount = Some(Decimal::new(30_000, 0));
        assert_eq!(
            compute_discount(&c, Decimal::new(500_000, 0)),
            Decimal::new(30_000, 0)
        );
        // Below the cap the raw percentage wins
        assert_eq!(
            compute_discount(&c, Decimal::new(200_000, 0)),
            Decimal::new(20_000, 0)
        );
    }

    #[test]
    fn test_discount_rounds_to_cents() {
        let mut c = coupon();
        c.discount_percent = Decimal::new(75, 1); // 7.5%
        assert_eq!(
            compute_discount(&c, Decimal::new(19_990, 2)), // 199.90
            Decimal::new(1_499, 2)                         // 14.99 (14.9925 rounded)
        );
    }

    #[test]
    fn test_inactive_coupon() {
        let mut c = coupon();
        c.active = false;
        let err = validate_coupon(&c, Decimal::new(100, 0), 1_500).unwrap_err();
        assert_eq!(err.code, ErrorCode::CouponInactive);
    }

    #[test]
    fn test_validity_window() {
        let c = coupon();
        let err = validate_coupon(&c, Decimal::new(100, 0), 999).unwrap_err();
        assert_eq!(err.code, ErrorCode::CouponNotStarted);

        assert!(validate_coupon(&c, Decimal::new(100, 0), 1_000).is_ok());

        let err = validate_coupon(&c, Decimal::new(100, 0), 2_000).unwrap_err();
        assert_eq!(err.code, ErrorCode::CouponExpired);
    }

    #[test]
    fn test_usage_limit() {
        let mut c = coupon();
        c.usage_limit = 5;
        c.used_count = 5;
        let err = validate_coupon(&c, Decimal::new(100, 0), 1_500).unwrap_err();
        assert_eq!(err.code, ErrorCode::CouponExhausted);

        // Zero limit means unlimited
        c.usage_limit = 0;
        c.used_count = 1_000_000;
        assert!(validate_coupon(&c, Decimal::new(100, 0), 1_500).is_ok());
    }

    #[test]
    fn test_min_order_amount() {
        let mut c = coupon();
        c.min_order_amount = Some(Decimal::new(200_000, 0));
        let err = validate_coupon(&c, Decimal::new(199_999, 0), 1_500).unwrap_err();
        assert_eq!(err.code, ErrorCode::CouponMinOrderNotMet);
        assert!(validate_coupon(&c, Decimal::new(200_000, 0), 1_500).is_ok());
    }
}
