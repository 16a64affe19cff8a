//! Store server configuration

use rust_decimal::Decimal;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Store server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// JWT secret for customer and staff authentication
    pub jwt_secret: String,
    /// Gateway merchant code (vnp_TmnCode)
    pub vnpay_tmn_code: String,
    /// Gateway HMAC-SHA512 secret
    pub vnpay_hash_secret: String,
    /// Gateway hosted payment page
    pub vnpay_pay_url: String,
    /// Gateway merchant API endpoint (refunds)
    pub vnpay_api_url: String,
    /// Our return URL registered with the gateway
    pub vnpay_return_url: String,
    /// Storefront page the return handler redirects the browser to
    pub storefront_result_url: String,
    /// Optional webhook receiving order notifications
    pub notify_webhook_url: Option<String>,
    /// Flat shipping fee applied at checkout
    pub shipping_fee: Decimal,
    /// Order totals at or above this ship free
    pub free_shipping_threshold: Option<Decimal>,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: environment.clone(),
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            vnpay_tmn_code: std::env::var("VNPAY_TMN_CODE").unwrap_or_else(|_| "DEMOSHOP".into()),
            vnpay_hash_secret: Self::require_secret("VNPAY_HASH_SECRET", &environment)?,
            vnpay_pay_url: std::env::var("VNPAY_PAY_URL").unwrap_or_else(|_| {
                "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html".into()
            }),
            vnpay_api_url: std::env::var("VNPAY_API_URL").unwrap_or_else(|_| {
                "https://sandbox.vnpayment.vn/merchant_webapi/api/transaction".into()
            }),
            vnpay_return_url: std::env::var("VNPAY_RETURN_URL")
                .unwrap_or_else(|_| "http://localhost:8080/api/payment/gateway/return".into()),
            storefront_result_url: std::env::var("STOREFRONT_RESULT_URL")
                .unwrap_or_else(|_| "http://localhost:3000/payment/result".into()),
            notify_webhook_url: std::env::var("NOTIFY_WEBHOOK_URL")
                .ok()
                .filter(|s| !s.is_empty()),
            shipping_fee: std::env::var("SHIPPING_FEE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(Decimal::new(30_000, 0)),
            free_shipping_threshold: std::env::var("FREE_SHIPPING_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok()),
        })
    }
}
