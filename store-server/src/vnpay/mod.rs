//! VNPay-style payment gateway integration (hosted payment page + IPN)
//!
//! The gateway redirects the shopper to a hosted page, then reports the
//! outcome twice: a browser redirect back to us (display only) and a
//! server-to-server IPN (the only channel allowed to move money state).
//! Every message in both directions is signed with HMAC-SHA512 over the
//! sorted, form-encoded parameter string.

use std::collections::{BTreeMap, HashMap};

use chrono::{LocalResult, TimeZone, Utc};
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sha2::Sha512;

pub const VERSION: &str = "2.1.0";

/// Gateway result code for a captured payment
pub const PAY_SUCCESS: &str = "00";

/// Codes this server answers the IPN channel with
pub const RSP_CONFIRMED: &str = "00";
pub const RSP_ORDER_NOT_FOUND: &str = "01";
pub const RSP_ALREADY_CONFIRMED: &str = "02";
pub const RSP_INVALID_AMOUNT: &str = "04";
pub const RSP_CHECKSUM_FAILED: &str = "97";
pub const RSP_UNKNOWN_ERROR: &str = "99";

/// Payment page links expire after this many minutes
const EXPIRE_MINUTES: i64 = 15;

/// The gateway clock runs at UTC+7; timestamps are yyyyMMddHHmmss
pub fn format_gateway_time(millis: i64) -> String {
    let shifted = millis + 7 * 3_600_000;
    match Utc.timestamp_millis_opt(shifted) {
        LocalResult::Single(dt) => dt.format("%Y%m%d%H%M%S").to_string(),
        _ => String::new(),
    }
}

/// Gateway amounts are the decimal total times 100, as an integer.
/// Returns None for totals too large to represent.
pub fn amount_x100(total: Decimal) -> Option<i64> {
    (total * Decimal::ONE_HUNDRED).trunc().to_i64()
}

fn sign(secret: &str, data: &str) -> String {
    let mut mac = match Hmac::<Sha512>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(data.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time signature check via hmac::verify_slice
fn verify(secret: &str, data: &str, provided_hex: &str) -> bool {
    let Ok(sig) = hex::decode(provided_hex) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha512>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(data.as_bytes());
    mac.verify_slice(&sig).is_ok()
}

/// Sorted form-encoding ('+' for spaces). The gateway hashes the encoded
/// string, so the hash input and the final query string must be built the
/// exact same way.
fn encode_sorted<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut ser = url::form_urlencoded::Serializer::new(String::new());
    for (k, v) in pairs {
        ser.append_pair(k, v);
    }
    ser.finish()
}

pub struct PaymentUrlParams<'a> {
    pub tmn_code: &'a str,
    pub secret: &'a str,
    pub pay_url: &'a str,
    pub return_url: &'a str,
    pub txn_ref: &'a str,
    pub amount_x100: i64,
    pub order_info: &'a str,
    pub client_ip: &'a str,
    pub now_millis: i64,
}

/// Build the signed redirect URL for the hosted payment page.
pub fn build_payment_url(p: &PaymentUrlParams<'_>) -> String {
    let amount = p.amount_x100.to_string();
    let create_date = format_gateway_time(p.now_millis);
    let expire_date = format_gateway_time(p.now_millis + EXPIRE_MINUTES * 60_000);

    let mut params: BTreeMap<&str, &str> = BTreeMap::new();
    params.insert("vnp_Version", VERSION);
    params.insert("vnp_Command", "pay");
    params.insert("vnp_TmnCode", p.tmn_code);
    params.insert("vnp_Amount", &amount);
    params.insert("vnp_CurrCode", "VND");
    params.insert("vnp_TxnRef", p.txn_ref);
    params.insert("vnp_OrderInfo", p.order_info);
    params.insert("vnp_OrderType", "other");
    params.insert("vnp_Locale", "vn");
    params.insert("vnp_ReturnUrl", p.return_url);
    params.insert("vnp_IpAddr", p.client_ip);
    params.insert("vnp_CreateDate", &create_date);
    params.insert("vnp_ExpireDate", &expire_date);

    let qs = encode_sorted(params.iter().map(|(k, v)| (*k, *v)));
    let hash = sign(p.secret, &qs);
    format!("{}?{}&vnp_SecureHash={}", p.pay_url, qs, hash)
}

/// Fields both callback channels carry. `checksum_ok` is the verdict of the
/// signature check over every vnp_ parameter except the hash itself.
#[derive(Debug)]
pub struct Callback {
    pub txn_ref: String,
    pub amount_x100: i64,
    pub response_code: String,
    pub gateway_txn_no: String,
    pub checksum_ok: bool,
}

/// Parse and verify a return/IPN query. Missing fields come back empty so
/// the caller can still answer the gateway with the right reject code.
pub fn parse_callback(secret: &str, params: &HashMap<String, String>) -> Callback {
    let field = |name: &str| params.get(name).cloned().unwrap_or_default();

    let provided = field("vnp_SecureHash");
    let canonical: BTreeMap<&str, &str> = params
        .iter()
        .filter(|(k, _)| {
            k.starts_with("vnp_") && *k != "vnp_SecureHash" && *k != "vnp_SecureHashType"
        })
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let data = encode_sorted(canonical);
    let checksum_ok = !provided.is_empty() && verify(secret, &data, &provided);

    Callback {
        txn_ref: field("vnp_TxnRef"),
        amount_x100: field("vnp_Amount").parse().unwrap_or(0),
        response_code: field("vnp_ResponseCode"),
        gateway_txn_no: field("vnp_TransactionNo"),
        checksum_ok,
    }
}

pub struct RefundParams<'a> {
    pub tmn_code: &'a str,
    pub secret: &'a str,
    pub api_url: &'a str,
    pub txn_ref: &'a str,
    pub amount_x100: i64,
    pub order_info: &'a str,
    pub gateway_txn_no: &'a str,
    /// When the original payment was captured, epoch millis
    pub paid_at_millis: i64,
    pub created_by: &'a str,
    pub client_ip: &'a str,
    pub now_millis: i64,
}

#[derive(Debug, serde::Deserialize)]
pub struct RefundResponse {
    #[serde(rename = "vnp_ResponseCode", default)]
    pub response_code: String,
    #[serde(rename = "vnp_Message", default)]
    pub message: String,
}

impl RefundResponse {
    pub fn is_success(&self) -> bool {
        self.response_code == PAY_SUCCESS
    }
}

/// Full refund through the merchant API. The request hash is a pipe-joined
/// field list in the order the gateway prescribes, not the sorted form.
pub async fn refund(
    client: &reqwest::Client,
    p: &RefundParams<'_>,
) -> Result<RefundResponse, reqwest::Error> {
    let request_id = uuid::Uuid::new_v4().simple().to_string();
    let create_date = format_gateway_time(p.now_millis);
    let txn_date = format_gateway_time(p.paid_at_millis);
    let txn_type = "02";
    let command = "refund";

    let data = format!(
        "{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}",
        request_id,
        VERSION,
        command,
        p.tmn_code,
        txn_type,
        p.txn_ref,
        p.amount_x100,
        p.gateway_txn_no,
        txn_date,
        p.created_by,
        create_date,
        p.client_ip,
        p.order_info,
    );
    let hash = sign(p.secret, &data);

    let body = serde_json::json!({
        "vnp_RequestId": request_id,
        "vnp_Version": VERSION,
        "vnp_Command": command,
        "vnp_TmnCode": p.tmn_code,
        "vnp_TransactionType": txn_type,
        "vnp_TxnRef": p.txn_ref,
        "vnp_Amount": p.amount_x100,
        "vnp_OrderInfo": p.order_info,
        "vnp_TransactionNo": p.gateway_txn_no,
        "vnp_TransactionDate": txn_date,
        "vnp_CreateBy": p.created_by,
        "vnp_CreateDate": create_date,
        "vnp_IpAddr": p.client_ip,
        "vnp_SecureHash": hash,
    });

    client
        .post(p.api_url)
        .json(&body)
        .send()
        .await?
        .json::<RefundResponse>()
        .await
}
