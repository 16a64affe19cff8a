//! Customer JWT authentication for the storefront API

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};

use super::Actor;
use crate::state::AppState;

/// JWT claims for customer authentication
#[derive(Debug, Serialize, Deserialize)]
pub struct CustomerClaims {
    /// Customer ID (stringified i64)
    pub sub: String,
    /// Customer email
    pub email: String,
    /// Display name
    pub name: String,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    /// Issued at (Unix timestamp seconds)
    pub iat: usize,
}

/// Authenticated customer identity extracted from JWT
#[derive(Debug, Clone)]
pub struct CustomerIdentity {
    pub customer_id: i64,
    pub email: String,
    pub name: String,
}

impl CustomerIdentity {
    pub fn actor(&self) -> Actor {
        Actor::Customer {
            id: self.customer_id,
            name: self.name.clone(),
        }
    }
}

const JWT_EXPIRY_HOURS: i64 = 24;

/// Create a JWT token for a customer
pub fn create_token(
    customer_id: i64,
    email: &str,
    name: &str,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = CustomerClaims {
        sub: customer_id.to_string(),
        email: email.to_string(),
        name: name.to_string(),
        exp: (now + chrono::Duration::hours(JWT_EXPIRY_HOURS)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Middleware that extracts and verifies the customer JWT from the Authorization header
pub async fn customer_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::new(ErrorCode::NotAuthenticated).into_response())?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::invalid_token("Invalid Authorization format").into_response()
    })?;

    let validation = Validation::default();
    let token_data = jsonwebtoken::decode::<CustomerClaims>(
        token,
        &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!("Customer JWT validation failed: {e}");
        AppError::invalid_token("Invalid or expired token").into_response()
    })?;

    let customer_id: i64 = token_data.claims.sub.parse().map_err(|_| {
        AppError::invalid_token("Malformed subject claim").into_response()
    })?;

    let identity = CustomerIdentity {
        customer_id,
        email: token_data.claims.email,
        name: token_data.claims.name,
    };

    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}
