//! Staff JWT authentication for the back-office API

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};

use super::{Actor, StaffRole};
use crate::state::AppState;

/// JWT claims for staff authentication
#[derive(Debug, Serialize, Deserialize)]
pub struct StaffClaims {
    /// Staff ID (stringified i64)
    pub sub: String,
    /// Display name
    pub name: String,
    /// Role string ("STAFF" or "MANAGER")
    pub role: String,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    /// Issued at (Unix timestamp seconds)
    pub iat: usize,
}

/// Authenticated staff identity extracted from JWT
#[derive(Debug, Clone)]
pub struct StaffIdentity {
    pub staff_id: i64,
    pub name: String,
    pub role: StaffRole,
}

impl StaffIdentity {
    pub fn actor(&self) -> Actor {
        Actor::Staff {
            id: self.staff_id,
            name: self.name.clone(),
            role: self.role,
        }
    }
}

const JWT_EXPIRY_HOURS: i64 = 12;

/// Create a JWT token for a staff member
pub fn create_token(
    staff_id: i64,
    name: &str,
    role: StaffRole,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = StaffClaims {
        sub: staff_id.to_string(),
        name: name.to_string(),
        role: role.as_str().to_string(),
        exp: (now + chrono::Duration::hours(JWT_EXPIRY_HOURS)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Middleware that extracts and verifies the staff JWT from the Authorization header
///
/// A token carrying a role this server does not know is rejected here, not
/// silently downgraded.
pub async fn staff_auth_middleware(
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
    let token_data = jsonwebtoken::decode::<StaffClaims>(
        token,
        &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!("Staff JWT validation failed: {e}");
        AppError::invalid_token("Invalid or expired token").into_response()
    })?;

    let staff_id: i64 = token_data.claims.sub.parse().map_err(|_| {
        AppError::invalid_token("Malformed subject claim").into_response()
    })?;

    let role: StaffRole = token_data.claims.role.parse().map_err(|_| {
        tracing::warn!(role = %token_data.claims.role, "Staff token carries unknown role");
        AppError::new(ErrorCode::UnknownRole).into_response()
    })?;

    let identity = StaffIdentity {
        staff_id,
        name: token_data.claims.name,
        role,
    };

    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_roundtrip() {
        let secret = "test-secret";
        let token = create_token(7, "Ana", StaffRole::Manager, secret).unwrap();

        let data = jsonwebtoken::decode::<StaffClaims>(
            &token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .unwrap();

        assert_eq!(data.claims.sub, "7");
        assert_eq!(data.claims.name, "Ana");
        assert_eq!(data.claims.role, "MANAGER");
    }

    #[test]
    fn test_unknown_role_does_not_parse() {
        // What the middleware rejects with UnknownRole
        assert!("SUPERVISOR".parse::<StaffRole>().is_err());
    }

    #[test]
    fn test_identity_actor() {
        let identity = StaffIdentity {
            staff_id: 3,
            name: "Chau".into(),
            role: StaffRole::Staff,
        };
        assert_eq!(
            identity.actor(),
            Actor::Staff {
                id: 3,
                name: "Chau".into(),
                role: StaffRole::Staff
            }
        );
    }
}
