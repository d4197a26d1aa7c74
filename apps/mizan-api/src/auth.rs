//! JWT authentication.
//!
//! Tokens are HS256, signed with the configured secret. Issuing tokens for
//! real users happens elsewhere; [`JwtManager::issue_token`] exists for tools
//! and tests.
//!
//! ```text
//! Authorization: Bearer <jwt>
//!        │
//!        ▼
//!   AuthUser extractor ── invalid/missing ──► 401 UNAUTHORIZED
//!        │
//!        ▼
//!   handler: user.require(Resource::Debts) ── denied ──► 403 FORBIDDEN
//! ```

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mizan_core::{can_access, Resource, Role};

use crate::error::ApiError;
use crate::state::AppState;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    pub role: Role,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,
}

/// JWT token manager.
pub struct JwtManager {
    secret: String,
    lifetime_secs: i64,
}

impl JwtManager {
    pub fn new(secret: impl Into<String>, lifetime_secs: i64) -> Self {
        JwtManager {
            secret: secret.into(),
            lifetime_secs,
        }
    }

    /// Sign a token for `user_id` acting as `role`.
    pub fn issue_token(&self, user_id: &str, role: Role) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.lifetime_secs);

        let claims = Claims {
            sub: user_id.to_string(),
            role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::internal(format!("Failed to generate token: {}", e)))
    }

    /// Validate and decode a token. Expiry is checked.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ApiError> {
        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| ApiError::unauthorized(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// The caller, taken from a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub role: Role,
}

impl AuthUser {
    /// Fails with `FORBIDDEN` unless this user's role may use `resource`.
    pub fn require(&self, resource: Resource) -> Result<(), ApiError> {
        if can_access(self.role, resource) {
            return Ok(());
        }

        Err(self.deny(resource))
    }

    /// The `FORBIDDEN` error [`require`](Self::require) returns for `resource`.
    pub fn deny(&self, resource: Resource) -> ApiError {
        tracing::warn!(
            user_id = %self.user_id,
            role = %self.role,
            resource = %resource,
            "Access denied"
        );
        ApiError::forbidden(format!("Role '{}' cannot access {}", self.role, resource))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

        let token = extract_bearer_token(header)
            .ok_or_else(|| ApiError::unauthorized("Expected a Bearer token"))?;

        let claims = state.jwt.validate_token(token)?;

        tracing::Span::current().record("user_id", claims.sub.as_str());

        Ok(AuthUser {
            user_id: claims.sub,
            role: claims.role,
        })
    }
}
