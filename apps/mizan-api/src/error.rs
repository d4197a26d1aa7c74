//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Mizan                                  │
//! │                                                                         │
//! │  Handler: Result<T, ApiError>                                           │
//! │         │                                                               │
//! │         ├── ValidationError ──┐                                         │
//! │         ├── CoreError ────────┤                                         │
//! │         ├── DbError ──────────┼──► ApiError { code, message }           │
//! │         ├── LedgerError ──────┤            │                            │
//! │         └── rejected body ────┘            ▼                            │
//! │                                  (status from code, JSON body)          │
//! │                                                                         │
//! │  Storage failures are logged here and reach the client as a generic    │
//! │  DATABASE_ERROR, never with the SQL message.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use mizan_core::{CoreError, ValidationError};
use mizan_db::{DbError, LedgerError};

/// Error body returned by every failing endpoint.
///
/// ```json
/// {
///   "code": "INVALID_PAYMENT",
///   "message": "Invalid payment: amount exceeds the outstanding balance of 500"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Invoice without lines (400)
    EmptyCart,

    /// Credit invoice without the party that carries the debt (422)
    MissingParty,

    /// Debt payment not positive or above the balance (422)
    InvalidPayment,

    /// Oversell while negative stock is disabled (409)
    InsufficientStock,

    /// Missing or invalid bearer token (401)
    Unauthorized,

    /// Role may not use the resource (403)
    Forbidden,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError | ErrorCode::EmptyCart => StatusCode::BAD_REQUEST,
            ErrorCode::MissingParty | ErrorCode::InvalidPayment => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ErrorCode::InsufficientStock => StatusCode::CONFLICT,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Forbidden, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::warn!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::CheckViolation { message } => {
                tracing::warn!("Check constraint violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Value out of allowed range")
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::PoolExhausted => {
                tracing::error!("Database pool exhausted");
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        let code = match err {
            CoreError::EmptyCart => ErrorCode::EmptyCart,
            CoreError::MissingParty { .. } => ErrorCode::MissingParty,
            CoreError::InvalidPayment { .. } => ErrorCode::InvalidPayment,
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::NotFound { .. } => ErrorCode::NotFound,
            CoreError::Validation(e) => return ApiError::from(e),
            CoreError::UnexpectedParty { .. } | CoreError::CartTooLarge { .. } => {
                ErrorCode::ValidationError
            }
        };
        ApiError::new(code, message)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Core(e) => e.into(),
            LedgerError::Persistence(e) => e.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_their_codes() {
        let cases = [
            (CoreError::EmptyCart, ErrorCode::EmptyCart, StatusCode::BAD_REQUEST),
            (
                CoreError::MissingParty {
                    invoice_type: "sale".into(),
                    party: "customer".into(),
                },
                ErrorCode::MissingParty,
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                CoreError::invalid_payment("too much"),
                ErrorCode::InvalidPayment,
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                CoreError::InsufficientStock {
                    product: "Tea".into(),
                    available: 1,
                    requested: 2,
                },
                ErrorCode::InsufficientStock,
                StatusCode::CONFLICT,
            ),
            (
                CoreError::not_found("Product", "p-1"),
                ErrorCode::NotFound,
                StatusCode::NOT_FOUND,
            ),
        ];

        for (err, code, status) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.code, code);
            assert_eq!(api.status(), status);
        }
    }

    #[test]
    fn storage_failures_hide_details() {
        let api: ApiError = DbError::QueryFailed("no such table: invoices".into()).into();

        assert_eq!(api.code, ErrorCode::DatabaseError);
        assert_eq!(api.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.message.contains("invoices"));
    }

    #[test]
    fn ledger_errors_unwrap_to_inner_code() {
        let core: ApiError = LedgerError::Core(CoreError::EmptyCart).into();
        assert_eq!(core.code, ErrorCode::EmptyCart);

        let db: ApiError = LedgerError::Persistence(DbError::not_found("Invoice", "x")).into();
        assert_eq!(db.code, ErrorCode::NotFound);
    }

    #[test]
    fn serializes_screaming_snake_code() {
        let json = serde_json::to_value(ApiError::forbidden("no")).unwrap();

        assert_eq!(json["code"], "FORBIDDEN");
        assert_eq!(json["message"], "no");
    }
}
