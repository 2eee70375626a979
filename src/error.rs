//! Error types for Libris server

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable numeric error codes exposed in error bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NoSuchItem = 5,
    ItemNotAvailable = 7,
    Duplicate = 8,
    BadValue = 18,
    NoActiveLoan = 22,
    BookHasActiveLoans = 23,
    Retry = 24,
    NoSuchRoute = 25,
}

/// Loan and inventory rules checked inside a unit of work
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusinessRule {
    #[error("No copies available")]
    OutOfStock,

    #[error("Book already borrowed by this user")]
    DuplicateLoan,

    #[error("No active loan for this book")]
    NoActiveLoan,

    #[error("Book still has active loans")]
    BookHasActiveLoans,
}

impl BusinessRule {
    fn code(&self) -> ErrorCode {
        match self {
            BusinessRule::OutOfStock => ErrorCode::ItemNotAvailable,
            BusinessRule::DuplicateLoan => ErrorCode::Duplicate,
            BusinessRule::NoActiveLoan => ErrorCode::NoActiveLoan,
            BusinessRule::BookHasActiveLoans => ErrorCode::BookHasActiveLoans,
        }
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Business rule violation: {0}")]
    BusinessRule(#[from] BusinessRule),

    /// Lock timeouts, serialization failures and lost connections. The
    /// transaction has been rolled back and the caller may retry.
    #[error("Temporarily unavailable: {0}")]
    Transient(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::BusinessRule(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// SQLSTATE codes for errors that are worth retrying
const LOCK_NOT_AVAILABLE: &str = "55P03";
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const QUERY_CANCELED: &str = "57014";

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        let transient = match &err {
            sqlx::Error::Database(db) => matches!(
                db.code().as_deref(),
                Some(LOCK_NOT_AVAILABLE | SERIALIZATION_FAILURE | DEADLOCK_DETECTED | QUERY_CANCELED)
            ),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => true,
            _ => false,
        };

        if transient {
            AppError::Transient(err.to_string())
        } else {
            AppError::Database(err)
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, error, detail) = match &self {
            AppError::Authentication(msg) => (ErrorCode::NotAuthorized, msg.clone(), None),
            AppError::Authorization(msg) => (ErrorCode::NotAuthorized, msg.clone(), None),
            AppError::NotFound(msg) => (ErrorCode::NoSuchItem, msg.clone(), None),
            AppError::Validation(msg) | AppError::BadRequest(msg) => {
                (ErrorCode::BadValue, msg.clone(), None)
            }
            AppError::BusinessRule(rule) => {
                tracing::debug!("Business rule rejected request: {}", rule);
                (rule.code(), rule.to_string(), None)
            }
            AppError::Transient(msg) => {
                tracing::warn!("Transient store failure: {}", msg);
                (
                    ErrorCode::Retry,
                    "Service temporarily unavailable, please retry".to_string(),
                    None,
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    ErrorCode::DbFailure,
                    "Server error".to_string(),
                    Some("Database error".to_string()),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (ErrorCode::Failure, "Server error".to_string(), Some(msg.clone()))
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error,
            detail,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_rules_are_unprocessable() {
        for rule in [
            BusinessRule::OutOfStock,
            BusinessRule::DuplicateLoan,
            BusinessRule::NoActiveLoan,
            BusinessRule::BookHasActiveLoans,
        ] {
            assert_eq!(AppError::from(rule).status(), StatusCode::UNPROCESSABLE_ENTITY);
        }
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::Validation("x".into()).status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(AppError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Authentication("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Authorization("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Transient("x".into()).status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(AppError::Internal("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_pool_timeout_is_transient() {
        assert!(matches!(AppError::from(sqlx::Error::PoolTimedOut), AppError::Transient(_)));
        assert!(matches!(AppError::from(sqlx::Error::PoolClosed), AppError::Transient(_)));
    }

    #[test]
    fn test_row_not_found_is_not_transient() {
        let err = AppError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, AppError::Database(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
