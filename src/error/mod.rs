//! Error handling module.
//!
//! This module provides unified error handling with proper HTTP status code mapping
//! and standardized API error responses.

pub mod codes;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

pub use codes::ErrorCode;

/// Application-level error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Pattern is malformed or references variables the registry does not know.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// Generate or preview against a sequence with no configuration.
    #[error("Sequence not configured: {0}")]
    SequenceNotConfigured(String),

    /// Row lock could not be acquired within the bounded wait.
    #[error("Concurrency timeout: {0}")]
    ConcurrencyTimeout(String),

    /// A configuration field is out of range or malformed.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// An already-validated pattern failed to render.
    #[error("Format error: {0}")]
    Format(String),

    /// Counter would overflow.
    #[error("Sequence exhausted for: {0}")]
    SequenceExhausted(String),

    /// Authentication failed.
    #[error("Authentication failed")]
    Unauthorized,

    /// Insufficient permissions.
    #[error("Insufficient permissions")]
    Forbidden,

    /// The request body or query could not be decoded.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Storage backend error.
    #[error("Storage error: {0}")]
    Storage(StorageError),
}

impl AppError {
    /// Get the error code for this error.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidPattern(_) => ErrorCode::INVALID_PATTERN,
            Self::SequenceNotConfigured(_) => ErrorCode::SEQUENCE_NOT_CONFIGURED,
            Self::ConcurrencyTimeout(_) => ErrorCode::CONCURRENCY_TIMEOUT,
            Self::Validation(_) => ErrorCode::VALIDATION_FAILED,
            Self::Format(_) => ErrorCode::FORMAT_ERROR,
            Self::SequenceExhausted(_) => ErrorCode::SEQUENCE_EXHAUSTED,
            Self::Unauthorized => ErrorCode::UNAUTHORIZED,
            Self::Forbidden => ErrorCode::FORBIDDEN,
            Self::BadRequest(_) => ErrorCode::BAD_REQUEST,
            Self::Storage(_) => ErrorCode::STORAGE_ERROR,
        }
    }

    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::SequenceNotConfigured(_) => StatusCode::NOT_FOUND,
            Self::InvalidPattern(_) | Self::Validation(_) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::ConcurrencyTimeout(_) | Self::SequenceExhausted(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Format(_) | Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the caller may retry the same request unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyTimeout(_))
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::LockTimeout(key) => Self::ConcurrencyTimeout(key),
            StorageError::Exhausted(key) => Self::SequenceExhausted(key),
            StorageError::Missing(key) => Self::SequenceNotConfigured(key),
            other => Self::Storage(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code().as_i32();
        let retryable = self.is_retryable();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(
                error_code = code,
                status = %status,
                message = %message,
                "Request failed"
            );
        } else {
            tracing::debug!(
                error_code = code,
                status = %status,
                message = %message,
                "Request rejected"
            );
        }

        let body = Json(json!({
            "code": code,
            "message": message,
            "retryable": retryable,
            "data": null
        }));

        (status, body).into_response()
    }
}

/// Storage-specific error type.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Connection error.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Query execution error.
    #[error("Query failed: {0}")]
    Query(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Lock acquisition failed.
    #[error("Failed to acquire lock: {0}")]
    LockFailed(String),

    /// Lock not acquired within the bounded wait.
    #[error("Lock timeout: {0}")]
    LockTimeout(String),

    /// Counter arithmetic overflowed.
    #[error("Counter exhausted: {0}")]
    Exhausted(String),

    /// No counter row; the sequence was never configured or has been deleted.
    #[error("No counter for: {0}")]
    Missing(String),

    /// File I/O error.
    #[error("File I/O error: {0}")]
    FileIO(String),

    /// Backend not available.
    #[error("Storage backend unavailable")]
    Unavailable,
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::FileIO(err.to_string())
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Connection(err.to_string())
            }
            sqlx::Error::Database(ref db) if db.code().as_deref() == Some(LOCK_NOT_AVAILABLE) => {
                Self::LockTimeout(db.message().to_string())
            }
            other => Self::Query(other.to_string()),
        }
    }
}

/// `PostgreSQL` SQLSTATE raised when `lock_timeout` expires.
pub const LOCK_NOT_AVAILABLE: &str = "55P03";

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type alias using `StorageError`.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::SequenceNotConfigured("acme/invoice".to_string()).error_code(),
            ErrorCode::SEQUENCE_NOT_CONFIGURED
        );
        assert_eq!(AppError::Unauthorized.error_code(), ErrorCode::UNAUTHORIZED);
        assert_eq!(
            AppError::BadRequest("test".to_string()).error_code(),
            ErrorCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Format("test".to_string()).error_code(),
            ErrorCode::FORMAT_ERROR
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::InvalidPattern("test".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::ConcurrencyTimeout("test".to_string()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::Format("test".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_storage_error_conversion() {
        let err: AppError = StorageError::LockTimeout("acme/invoice".to_string()).into();
        assert!(matches!(err, AppError::ConcurrencyTimeout(_)));
        assert!(err.is_retryable());

        let err: AppError = StorageError::Exhausted("acme/invoice".to_string()).into();
        assert!(matches!(err, AppError::SequenceExhausted(_)));
        assert!(!err.is_retryable());

        let err: AppError = StorageError::Missing("acme/invoice".to_string()).into();
        assert!(matches!(err, AppError::SequenceNotConfigured(_)));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err: AppError = StorageError::Unavailable.into();
        assert!(matches!(err, AppError::Storage(StorageError::Unavailable)));
    }
}
