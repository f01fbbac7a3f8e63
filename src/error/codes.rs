//! Error code constants.
//!
//! Error codes are organized by category:
//! - 1xxx: Sequence configuration errors
//! - 2xxx: Authentication/Authorization errors
//! - 3xxx: Validation errors
//! - 4xxx: Concurrency errors
//! - 5xxx: Internal/System errors

/// Error code type with semantic categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode(i32);

impl ErrorCode {
    // ===== Sequence Configuration Errors (1xxx) =====

    /// Sequence has no configuration in this scope.
    pub const SEQUENCE_NOT_CONFIGURED: Self = Self(1001);

    /// Pattern is malformed or references unknown variables.
    pub const INVALID_PATTERN: Self = Self(1002);

    /// Counter cannot advance any further.
    pub const SEQUENCE_EXHAUSTED: Self = Self(1003);

    // ===== Authentication/Authorization Errors (2xxx) =====

    /// Authentication required.
    pub const UNAUTHORIZED: Self = Self(2001);

    /// Insufficient permissions.
    pub const FORBIDDEN: Self = Self(2002);

    // ===== Validation Errors (3xxx) =====

    /// Bad request / invalid parameters.
    pub const BAD_REQUEST: Self = Self(3001);

    /// A configuration field failed validation.
    pub const VALIDATION_FAILED: Self = Self(3002);

    // ===== Resource Errors (4xxx) =====

    /// Row lock could not be acquired in time; safe to retry.
    pub const CONCURRENCY_TIMEOUT: Self = Self(4002);

    // ===== Internal/System Errors (5xxx) =====

    /// Storage backend error.
    pub const STORAGE_ERROR: Self = Self(5001);

    /// Service unavailable.
    pub const SERVICE_UNAVAILABLE: Self = Self(5003);

    /// A validated pattern failed to render.
    pub const FORMAT_ERROR: Self = Self(5004);

    /// Get the error code as an i32.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Get the category of this error code.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self.0 {
            1000..=1999 => ErrorCategory::Configuration,
            2000..=2999 => ErrorCategory::Authentication,
            3000..=3999 => ErrorCategory::Validation,
            4000..=4999 => ErrorCategory::Resource,
            5000..=5999 => ErrorCategory::Internal,
            _ => ErrorCategory::Unknown,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        code.0
    }
}

/// Error category based on error code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Sequence configuration errors (1xxx).
    Configuration,
    /// Authentication/authorization errors (2xxx).
    Authentication,
    /// Validation errors (3xxx).
    Validation,
    /// Resource and concurrency errors (4xxx).
    Resource,
    /// Internal/system errors (5xxx).
    Internal,
    /// Unknown category.
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Authentication => write!(f, "authentication"),
            Self::Validation => write!(f, "validation"),
            Self::Resource => write!(f, "resource"),
            Self::Internal => write!(f, "internal"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::SEQUENCE_NOT_CONFIGURED.as_i32(), 1001);
        assert_eq!(ErrorCode::UNAUTHORIZED.as_i32(), 2001);
        assert_eq!(ErrorCode::VALIDATION_FAILED.as_i32(), 3002);
        assert_eq!(ErrorCode::CONCURRENCY_TIMEOUT.as_i32(), 4002);
        assert_eq!(ErrorCode::FORMAT_ERROR.as_i32(), 5004);
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(
            ErrorCode::INVALID_PATTERN.category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            ErrorCode::FORBIDDEN.category(),
            ErrorCategory::Authentication
        );
        assert_eq!(ErrorCode::BAD_REQUEST.category(), ErrorCategory::Validation);
        assert_eq!(
            ErrorCode::CONCURRENCY_TIMEOUT.category(),
            ErrorCategory::Resource
        );
        assert_eq!(ErrorCode::FORMAT_ERROR.category(), ErrorCategory::Internal);
        assert_eq!(ErrorCategory::Resource.to_string(), "resource");
    }
}
