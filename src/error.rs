//! Error handling module
//!
//! Centralized error type returned by the synchronizer and the mutation
//! coordinator. Every failure is recoverable by the caller; nothing here
//! aborts the process.

use crate::domain::ValidationError;
use crate::store::StoreFailure;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Caller errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Product not found: {0}")]
    NotFound(String),

    // Remote errors
    #[error(transparent)]
    Store(#[from] StoreFailure),

    #[error("Subscription failed: {0}")]
    Subscription(StoreFailure),

    // Local failures
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(ValidationError::MissingField(_)) => "missing_field",
            AppError::Validation(ValidationError::InvalidPrice(_)) => "invalid_price",
            AppError::Validation(ValidationError::InvalidStock(_)) => "invalid_stock",
            AppError::NotFound(_) => "not_found",
            AppError::Store(_) => "store_failure",
            AppError::Subscription(_) => "subscription_failure",
            AppError::Config(_) => "config_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// True when the caller can fix the request (bad input or missing record)
    pub fn is_client_error(&self) -> bool {
        matches!(self, AppError::Validation(_) | AppError::NotFound(_))
    }

    /// Underlying remote failure, if any
    pub fn store_failure(&self) -> Option<&StoreFailure> {
        match self {
            AppError::Store(failure) | AppError::Subscription(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Store(StoreFailure::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FailureReason;

    #[test]
    fn test_error_codes() {
        let err: AppError = ValidationError::MissingField("name").into();
        assert_eq!(err.error_code(), "missing_field");
        assert!(err.is_client_error());

        let err = AppError::NotFound("abc".to_string());
        assert_eq!(err.error_code(), "not_found");
        assert_eq!(err.to_string(), "Product not found: abc");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_store_failures_are_not_client_errors() {
        let err: AppError = StoreFailure::permission_denied("rules").into();
        assert_eq!(err.error_code(), "store_failure");
        assert!(!err.is_client_error());
        assert_eq!(
            err.store_failure().map(|f| f.reason),
            Some(FailureReason::PermissionDenied)
        );

        let err = AppError::Subscription(StoreFailure::network("reset"));
        assert_eq!(err.error_code(), "subscription_failure");
        assert!(err.store_failure().is_some());
    }
}
