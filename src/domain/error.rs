//! Validation Error Types
//!
//! Local input errors. These never reach the remote store.

use thiserror::Error;

/// Errors produced while validating user supplied product fields.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was empty
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Price did not parse to a positive decimal
    #[error("Price must be a positive number (got {0:?})")]
    InvalidPrice(String),

    /// Stock did not parse to a non-negative integer
    #[error("Stock must be a non-negative integer (got {0:?})")]
    InvalidStock(String),
}

impl ValidationError {
    /// Name of the offending field, for pointing the user at the right input
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingField(field) => field,
            Self::InvalidPrice(_) => "original_price",
            Self::InvalidStock(_) => "stock",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::MissingField("name");
        assert_eq!(err.to_string(), "Missing required field: name");

        let err = ValidationError::InvalidPrice("abc".to_string());
        assert!(err.to_string().contains("\"abc\""));
    }

    #[test]
    fn test_validation_error_field() {
        assert_eq!(ValidationError::MissingField("category").field(), "category");
        assert_eq!(ValidationError::InvalidPrice("0".into()).field(), "original_price");
        assert_eq!(ValidationError::InvalidStock("-1".into()).field(), "stock");
    }
}
