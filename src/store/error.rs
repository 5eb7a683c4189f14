//! Store Failures
//!
//! Every failed remote call is reported as a `StoreFailure`, never dropped.

use std::fmt;

/// Broad cause of a failed remote call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Transport level failure (DNS, TLS, connection reset)
    Network,
    /// Rejected by the store's security rules or a revoked credential
    PermissionDenied,
    /// No response within the configured timeout
    Timeout,
    /// Payload could not be encoded or decoded
    Serialization,
    /// A live subscription was closed by the other side
    Disconnected,
    /// The store answered with a server-side error
    Unavailable,
    /// Path or key is not addressable
    InvalidPath,
    /// The local event pipeline stopped unexpectedly
    Internal,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Network => write!(f, "network"),
            FailureReason::PermissionDenied => write!(f, "permission_denied"),
            FailureReason::Timeout => write!(f, "timeout"),
            FailureReason::Serialization => write!(f, "serialization"),
            FailureReason::Disconnected => write!(f, "disconnected"),
            FailureReason::Unavailable => write!(f, "unavailable"),
            FailureReason::InvalidPath => write!(f, "invalid_path"),
            FailureReason::Internal => write!(f, "internal"),
        }
    }
}

/// A failed remote store call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Store failure ({reason}): {message}")]
pub struct StoreFailure {
    pub reason: FailureReason,
    pub message: String,
}

impl StoreFailure {
    pub fn new(reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(FailureReason::Network, message)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(FailureReason::PermissionDenied, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(FailureReason::Serialization, message)
    }

    pub fn disconnected(message: impl Into<String>) -> Self {
        Self::new(FailureReason::Disconnected, message)
    }

    pub fn invalid_path(message: impl Into<String>) -> Self {
        Self::new(FailureReason::InvalidPath, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(FailureReason::Internal, message)
    }

    /// Whether repeating the same call later may succeed.
    ///
    /// The store itself never retries; this only informs callers.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.reason,
            FailureReason::Network
                | FailureReason::Timeout
                | FailureReason::Disconnected
                | FailureReason::Unavailable
        )
    }
}

impl From<serde_json::Error> for StoreFailure {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_display() {
        let failure = StoreFailure::permission_denied("Permission denied");
        assert_eq!(
            failure.to_string(),
            "Store failure (permission_denied): Permission denied"
        );
    }

    #[test]
    fn test_retryable() {
        assert!(StoreFailure::network("reset").is_retryable());
        assert!(StoreFailure::disconnected("closed").is_retryable());
        assert!(!StoreFailure::permission_denied("denied").is_retryable());
        assert!(!StoreFailure::serialization("bad json").is_retryable());
    }

    #[test]
    fn test_from_serde_error() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let failure: StoreFailure = err.into();
        assert_eq!(failure.reason, FailureReason::Serialization);
    }
}
