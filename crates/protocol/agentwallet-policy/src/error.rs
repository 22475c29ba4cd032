//! Error types for policy validation and evaluation.

use agentwallet_store::StoreError;
use agentwallet_types::ErrorCode;
use thiserror::Error;

/// Result type for policy operations.
pub type PolicyResult<T> = std::result::Result<T, PolicyError>;

/// Errors raised while validating or evaluating policies.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A time-of-day value is not `HH:MM`.
    #[error("invalid time of day {0:?}: expected HH:MM")]
    InvalidTime(String),

    /// The timezone is not one of the accepted forms.
    #[error("unknown timezone {0:?}: use UTC, Z, +HH:MM or UTC+HH[:MM]")]
    UnknownTimezone(String),

    /// A spending cap was set to zero.
    #[error("{0} must be greater than zero")]
    ZeroCap(&'static str),

    /// Loading policies or spend totals failed.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl PolicyError {
    /// Map to the shared error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidTime(_) | Self::UnknownTimezone(_) | Self::ZeroCap(_) => ErrorCode::InvalidPolicy,
            Self::Store(_) => ErrorCode::StorageError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(PolicyError::InvalidTime("9am".into()).error_code(), ErrorCode::InvalidPolicy);
        assert_eq!(
            PolicyError::Store(StoreError::lock_poisoned("store")).error_code(),
            ErrorCode::StorageError
        );
    }

    #[test]
    fn test_display() {
        let err = PolicyError::ZeroCap("spending_limit_lamports");
        assert_eq!(err.to_string(), "spending_limit_lamports must be greater than zero");
    }
}
