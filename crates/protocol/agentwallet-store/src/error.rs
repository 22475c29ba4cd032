//! Error types for the storage layer.

use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Record does not exist (or belongs to another organization).
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A uniqueness constraint was violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Schema initialization error.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Stored data could not be interpreted.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Lock poisoning error.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

impl StoreError {
    /// Create a not-found error.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Create a conflict error.
    pub fn conflict(msg: impl Into<String>) -> Self {
        StoreError::Conflict(msg.into())
    }

    /// Create a schema error.
    pub fn schema(msg: impl Into<String>) -> Self {
        StoreError::Schema(msg.into())
    }

    /// Create an invalid data error.
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        StoreError::InvalidData(msg.into())
    }

    /// Create a lock poisoned error.
    pub fn lock_poisoned(msg: impl Into<String>) -> Self {
        StoreError::LockPoisoned(msg.into())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::not_found("wallet", "abc");
        assert_eq!(err.to_string(), "wallet not found: abc");
        assert!(err.is_not_found());

        let err = StoreError::conflict("idempotency key k1");
        assert!(err.to_string().contains("k1"));
        assert!(err.is_conflict());
    }

    #[test]
    fn test_from_serde() {
        let err: StoreError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
