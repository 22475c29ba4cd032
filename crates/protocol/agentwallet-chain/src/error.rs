//! Error types for the chain gateway.

use thiserror::Error;

/// Result type alias for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;

/// JSON-RPC error code for a transaction that failed preflight simulation.
pub const RPC_PREFLIGHT_FAILURE: i64 = -32002;

/// Errors that can occur talking to the chain.
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    /// Transport failure (connection refused, reset, non-2xx status). Retryable.
    #[error("network error: {0}")]
    Network(String),

    /// Request exceeded its per-call timeout. Retryable.
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// The node answered with a JSON-RPC error object. Retryable.
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// Error message from the node
        message: String,
    },

    /// Response was missing its result or had an unexpected shape. Retryable.
    #[error("invalid RPC response: {0}")]
    InvalidResponse(String),

    /// Every attempt failed with a retryable error.
    #[error("retries exhausted after {attempts} attempts: {last_error}")]
    RetryExhausted {
        /// Attempts made
        attempts: u32,
        /// The final error
        last_error: Box<ChainError>,
    },

    /// Transaction was rejected by simulation or failed on-chain.
    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ChainError {
    /// Create a new Network error.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a new Timeout error.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create an Rpc error, classifying preflight failures as terminal.
    pub fn rpc(code: i64, message: impl Into<String>) -> Self {
        let message = message.into();
        if code == RPC_PREFLIGHT_FAILURE {
            return Self::TransactionFailed(message);
        }
        Self::Rpc { code, message }
    }

    /// Create a new InvalidResponse error.
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Create a new TransactionFailed error.
    pub fn transaction_failed(reason: impl Into<String>) -> Self {
        Self::TransactionFailed(reason.into())
    }

    /// Create a new Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Check if this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout(_) | Self::Rpc { .. } | Self::InvalidResponse(_)
        )
    }
}
