//! Error types for agentwallet-crypto

use thiserror::Error;

/// Errors that can occur in cryptographic operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Invalid base58 encoding
    #[error("Invalid base58 encoding: {0}")]
    InvalidBase58(String),

    /// Invalid key length
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Secret key does not match the embedded public key
    #[error("Secret key does not match its public key")]
    KeyMismatch,

    /// Encryption or decryption of key material failed
    #[error("Key encryption error: {0}")]
    Encryption(String),
}

impl CryptoError {
    /// Create a new Encryption error.
    pub fn encryption(msg: impl Into<String>) -> Self {
        Self::Encryption(msg.into())
    }
}
