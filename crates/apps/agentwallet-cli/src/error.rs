//! CLI error types.

use std::path::PathBuf;

use agentwallet_chain::ChainError;
use agentwallet_crypto::CryptoError;
use agentwallet_ops::OpsError;
use agentwallet_store::StoreError;
use agentwallet_types::ErrorCode;
use thiserror::Error;

/// CLI result type.
pub type CliResult<T> = Result<T, CliError>;

/// CLI error enum wrapping all crate errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operations error. Chain, store and crypto errors arrive here too.
    #[error("{0}")]
    Ops(#[from] OpsError),

    /// IO error.
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// User-facing error with actionable message.
    #[error("{0}")]
    User(String),

    /// Configuration file already exists.
    #[error("Configuration already exists at {}. Pass --force to overwrite.", .0.display())]
    ConfigExists(PathBuf),
}

impl From<ChainError> for CliError {
    fn from(e: ChainError) -> Self {
        Self::Ops(e.into())
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        Self::Ops(e.into())
    }
}

impl From<CryptoError> for CliError {
    fn from(e: CryptoError) -> Self {
        Self::Ops(e.into())
    }
}

impl CliError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a user-facing error.
    pub fn user(msg: impl Into<String>) -> Self {
        Self::User(msg.into())
    }

    /// Get the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors: 1
            Self::User(_) | Self::ConfigExists(_) => 1,
            // Not found: 2
            Self::Ops(OpsError::NotFound { .. }) => 2,
            // Config errors: 3
            Self::Config(_) | Self::Toml(_) => 3,
            // Request errors: 4
            Self::Ops(OpsError::Validation(_)) | Self::Ops(OpsError::Crypto(CryptoError::InvalidBase58(_))) => 4,
            // Chain errors: 5
            Self::Ops(OpsError::Chain(_)) | Self::Ops(OpsError::Decode(_)) => 5,
            // Store errors: 6
            Self::Ops(OpsError::Store(_)) => 6,
            // Other operation errors: 8
            Self::Ops(_) => 8,
            // IO errors: 9
            Self::Io(_) => 9,
            // JSON/format errors: 10
            Self::Json(_) => 10,
        }
    }

    /// Get the shared error code for this error.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Ops(e) => e.error_code(),
            Self::User(_) => ErrorCode::InvalidInput,
            Self::Config(_) | Self::Toml(_) | Self::Json(_) | Self::ConfigExists(_) => ErrorCode::InternalError,
            Self::Io(_) => ErrorCode::InternalError,
        }
    }

    /// Recovery hint for the operator.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Ops(e) => Some(e.suggestion()),
            Self::Config(_) | Self::Toml(_) => Some("Check the configuration file, or run 'agentwallet init'."),
            _ => self.error_code().suggestion(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::user("nope").exit_code(), 1);
        assert_eq!(CliError::config("bad").exit_code(), 3);
        assert_eq!(CliError::from(OpsError::not_found("PDA account", "abc")).exit_code(), 2);
        assert_eq!(CliError::from(OpsError::validation("seed too long")).exit_code(), 4);
        assert_eq!(CliError::from(ChainError::network("connection reset")).exit_code(), 5);
    }

    #[test]
    fn test_error_code_delegates_to_ops() {
        let err = CliError::from(OpsError::not_found("PDA account", "abc"));
        assert_eq!(err.error_code(), ErrorCode::NotFound);
        assert!(err.to_string().contains("PDA account"));

        let err = CliError::from(ChainError::network("connection reset"));
        assert_eq!(err.error_code(), ErrorCode::RpcError);
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn test_invalid_address_maps_to_request_error() {
        let err: CliError = "not base58!".parse::<agentwallet_crypto::Pubkey>().unwrap_err().into();
        assert_eq!(err.error_code(), ErrorCode::InvalidAddress);
        assert_eq!(err.exit_code(), 4);
    }
}
