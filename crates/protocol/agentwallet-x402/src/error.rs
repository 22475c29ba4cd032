//! Error types for x402 payment handling.

use agentwallet_types::ErrorCode;
use thiserror::Error;

/// Result type for x402 operations.
pub type X402Result<T> = Result<T, X402Error>;

/// Errors that can occur while gating or paying for x402 resources.
#[derive(Debug, Error)]
pub enum X402Error {
    /// The payment header is neither base64 JSON nor JSON.
    #[error("cannot decode X-PAYMENT header")]
    UndecodableHeader,

    /// Payment payload is malformed or missing required fields.
    #[error("malformed payment payload: {reason}")]
    MalformedPayload {
        /// Description of what's wrong
        reason: String,
    },

    /// The payload carries no transaction signature.
    #[error("no signature in payment payload")]
    MissingSignature,

    /// This signature was verified before and rejected.
    #[error("previously rejected signature")]
    PreviouslyRejected,

    /// The proof's timestamp is older than the route's deadline.
    #[error("payment proof expired: {age_secs}s old, deadline {deadline_secs}s")]
    PaymentExpired {
        /// Age of the proof
        age_secs: i64,
        /// Allowed age
        deadline_secs: u64,
    },

    /// The transaction did not confirm on-chain.
    #[error("transaction not confirmed on-chain: {reason}")]
    NotConfirmed {
        /// Failure reason or "timed out"
        reason: String,
    },

    /// Payment amount is insufficient for the requested resource.
    #[error("insufficient payment: got {received}, need {required}")]
    InsufficientPayment {
        /// Amount required
        required: u64,
        /// Amount received
        received: u64,
    },

    /// The proof names a different recipient.
    #[error("wrong recipient: expected {expected}, got {got}")]
    WrongRecipient {
        /// Configured recipient
        expected: String,
        /// Recipient named by the proof
        got: String,
    },

    /// A pricing rule's route pattern does not compile.
    #[error("invalid route pattern {pattern:?}: {reason}")]
    InvalidRoute {
        /// The pattern
        pattern: String,
        /// Compiler message
        reason: String,
    },

    /// A pricing rule has no price.
    #[error("pricing rule {pattern:?} needs price_lamports or price_usdc")]
    MissingPrice {
        /// The rule's pattern
        pattern: String,
    },

    /// A caller or domain spending limit denied the payment.
    #[error("spending limit exceeded: {0}")]
    SpendingLimit(String),

    /// The on-chain payment could not be made.
    #[error("payment failed: {0}")]
    PaymentFailed(String),

    /// Network/HTTP error talking to the resource server.
    #[error("http error: {0}")]
    Http(String),

    /// The request URL could not be parsed.
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl {
        /// The URL
        url: String,
        /// Parser message
        reason: String,
    },
}

impl X402Error {
    /// Returns a user-friendly suggestion for recovering from this error.
    pub fn suggestion(&self) -> &str {
        match self {
            Self::UndecodableHeader | Self::MalformedPayload { .. } => {
                "Send base64-encoded JSON {x402Version, scheme, network, payload}"
            }
            Self::MissingSignature => "Include the payment transaction signature in payload.signature",
            Self::PreviouslyRejected => "Make a new payment; this signature was already rejected",
            Self::PaymentExpired { .. } => "Pay again and present the proof before the deadline",
            Self::NotConfirmed { .. } => "Wait for the payment to confirm, then retry",
            Self::InsufficientPayment { .. } => "Pay at least the quoted max_amount_required",
            Self::WrongRecipient { .. } => "Pay the pay_to address from the payment requirement",
            Self::InvalidRoute { .. } | Self::MissingPrice { .. } => "Fix the pricing rule and reconfigure",
            Self::SpendingLimit(_) => "Raise the spending limit or wait for the daily window to reset",
            Self::PaymentFailed(_) => "Check the paying wallet's balance and policies",
            Self::Http(_) => "Check network connectivity to the resource server",
            Self::InvalidUrl { .. } => "Use an absolute http(s) URL",
        }
    }

    /// Map to the shared error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidRoute { .. } | Self::MissingPrice { .. } | Self::InvalidUrl { .. } => {
                ErrorCode::InvalidInput
            }
            Self::SpendingLimit(_) => ErrorCode::SpendingLimitExceeded,
            Self::PaymentFailed(_) => ErrorCode::TransactionFailed,
            Self::Http(_) => ErrorCode::RpcError,
            _ => ErrorCode::PaymentInvalid,
        }
    }

    /// Returns true if this error is transient and the operation may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Http(_) | Self::NotConfirmed { .. })
    }
}

impl From<reqwest::Error> for X402Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_suggestions() {
        let err = X402Error::InsufficientPayment {
            required: 100,
            received: 50,
        };
        assert!(!err.suggestion().is_empty());
        assert_eq!(err.to_string(), "insufficient payment: got 50, need 100");
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(X402Error::MissingSignature.error_code(), ErrorCode::PaymentInvalid);
        assert_eq!(
            X402Error::SpendingLimit("daily".into()).error_code(),
            ErrorCode::SpendingLimitExceeded
        );
    }

    #[test]
    fn test_error_transient() {
        assert!(X402Error::Http("timeout".into()).is_transient());
        assert!(!X402Error::PreviouslyRejected.is_transient());
    }
}
