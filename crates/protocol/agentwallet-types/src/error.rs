//! Error codes shared across AgentWallet crates.
//!
//! Every operational error maps onto one of these stable numeric codes so
//! callers (HTTP layers, SDKs, the CLI) can decide whether to retry, adjust
//! the request, or escalate to a human.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable error codes, grouped by range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
#[non_exhaustive]
pub enum ErrorCode {
    // =========================================================================
    // Validation Errors (0x0100 - 0x01FF)
    // =========================================================================
    /// Request shape or value is invalid
    InvalidInput = 0x0100,
    /// Address is not a valid base58 public key
    InvalidAddress = 0x0101,
    /// Amount is zero or out of range
    InvalidAmount = 0x0102,
    /// Policy rule set is malformed
    InvalidPolicy = 0x0103,
    /// Entity does not exist (or belongs to another organization)
    NotFound = 0x0104,
    /// Organization tier limit reached
    TierLimitReached = 0x0105,

    // =========================================================================
    // Policy Errors (0x0200 - 0x02FF)
    // =========================================================================
    /// A policy denied the transfer
    PolicyDenied = 0x0200,
    /// Transfer is held until a human approves it
    ApprovalRequired = 0x0201,
    /// Idempotency key reused with different parameters
    IdempotencyConflict = 0x0202,

    // =========================================================================
    // Funds Errors (0x0300 - 0x03FF)
    // =========================================================================
    /// Source balance cannot cover amount plus fees
    InsufficientBalance = 0x0300,
    /// Transaction was rejected on-chain
    TransactionFailed = 0x0301,

    // =========================================================================
    // State Errors (0x0400 - 0x04FF)
    // =========================================================================
    /// Requested state transition is not allowed
    InvalidStateTransition = 0x0400,

    // =========================================================================
    // Chain Errors (0x0500 - 0x05FF)
    // =========================================================================
    /// RPC endpoint error (transient)
    RpcError = 0x0500,
    /// Retries exhausted against the RPC endpoint
    RetryExhausted = 0x0501,
    /// Transaction was not confirmed in time
    ConfirmationTimeout = 0x0502,
    /// On-chain account bytes could not be decoded
    DecodeError = 0x0503,

    // =========================================================================
    // Payment Protocol Errors (0x0600 - 0x06FF)
    // =========================================================================
    /// Resource requires an x402 payment
    PaymentRequired = 0x0600,
    /// Payment proof was rejected
    PaymentInvalid = 0x0601,
    /// Client-side spending limit exceeded
    SpendingLimitExceeded = 0x0602,

    // =========================================================================
    // Internal Errors (0xFF00 - 0xFFFF)
    // =========================================================================
    /// Persistence layer failure
    StorageError = 0xFF00,
    /// Unexpected internal error
    InternalError = 0xFFFF,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Returns true if the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RpcError | Self::RetryExhausted | Self::ConfirmationTimeout
        )
    }

    /// Get the error category name based on the code range.
    pub fn category(&self) -> &'static str {
        match self.code() {
            0x0100..=0x01FF => "Validation",
            0x0200..=0x02FF => "Policy",
            0x0300..=0x03FF => "Funds",
            0x0400..=0x04FF => "State",
            0x0500..=0x05FF => "Chain",
            0x0600..=0x06FF => "Payment",
            _ => "Internal",
        }
    }

    /// Get a user-facing hint for recovering from this error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::InvalidInput => Some("Check the request fields and try again."),
            Self::InvalidAddress => Some("Addresses must be base58-encoded 32-byte public keys."),
            Self::InvalidAmount => Some("Amounts must be positive integers in the smallest unit."),
            Self::InvalidPolicy => Some("Fix the policy rules (HH:MM times, known timezone, non-zero caps)."),
            Self::NotFound => Some("Verify the id and that it belongs to your organization."),
            Self::TierLimitReached => Some("Upgrade the organization tier or deactivate unused wallets."),
            Self::PolicyDenied => Some("Adjust the amount or destination, or update the policy."),
            Self::ApprovalRequired => Some("Ask an approver to approve the pending request, then execute it."),
            Self::IdempotencyConflict => Some("Use a new idempotency key for a different request."),
            Self::InsufficientBalance => Some("Fund the wallet to cover amount, platform fee and network fee."),
            Self::TransactionFailed => Some("Inspect the on-chain error; the transfer did not happen."),
            Self::InvalidStateTransition => Some("Check the current state; only listed transitions are allowed."),
            Self::RpcError => Some("The RPC endpoint is unavailable. Retry shortly."),
            Self::RetryExhausted => Some("The RPC endpoint kept failing. Check connectivity or switch endpoints."),
            Self::ConfirmationTimeout => Some("Status unknown. The confirmation worker will settle it later."),
            Self::DecodeError => Some("Account data is not an agent wallet account."),
            Self::PaymentRequired => Some("Attach an X-PAYMENT header with a valid payment proof."),
            Self::PaymentInvalid => Some("Send a fresh, confirmed payment for at least the quoted amount."),
            Self::SpendingLimitExceeded => Some("Raise the per-domain limit or wait for the daily window to reset."),
            Self::StorageError => Some("A storage error occurred. Check the database and retry."),
            Self::InternalError => Some("An internal error occurred. Please report this issue."),
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::InvalidAddress => "INVALID_ADDRESS",
            Self::InvalidAmount => "INVALID_AMOUNT",
            Self::InvalidPolicy => "INVALID_POLICY",
            Self::NotFound => "NOT_FOUND",
            Self::TierLimitReached => "TIER_LIMIT_REACHED",
            Self::PolicyDenied => "POLICY_DENIED",
            Self::ApprovalRequired => "APPROVAL_REQUIRED",
            Self::IdempotencyConflict => "IDEMPOTENCY_CONFLICT",
            Self::InsufficientBalance => "INSUFFICIENT_BALANCE",
            Self::TransactionFailed => "TRANSACTION_FAILED",
            Self::InvalidStateTransition => "INVALID_STATE_TRANSITION",
            Self::RpcError => "RPC_ERROR",
            Self::RetryExhausted => "RETRY_EXHAUSTED",
            Self::ConfirmationTimeout => "CONFIRMATION_TIMEOUT",
            Self::DecodeError => "DECODE_ERROR",
            Self::PaymentRequired => "PAYMENT_REQUIRED",
            Self::PaymentInvalid => "PAYMENT_INVALID",
            Self::SpendingLimitExceeded => "SPENDING_LIMIT_EXCEEDED",
            Self::StorageError => "STORAGE_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        };
        f.write_str(name)
    }
}

/// Returned when a string does not name a variant of one of the data-model
/// enums.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}
