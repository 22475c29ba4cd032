//! Error types for wallet operations.
//!
//! Every lower crate's error is wrapped here so a caller only ever matches
//! on [`OpsError`]. Each variant maps onto a stable [`ErrorCode`].

use agentwallet_chain::ChainError;
use agentwallet_crypto::CryptoError;
use agentwallet_econ::EconError;
use agentwallet_policy::PolicyError;
use agentwallet_store::StoreError;
use agentwallet_types::{ErrorCode, Tier};
use agentwallet_wire::WireError;
use thiserror::Error;
use uuid::Uuid;

/// Result type for wallet operations.
pub type OpsResult<T> = std::result::Result<T, OpsError>;

/// Errors that can occur during wallet operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OpsError {
    // =========================================================================
    // Request Errors
    // =========================================================================
    /// Bad input shape or range, rejected before policy or chain are touched.
    #[error("validation error: {0}")]
    Validation(String),

    /// The entity does not exist or belongs to another organization.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind
        entity: &'static str,
        /// Requested id or address
        id: String,
    },

    /// The organization already has as many active wallets as its tier allows.
    #[error("{tier} tier allows at most {limit} active wallets")]
    TierLimit {
        /// Organization tier
        tier: Tier,
        /// The cap
        limit: u32,
    },

    // =========================================================================
    // Policy Errors
    // =========================================================================
    /// A policy denied the transfer.
    #[error("denied by policy '{policy_name}': {reason}")]
    PolicyDenied {
        /// Name of the denying policy
        policy_name: String,
        /// Human-readable reason
        reason: String,
    },

    /// The transfer is held until a human approves it.
    #[error("approval required: request {request_id}")]
    ApprovalRequired {
        /// The approval request to decide
        request_id: Uuid,
    },

    /// An idempotency key was reused with different parameters.
    #[error("idempotency key '{key}' already used with different parameters")]
    IdempotencyConflict {
        /// The reused key
        key: String,
    },

    // =========================================================================
    // Funds Errors
    // =========================================================================
    /// The source cannot cover amount, platform fee and network fee.
    #[error("insufficient balance: {available} lamports available, {required} required")]
    InsufficientBalance {
        /// Current balance
        available: u64,
        /// Amount plus fees
        required: u64,
    },

    /// The transaction was rejected on-chain.
    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    // =========================================================================
    // State Errors
    // =========================================================================
    /// The requested transition is not in the entity's transition table.
    #[error("cannot move {entity} from '{current}' to '{target}' (allowed: {})", format_allowed(.allowed))]
    StateError {
        /// Entity kind
        entity: &'static str,
        /// Current state
        current: String,
        /// Requested state
        target: String,
        /// States reachable from `current`
        allowed: Vec<String>,
    },

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    /// Chain gateway error.
    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    /// Malformed on-chain bytes or an unencodable instruction.
    #[error("decode error: {0}")]
    Decode(#[from] WireError),

    /// Storage error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Policy validation or evaluation error.
    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),

    /// Key material could not be opened or parsed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Fee schedule error.
    #[error("econ error: {0}")]
    Econ(#[from] EconError),
}

fn format_allowed(allowed: &[String]) -> String {
    if allowed.is_empty() {
        "none".to_string()
    } else {
        allowed.join(", ")
    }
}

impl OpsError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        OpsError::Validation(msg.into())
    }

    /// Create a not-found error.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        OpsError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Create a state error for a rejected transition.
    pub fn state<S: ToString>(entity: &'static str, current: S, target: S, allowed: &[S]) -> Self {
        OpsError::StateError {
            entity,
            current: current.to_string(),
            target: target.to_string(),
            allowed: allowed.iter().map(ToString::to_string).collect(),
        }
    }

    /// Get the shared error code for this error.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            // Request errors
            Self::Validation(_) => ErrorCode::InvalidInput,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::TierLimit { .. } => ErrorCode::TierLimitReached,

            // Policy errors
            Self::PolicyDenied { .. } => ErrorCode::PolicyDenied,
            Self::ApprovalRequired { .. } => ErrorCode::ApprovalRequired,
            Self::IdempotencyConflict { .. } => ErrorCode::IdempotencyConflict,

            // Funds errors
            Self::InsufficientBalance { .. } => ErrorCode::InsufficientBalance,
            Self::TransactionFailed(_) => ErrorCode::TransactionFailed,

            // State errors
            Self::StateError { .. } => ErrorCode::InvalidStateTransition,

            // Wrapped errors
            Self::Chain(ChainError::TransactionFailed(_)) => ErrorCode::TransactionFailed,
            Self::Chain(ChainError::RetryExhausted { .. }) => ErrorCode::RetryExhausted,
            Self::Chain(ChainError::Config(_)) => ErrorCode::InternalError,
            Self::Chain(_) => ErrorCode::RpcError,
            Self::Decode(_) => ErrorCode::DecodeError,
            Self::Store(e) if e.is_not_found() => ErrorCode::NotFound,
            Self::Store(e) if e.is_conflict() => ErrorCode::IdempotencyConflict,
            Self::Store(_) => ErrorCode::StorageError,
            Self::Policy(e) => e.error_code(),
            Self::Crypto(CryptoError::InvalidBase58(_)) => ErrorCode::InvalidAddress,
            Self::Crypto(_) => ErrorCode::InternalError,
            Self::Econ(_) => ErrorCode::InternalError,
        }
    }

    /// Returns true if the same request may succeed when retried unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Chain(ChainError::RetryExhausted { .. }) => true,
            Self::Chain(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Get a user-facing suggestion for recovering from this error.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::TierLimit { .. } => {
                "Deactivate unused wallets or upgrade the organization tier."
            }
            Self::PolicyDenied { .. } => {
                "The transfer breaks a spend policy. Lower the amount, change the destination, or update the policy."
            }
            Self::ApprovalRequired { .. } => {
                "An approver must approve the request; then execute it with the approval id."
            }
            Self::StateError { .. } => {
                "The entity is not in a state that allows this action. Fetch it and check its status."
            }
            Self::Chain(e) if e.is_retryable() => "The RPC endpoint is unavailable. Retry shortly.",
            other => other
                .error_code()
                .suggestion()
                .unwrap_or("An internal error occurred. Please report this issue."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            OpsError::validation("amount must be positive").error_code(),
            ErrorCode::InvalidInput
        );
        assert_eq!(
            OpsError::IdempotencyConflict { key: "k".into() }.error_code(),
            ErrorCode::IdempotencyConflict
        );
        assert_eq!(
            OpsError::from(ChainError::transaction_failed("custom program error: 0x1771")).error_code(),
            ErrorCode::TransactionFailed
        );
        assert_eq!(
            OpsError::from(StoreError::not_found("wallet", "w1")).error_code(),
            ErrorCode::NotFound
        );
    }

    #[test]
    fn test_state_error_display() {
        let err = OpsError::state("escrow", "created", "released", &["funded"]);
        assert_eq!(
            err.to_string(),
            "cannot move escrow from 'created' to 'released' (allowed: funded)"
        );
        let terminal = OpsError::state::<&str>("escrow", "resolved", "refunded", &[]);
        assert!(terminal.to_string().contains("allowed: none"));
        assert_eq!(terminal.error_code(), ErrorCode::InvalidStateTransition);
    }

    #[test]
    fn test_retryable() {
        assert!(OpsError::from(ChainError::network("connection reset")).is_retryable());
        let exhausted = ChainError::RetryExhausted {
            attempts: 4,
            last_error: Box::new(ChainError::timeout("30s")),
        };
        assert!(OpsError::from(exhausted).is_retryable());
        assert!(!OpsError::from(ChainError::transaction_failed("reverted")).is_retryable());
        assert!(!OpsError::InsufficientBalance {
            available: 1,
            required: 2
        }
        .is_retryable());
    }

    #[test]
    fn test_suggestions() {
        assert!(OpsError::ApprovalRequired {
            request_id: Uuid::nil()
        }
        .suggestion()
        .contains("approval id"));
        assert!(OpsError::not_found("escrow", "e1").suggestion().contains("organization"));
    }
}
