//! Evaluation outcomes.

use std::fmt;

use agentwallet_crypto::Pubkey;
use uuid::Uuid;

/// Why a policy denied a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    ExceedsTransactionLimit { amount: u64, limit: u64 },
    ExceedsDailyLimit { projected: u64, limit: u64 },
    DestinationNotWhitelisted(Pubkey),
    DestinationBlacklisted(Pubkey),
    TokenNotWhitelisted(String),
    OutsideTimeWindow { start: String, end: String, timezone: String },
    /// The stored window could not be parsed; transfers fail closed.
    InvalidTimeWindow(String),
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExceedsTransactionLimit { amount, limit } => {
                write!(f, "Amount {} exceeds per-tx limit {}", amount, limit)
            }
            Self::ExceedsDailyLimit { projected, limit } => {
                write!(f, "Daily spend {} would exceed limit {}", projected, limit)
            }
            Self::DestinationNotWhitelisted(to) => {
                write!(f, "Destination {} not in whitelist", to.short())
            }
            Self::DestinationBlacklisted(to) => write!(f, "Destination {} is blacklisted", to.short()),
            Self::TokenNotWhitelisted(token) => write!(f, "Token {} not in whitelist", token),
            Self::OutsideTimeWindow { start, end, timezone } => {
                write!(f, "Outside allowed time window {}-{} {}", start, end, timezone)
            }
            Self::InvalidTimeWindow(err) => write!(f, "Invalid time window: {}", err),
        }
    }
}

/// Result of evaluating a transfer against every applicable policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    Allow,
    Deny {
        policy_id: Uuid,
        policy_name: String,
        reason: DenyReason,
    },
    /// Held for human approval. `policy_id` is the first policy whose
    /// threshold was crossed.
    RequireApproval { policy_id: Uuid },
}

impl PolicyDecision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn is_deny(&self) -> bool {
        matches!(self, Self::Deny { .. })
    }

    /// Short outcome label for logs.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny { .. } => "deny",
            Self::RequireApproval { .. } => "require_approval",
        }
    }
}
