//! Filter and result types used by the store traits.

use agentwallet_types::{AcpPhase, ApprovalRequest, TxStatus, WalletType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Filter for listing wallets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletFilter {
    pub agent_id: Option<Uuid>,
    pub wallet_type: Option<WalletType>,
    /// Only active wallets
    pub active_only: bool,
}

impl WalletFilter {
    pub fn active() -> Self {
        Self {
            active_only: true,
            ..Self::default()
        }
    }
}

/// Filter for listing transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFilter {
    pub agent_id: Option<Uuid>,
    pub wallet_id: Option<Uuid>,
    pub status: Option<TxStatus>,
}

/// Filter for listing ACP jobs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcpJobFilter {
    /// Jobs where this agent is buyer, seller or evaluator
    pub agent_id: Option<Uuid>,
    pub phase: Option<AcpPhase>,
}

/// Filter for listing resource offerings. Only active offerings are listed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferingFilter {
    pub org_id: Option<Uuid>,
    pub agent_id: Option<Uuid>,
}

/// Result of an atomic approval decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionOutcome {
    /// The decision was recorded; the request may now be settled.
    Recorded(ApprovalRequest),
    /// The request was no longer pending; nothing changed.
    NotPending(ApprovalRequest),
    /// This approver already voted; nothing changed.
    DuplicateApprover(ApprovalRequest),
}
