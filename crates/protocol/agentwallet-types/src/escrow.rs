//! Escrow records and their state machine.

use agentwallet_crypto::{Pubkey, Signature};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Amount;

/// Escrow lifecycle.
///
/// ```text
/// created ──► funded ──► released
///                │ ├───► refunded
///                │ └───► disputed ──► resolved
///                │                └─► refunded
/// created/funded ──(sweep)──► expired
/// ```
///
/// `expired` is entered only by the expiry sweep, never by a caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscrowStatus {
    #[default]
    Created,
    Funded,
    Released,
    Refunded,
    Disputed,
    Resolved,
    Expired,
}

string_enum!(EscrowStatus {
    Created => "created",
    Funded => "funded",
    Released => "released",
    Refunded => "refunded",
    Disputed => "disputed",
    Resolved => "resolved",
    Expired => "expired",
});

impl EscrowStatus {
    /// Caller-requested transitions allowed from this state.
    pub fn allowed_transitions(&self) -> &'static [EscrowStatus] {
        use EscrowStatus::*;
        match self {
            Created => &[Funded],
            Funded => &[Released, Refunded, Disputed],
            Disputed => &[Resolved, Refunded],
            Released | Refunded | Resolved | Expired => &[],
        }
    }

    pub fn can_transition_to(&self, target: EscrowStatus) -> bool {
        self.allowed_transitions().contains(&target)
    }

    /// Whether the sweep may expire an escrow in this state.
    pub fn is_expirable(&self) -> bool {
        matches!(self, EscrowStatus::Created | EscrowStatus::Funded)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

/// Funds locked between a funder and a recipient, optionally arbitrated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Escrow {
    pub id: Uuid,
    pub org_id: Uuid,
    pub funder_wallet_id: Uuid,
    pub recipient_address: Pubkey,
    pub arbiter_address: Option<Pubkey>,
    pub escrow_address: Option<Pubkey>,
    pub amount: Amount,
    pub token_mint: Option<Pubkey>,
    pub status: EscrowStatus,
    pub conditions: serde_json::Value,
    pub fund_signature: Option<Signature>,
    pub release_signature: Option<Signature>,
    pub refund_signature: Option<Signature>,
    pub dispute_reason: Option<String>,
    pub resolution_notes: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub funded_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
