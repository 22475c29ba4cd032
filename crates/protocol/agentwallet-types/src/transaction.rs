//! Transfer records.

use agentwallet_crypto::{Pubkey, Signature};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Amount;

/// What kind of movement a transaction record describes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxType {
    #[default]
    TransferSol,
    TransferToken,
    X402Payment,
    EscrowFund,
}

string_enum!(TxType {
    TransferSol => "transfer_sol",
    TransferToken => "transfer_token",
    X402Payment => "x402_payment",
    EscrowFund => "escrow_fund",
});

/// Lifecycle of a transaction record.
///
/// `pending -> submitted -> {confirmed | failed | timeout}`. A record may also
/// go straight from `pending` to `failed` when signing or sending fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    #[default]
    Pending,
    Submitted,
    Confirmed,
    Failed,
    Timeout,
}

string_enum!(TxStatus {
    Pending => "pending",
    Submitted => "submitted",
    Confirmed => "confirmed",
    Failed => "failed",
    Timeout => "timeout",
});

impl TxStatus {
    /// Whether this record counts toward rolling daily spend.
    pub fn counts_toward_spend(&self) -> bool {
        matches!(self, TxStatus::Submitted | TxStatus::Confirmed)
    }
}

/// The caller-supplied parameters of a transfer.
///
/// Approval requests snapshot this so a held transfer can be replayed
/// exactly as it was requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub wallet_id: Uuid,
    pub to_address: Pubkey,
    pub amount: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_mint: Option<Pubkey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

impl TransferRequest {
    /// A native SOL transfer with no optional fields set.
    pub fn sol(wallet_id: Uuid, to_address: Pubkey, amount: Amount) -> Self {
        Self {
            wallet_id,
            to_address,
            amount,
            token_mint: None,
            agent_id: None,
            memo: None,
            idempotency_key: None,
        }
    }

    pub fn with_agent(mut self, agent_id: Uuid) -> Self {
        self.agent_id = Some(agent_id);
        self
    }

    pub fn with_token(mut self, mint: Pubkey) -> Self {
        self.token_mint = Some(mint);
        self
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// One transfer attempt. Immutable once confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub org_id: Uuid,
    pub agent_id: Option<Uuid>,
    pub wallet_id: Uuid,
    pub tx_type: TxType,
    pub status: TxStatus,
    pub signature: Option<Signature>,
    pub from_address: Pubkey,
    pub to_address: Pubkey,
    pub amount: Amount,
    pub token_mint: Option<Pubkey>,
    pub platform_fee: Amount,
    pub idempotency_key: Option<String>,
    pub memo: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// A new `pending` record for `request` sent from `from_address`.
    pub fn pending(
        org_id: Uuid,
        tx_type: TxType,
        from_address: Pubkey,
        request: &TransferRequest,
        platform_fee: Amount,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            org_id,
            agent_id: request.agent_id,
            wallet_id: request.wallet_id,
            tx_type,
            status: TxStatus::Pending,
            signature: None,
            from_address,
            to_address: request.to_address,
            amount: request.amount,
            token_mint: request.token_mint,
            platform_fee,
            idempotency_key: request.idempotency_key.clone(),
            memo: request.memo.clone(),
            error: None,
            created_at,
            confirmed_at: None,
        }
    }

    /// Whether a replayed request targets the same transfer as this record.
    pub fn matches_request(&self, request: &TransferRequest) -> bool {
        self.wallet_id == request.wallet_id
            && self.to_address == request.to_address
            && self.amount == request.amount
            && self.token_mint == request.token_mint
    }
}
