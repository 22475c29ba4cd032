//! Custodial wallets and PDA wallet mirrors.

use agentwallet_crypto::{Pubkey, Signature};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a custodial wallet within its organization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletType {
    #[default]
    Agent,
    Treasury,
    Escrow,
}

string_enum!(WalletType {
    Agent => "agent",
    Treasury => "treasury",
    Escrow => "escrow",
});

/// A custodial ed25519 wallet.
///
/// `encrypted_key` is the sealed secret seed produced by
/// `agentwallet_crypto::KeyVault`; it is only ever opened inside the signing
/// path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: Uuid,
    pub org_id: Uuid,
    pub agent_id: Option<Uuid>,
    pub address: Pubkey,
    pub wallet_type: WalletType,
    pub encrypted_key: String,
    pub label: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Local mirror of an on-chain agent wallet PDA.
///
/// The program account is the source of truth for limits and daily spend;
/// this record is updated only after the corresponding instruction has been
/// submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdaWallet {
    pub id: Uuid,
    pub org_id: Uuid,
    pub agent_id: Option<Uuid>,
    pub pda_address: Pubkey,
    pub authority_wallet_id: Uuid,
    pub org_pubkey: Pubkey,
    pub agent_id_seed: String,
    pub spending_limit_per_tx: u64,
    pub daily_limit: u64,
    pub bump: u8,
    pub is_active: bool,
    pub last_signature: Option<Signature>,
    pub created_at: DateTime<Utc>,
}
