//! Chain gateway trait definition.

use async_trait::async_trait;
use agentwallet_crypto::{Hash, Pubkey, Signature};
use serde::{Deserialize, Serialize};

use crate::error::ChainResult;

/// Status of a submitted transaction as reported by the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum SignatureStatus {
    /// Not yet seen, or seen below the requested commitment
    Pending,
    /// Reached `confirmed` or `finalized` without error
    Confirmed,
    /// Landed with an on-chain error
    Failed(String),
}

impl SignatureStatus {
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// An SPL token account owned by a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAccount {
    /// Token account address
    pub address: Pubkey,
    /// Token mint
    pub mint: Pubkey,
    /// Raw amount in the token's smallest unit
    pub amount: u64,
    /// Mint decimals
    pub decimals: u8,
}

/// Trait for the chain operations AgentWallet needs.
///
/// Abstracts the Solana JSON-RPC node, allowing for:
/// - [`RpcGateway`](crate::RpcGateway) against a real cluster
/// - An in-memory mock for tests
///
/// Implementations apply their own retry policy; callers see only the final
/// outcome.
#[async_trait]
pub trait ChainGateway: Send + Sync {
    // =========================================================================
    // Reads
    // =========================================================================

    /// Native balance in lamports.
    async fn get_balance(&self, address: &Pubkey) -> ChainResult<u64>;

    /// A recent blockhash to build transactions against.
    async fn get_latest_blockhash(&self) -> ChainResult<Hash>;

    /// Raw account data, or `None` if the account does not exist.
    async fn get_account_info(&self, address: &Pubkey) -> ChainResult<Option<Vec<u8>>>;

    /// Token accounts owned by `owner`, optionally filtered to one mint.
    async fn get_token_accounts(
        &self,
        owner: &Pubkey,
        mint: Option<&Pubkey>,
    ) -> ChainResult<Vec<TokenAccount>>;

    // =========================================================================
    // Submission
    // =========================================================================

    /// Submit a serialized, signed transaction.
    ///
    /// Returns the transaction signature as reported by the node.
    async fn send_transaction(&self, wire: &[u8]) -> ChainResult<Signature>;

    /// Current status of a submitted transaction.
    async fn get_signature_status(&self, signature: &Signature) -> ChainResult<SignatureStatus>;
}
