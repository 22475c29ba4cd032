//! Custodial wallet management.
//!
//! Signing keys are generated here, sealed with the [`KeyVault`] and only
//! ever opened again inside this crate, immediately before signing.

use std::sync::Arc;

use agentwallet_chain::{ChainGateway, TokenAccount};
use agentwallet_crypto::{KeyVault, Keypair, Pubkey};
use agentwallet_store::{Store, WalletFilter};
use agentwallet_types::{Clock, Page, Paged, Tier, Wallet, WalletType};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::{OpsError, OpsResult};
use crate::helpers::lamports_to_sol;

/// Native and token balances of a wallet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletBalance {
    pub address: Pubkey,
    pub lamports: u64,
    pub sol: f64,
    pub tokens: Vec<TokenAccount>,
}

/// Creates, looks up and opens custodial wallets.
#[derive(Clone)]
pub struct WalletManager {
    store: Arc<dyn Store>,
    chain: Arc<dyn ChainGateway>,
    clock: Arc<dyn Clock>,
    vault: Arc<KeyVault>,
}

impl WalletManager {
    pub fn new(
        store: Arc<dyn Store>,
        chain: Arc<dyn ChainGateway>,
        clock: Arc<dyn Clock>,
        vault: KeyVault,
    ) -> Self {
        Self {
            store,
            chain,
            clock,
            vault: Arc::new(vault),
        }
    }

    /// Create a wallet with a fresh keypair.
    ///
    /// Fails with [`OpsError::TierLimit`] once the organization has as many
    /// active wallets as its tier allows. The label defaults to
    /// `{type}-{first 8 characters of the address}`.
    pub async fn create_wallet(
        &self,
        org_id: Uuid,
        tier: Tier,
        agent_id: Option<Uuid>,
        wallet_type: WalletType,
        label: Option<String>,
    ) -> OpsResult<Wallet> {
        if let Some(limit) = tier.wallet_cap() {
            let active = self.store.count_active_wallets(org_id).await?;
            if active >= u64::from(limit) {
                return Err(OpsError::TierLimit { tier, limit });
            }
        }

        let keypair = Keypair::generate();
        let address = keypair.pubkey();
        let label = label
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| default_label(wallet_type, &address));

        let wallet = Wallet {
            id: Uuid::new_v4(),
            org_id,
            agent_id,
            address,
            wallet_type,
            encrypted_key: self.vault.seal(&keypair)?,
            label,
            is_active: true,
            created_at: self.clock.now(),
        };
        self.store.create_wallet(&wallet).await?;

        info!(
            wallet_id = %wallet.id,
            address = %address.short(),
            wallet_type = %wallet_type,
            "Wallet created"
        );
        Ok(wallet)
    }

    pub async fn get_wallet(&self, org_id: Uuid, wallet_id: Uuid) -> OpsResult<Wallet> {
        self.store
            .get_wallet(org_id, wallet_id)
            .await?
            .ok_or_else(|| OpsError::not_found("wallet", wallet_id))
    }

    /// Like [`get_wallet`](Self::get_wallet) but also requires the wallet to
    /// be active.
    pub async fn active_wallet(&self, org_id: Uuid, wallet_id: Uuid) -> OpsResult<Wallet> {
        let wallet = self.get_wallet(org_id, wallet_id).await?;
        if !wallet.is_active {
            return Err(OpsError::validation(format!("wallet {} is not active", wallet_id)));
        }
        Ok(wallet)
    }

    /// Active wallets of the organization, optionally narrowed by agent and type.
    pub async fn list_wallets(
        &self,
        org_id: Uuid,
        agent_id: Option<Uuid>,
        wallet_type: Option<WalletType>,
        page: Page,
    ) -> OpsResult<Paged<Wallet>> {
        let filter = WalletFilter {
            agent_id,
            wallet_type,
            active_only: true,
        };
        Ok(self.store.list_wallets(org_id, &filter, page).await?)
    }

    /// Deactivate a wallet. It stops counting toward the tier cap and can no
    /// longer send.
    pub async fn deactivate_wallet(&self, org_id: Uuid, wallet_id: Uuid) -> OpsResult<Wallet> {
        let mut wallet = self.get_wallet(org_id, wallet_id).await?;
        if wallet.is_active {
            wallet.is_active = false;
            self.store.update_wallet(&wallet).await?;
            info!(wallet_id = %wallet.id, "Wallet deactivated");
        }
        Ok(wallet)
    }

    /// Live lamport balance plus every token account owned by the wallet.
    pub async fn get_balance(&self, org_id: Uuid, wallet_id: Uuid) -> OpsResult<WalletBalance> {
        let wallet = self.get_wallet(org_id, wallet_id).await?;
        let lamports = self.chain.get_balance(&wallet.address).await?;
        let tokens = self.chain.get_token_accounts(&wallet.address, None).await?;
        Ok(WalletBalance {
            address: wallet.address,
            lamports,
            sol: lamports_to_sol(lamports),
            tokens,
        })
    }

    /// Open the wallet's signing key.
    pub(crate) fn signer(&self, wallet: &Wallet) -> OpsResult<Keypair> {
        let keypair = self.vault.open(&wallet.encrypted_key)?;
        if keypair.pubkey() != wallet.address {
            return Err(OpsError::Crypto(agentwallet_crypto::CryptoError::KeyMismatch));
        }
        Ok(keypair)
    }
}

impl std::fmt::Debug for WalletManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletManager").field("clock", &self.clock).finish()
    }
}

fn default_label(wallet_type: WalletType, address: &Pubkey) -> String {
    let prefix: String = address.to_string().chars().take(8).collect();
    format!("{}-{}", wallet_type, prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_label() {
        let address: Pubkey = "So11111111111111111111111111111111111111112".parse().unwrap();
        assert_eq!(default_label(WalletType::Treasury, &address), "treasury-So111111");
    }
}
