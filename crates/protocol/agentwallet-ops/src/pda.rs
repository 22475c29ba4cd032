//! Program-derived agent wallets.
//!
//! The on-chain program holds the funds and enforces the spending caps;
//! the store only mirrors the account for lookups. The authority wallet's
//! public key doubles as the org key in the PDA derivation.

use std::sync::Arc;

use agentwallet_chain::{confirm_signature, ChainGateway, ConfirmationOutcome};
use agentwallet_crypto::{Pubkey, Signature};
use agentwallet_store::Store;
use agentwallet_types::constants::MAX_AGENT_SEED_LEN;
use agentwallet_types::{Clock, Page, Paged, PdaWallet, Wallet};
use agentwallet_wire::{pda::agent_wallet_pda, program, AgentWalletState};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::OpsConfig;
use crate::error::{OpsError, OpsResult};
use crate::helpers::{lamports_to_sol, require_positive, sign_and_submit};
use crate::wallets::WalletManager;

/// Outcome of a PDA transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PdaTransfer {
    pub signature: Signature,
    pub confirmed: bool,
}

/// Decoded on-chain account with its live balance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PdaAccount {
    pub pda_address: Pubkey,
    pub authority: Pubkey,
    pub org: Pubkey,
    pub agent_id: String,
    pub spending_limit_per_tx: u64,
    pub daily_limit: u64,
    pub daily_spent: u64,
    pub last_reset_day: i64,
    pub is_active: bool,
    pub bump: u8,
    pub lamports: u64,
    pub sol_balance: f64,
    /// Largest transfer the program would accept right now.
    pub available_now: u64,
}

impl PdaAccount {
    fn new(pda_address: Pubkey, state: AgentWalletState, lamports: u64, unix_timestamp: i64) -> Self {
        let available_now = state.available_now(unix_timestamp).min(lamports);
        let daily_spent = state.spent_today(unix_timestamp);
        Self {
            pda_address,
            authority: state.authority,
            org: state.org,
            agent_id: state.agent_id,
            spending_limit_per_tx: state.spending_limit_per_tx,
            daily_limit: state.daily_limit,
            daily_spent,
            last_reset_day: state.last_reset_day,
            is_active: state.is_active,
            bump: state.bump,
            lamports,
            sol_balance: lamports_to_sol(lamports),
            available_now,
        }
    }
}

/// New limits for a PDA wallet. `None` keeps the current value.
#[derive(Debug, Clone, Copy, Default)]
pub struct LimitUpdate {
    pub spending_limit_per_tx: Option<u64>,
    pub daily_limit: Option<u64>,
    pub is_active: Option<bool>,
}

/// Derive the agent wallet address for `org_pubkey` and `seed`.
pub fn derive_address(org_pubkey: &Pubkey, seed: &str) -> OpsResult<(Pubkey, u8)> {
    validate_seed(seed)?;
    Ok(agent_wallet_pda(org_pubkey, seed)?)
}

/// Fetch and decode the program account at `pda_address` as of
/// `unix_timestamp`. Needs no wallet or store.
pub async fn read_account(chain: &dyn ChainGateway, pda_address: &Pubkey, unix_timestamp: i64) -> OpsResult<PdaAccount> {
    let data = chain
        .get_account_info(pda_address)
        .await?
        .ok_or_else(|| OpsError::not_found("PDA account", pda_address))?;
    let state = AgentWalletState::decode(&data)?;
    let lamports = chain.get_balance(pda_address).await?;
    Ok(PdaAccount::new(*pda_address, state, lamports, unix_timestamp))
}

fn validate_seed(seed: &str) -> OpsResult<()> {
    if seed.is_empty() || seed.len() > MAX_AGENT_SEED_LEN {
        return Err(OpsError::validation(format!(
            "agent seed must be 1-{} bytes, got {}",
            MAX_AGENT_SEED_LEN,
            seed.len()
        )));
    }
    Ok(())
}

fn validate_limits(per_tx: u64, daily: u64) -> OpsResult<()> {
    require_positive("spending_limit_per_tx", per_tx)?;
    require_positive("daily_limit", daily)?;
    if per_tx > daily {
        return Err(OpsError::validation(format!(
            "spending_limit_per_tx ({}) exceeds daily_limit ({})",
            per_tx, daily
        )));
    }
    Ok(())
}

/// Creates and drives PDA wallets.
#[derive(Clone)]
pub struct PdaWalletService {
    store: Arc<dyn Store>,
    chain: Arc<dyn ChainGateway>,
    clock: Arc<dyn Clock>,
    wallets: WalletManager,
    config: Arc<OpsConfig>,
}

impl PdaWalletService {
    pub fn new(
        store: Arc<dyn Store>,
        chain: Arc<dyn ChainGateway>,
        clock: Arc<dyn Clock>,
        wallets: WalletManager,
        config: Arc<OpsConfig>,
    ) -> Self {
        Self {
            store,
            chain,
            clock,
            wallets,
            config,
        }
    }

    /// Create the program account and store its mirror.
    ///
    /// Confirmation is best-effort: an unconfirmed creation is logged and
    /// the mirror is stored anyway.
    pub async fn create(
        &self,
        org_id: Uuid,
        authority_wallet_id: Uuid,
        agent_seed: &str,
        spending_limit_per_tx: u64,
        daily_limit: u64,
        agent_id: Option<Uuid>,
    ) -> OpsResult<PdaWallet> {
        validate_seed(agent_seed)?;
        validate_limits(spending_limit_per_tx, daily_limit)?;

        let authority = self.wallets.active_wallet(org_id, authority_wallet_id).await?;
        let signer = self.wallets.signer(&authority)?;
        let org_pubkey = authority.address;

        let (instruction, pda_address, bump) = program::create_agent_wallet(
            &authority.address,
            &org_pubkey,
            agent_seed,
            spending_limit_per_tx,
            daily_limit,
        )?;
        let signature = sign_and_submit(self.chain.as_ref(), &[instruction], &signer).await?;
        if !self.confirm(&signature).await {
            warn!(pda = %pda_address.short(), signature = %signature.short(), "PDA creation unconfirmed");
        }

        let wallet = PdaWallet {
            id: Uuid::new_v4(),
            org_id,
            agent_id,
            pda_address,
            authority_wallet_id,
            org_pubkey,
            agent_id_seed: agent_seed.to_string(),
            spending_limit_per_tx,
            daily_limit,
            bump,
            is_active: true,
            last_signature: Some(signature),
            created_at: self.clock.now(),
        };
        self.store.create_pda_wallet(&wallet).await?;

        info!(
            pda = %pda_address.short(),
            authority = %authority.address.short(),
            signature = %signature.short(),
            "PDA wallet created"
        );
        Ok(wallet)
    }

    /// Move `amount` lamports out of the PDA. The program enforces the caps.
    pub async fn transfer(
        &self,
        org_id: Uuid,
        pda_wallet_id: Uuid,
        recipient: Pubkey,
        amount: u64,
    ) -> OpsResult<PdaTransfer> {
        require_positive("amount", amount)?;
        let pda = self.get(org_id, pda_wallet_id).await?;
        let authority = self.authority(&pda).await?;
        let signer = self.wallets.signer(&authority)?;

        let instruction = program::transfer_with_limit(
            &authority.address,
            &pda.pda_address,
            self.config.platform_wallet.as_ref(),
            &recipient,
            amount,
        )?;
        let signature = sign_and_submit(self.chain.as_ref(), &[instruction], &signer).await?;
        let confirmed = self.confirm(&signature).await;

        info!(
            pda = %pda.pda_address.short(),
            recipient = %recipient.short(),
            amount,
            signature = %signature.short(),
            confirmed,
            "PDA transfer"
        );
        Ok(PdaTransfer { signature, confirmed })
    }

    /// Change the on-chain limits, then mirror them locally.
    pub async fn update_limits(&self, org_id: Uuid, pda_wallet_id: Uuid, update: LimitUpdate) -> OpsResult<PdaWallet> {
        let mut pda = self.get(org_id, pda_wallet_id).await?;
        let per_tx = update.spending_limit_per_tx.unwrap_or(pda.spending_limit_per_tx);
        let daily = update.daily_limit.unwrap_or(pda.daily_limit);
        let is_active = update.is_active.unwrap_or(pda.is_active);
        validate_limits(per_tx, daily)?;

        let authority = self.authority(&pda).await?;
        let signer = self.wallets.signer(&authority)?;
        let instruction = program::update_limits(&authority.address, &pda.pda_address, per_tx, daily, is_active);
        let signature = sign_and_submit(self.chain.as_ref(), &[instruction], &signer).await?;
        if !self.confirm(&signature).await {
            warn!(pda = %pda.pda_address.short(), signature = %signature.short(), "Limit update unconfirmed");
        }

        pda.spending_limit_per_tx = per_tx;
        pda.daily_limit = daily;
        pda.is_active = is_active;
        pda.last_signature = Some(signature);
        self.store.update_pda_wallet(&pda).await?;

        info!(
            pda = %pda.pda_address.short(),
            spending_limit_per_tx = per_tx,
            daily_limit = daily,
            is_active,
            "PDA limits updated"
        );
        Ok(pda)
    }

    /// Fetch and decode the program account at `pda_address`.
    pub async fn read_state(&self, pda_address: &Pubkey) -> OpsResult<PdaAccount> {
        read_account(self.chain.as_ref(), pda_address, self.clock.now().timestamp()).await
    }

    pub async fn get(&self, org_id: Uuid, pda_wallet_id: Uuid) -> OpsResult<PdaWallet> {
        self.store
            .get_pda_wallet(org_id, pda_wallet_id)
            .await?
            .ok_or_else(|| OpsError::not_found("PDA wallet", pda_wallet_id))
    }

    pub async fn list(&self, org_id: Uuid, page: Page) -> OpsResult<Paged<PdaWallet>> {
        Ok(self.store.list_pda_wallets(org_id, page).await?)
    }

    async fn authority(&self, pda: &PdaWallet) -> OpsResult<Wallet> {
        self.wallets.active_wallet(pda.org_id, pda.authority_wallet_id).await
    }

    async fn confirm(&self, signature: &Signature) -> bool {
        matches!(
            confirm_signature(self.chain.as_ref(), signature, &self.config.confirm).await,
            ConfirmationOutcome::Confirmed
        )
    }
}

impl std::fmt::Debug for PdaWalletService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdaWalletService").field("wallets", &self.wallets).finish()
    }
}
