//! Policy-enforced transfers.
//!
//! A transfer runs through the same steps every time:
//!
//! 1. validate the request
//! 2. replay an earlier record with the same idempotency key, if any
//! 3. load the source wallet, which must be active
//! 4. evaluate spend policies (deny, hold for approval, or allow)
//! 5. compute the platform fee
//! 6. persist a `pending` record, check the balance, sign and submit
//! 7. mark the record `submitted`, or `failed` with the error
//!
//! Confirmation happens later, in the
//! [`TxConfirmationWorker`](crate::workers::TxConfirmationWorker).

use std::sync::Arc;

use agentwallet_chain::ChainGateway;
use agentwallet_crypto::{Pubkey, Signature};
use agentwallet_policy::{PolicyDecision, PolicyEngine};
use agentwallet_store::{Store, TransactionFilter};
use agentwallet_types::constants::{BASE_NETWORK_FEE_LAMPORTS, MAX_BATCH_SIZE, MAX_MEMO_LEN};
use agentwallet_types::{
    ApprovalRequest, ApprovalStatus, Clock, Page, Paged, Tier, Transaction, TransferRequest, TxStatus,
    TxType, Wallet,
};
use agentwallet_wire::native::{system_transfer, token_transfer};
use agentwallet_wire::pda::associated_token_address;
use agentwallet_wire::Instruction;
use chrono::Duration;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::OpsConfig;
use crate::error::{OpsError, OpsResult};
use crate::helpers::{require_positive, sign_and_submit};
use crate::wallets::WalletManager;

/// Per-item results of a batch, in input order.
#[derive(Debug)]
pub struct BatchReport {
    pub results: Vec<OpsResult<Transaction>>,
}

impl BatchReport {
    /// Number of transfers that produced a record.
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    /// Failed items with their input index.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &OpsError)> {
        self.results
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.as_ref().err().map(|e| (i, e)))
    }
}

/// Orchestrates transfers from custodial wallets.
///
/// Cloning is cheap; clones share the batch permits, so the concurrency
/// bound holds across every batch in the process.
#[derive(Clone)]
pub struct TransactionEngine {
    store: Arc<dyn Store>,
    chain: Arc<dyn ChainGateway>,
    clock: Arc<dyn Clock>,
    wallets: WalletManager,
    policy: PolicyEngine,
    config: Arc<OpsConfig>,
    batch_permits: Arc<Semaphore>,
}

impl TransactionEngine {
    pub fn new(
        store: Arc<dyn Store>,
        chain: Arc<dyn ChainGateway>,
        clock: Arc<dyn Clock>,
        wallets: WalletManager,
        config: Arc<OpsConfig>,
    ) -> Self {
        let policy = PolicyEngine::new(Arc::clone(&store), Arc::clone(&clock));
        let batch_permits = Arc::new(Semaphore::new(config.batch_concurrency));
        Self {
            store,
            chain,
            clock,
            wallets,
            policy,
            config,
            batch_permits,
        }
    }

    /// The policy engine this transfer path evaluates against.
    pub fn policy(&self) -> &PolicyEngine {
        &self.policy
    }

    /// Execute a transfer.
    ///
    /// Returns the `submitted` record, or the original record when the
    /// idempotency key was seen before with the same parameters.
    ///
    /// # Errors
    ///
    /// - [`OpsError::Validation`] for a zero amount, an oversized memo or an
    ///   inactive wallet
    /// - [`OpsError::PolicyDenied`] when a policy denies
    /// - [`OpsError::ApprovalRequired`] when a threshold holds the transfer;
    ///   an approval request has been stored
    /// - [`OpsError::IdempotencyConflict`] for a reused key with different
    ///   parameters
    /// - [`OpsError::InsufficientBalance`] and chain errors after the record
    ///   was persisted; the record is marked `failed`
    pub async fn transfer(&self, org_id: Uuid, tier: Tier, request: TransferRequest) -> OpsResult<Transaction> {
        self.execute(org_id, tier, request, TxType::TransferSol, None).await
    }

    /// Execute a transfer an approver already signed off on. The approval
    /// waives a require-approval outcome; a deny still wins.
    pub(crate) async fn execute_approved(
        &self,
        org_id: Uuid,
        tier: Tier,
        request: TransferRequest,
        approval_id: Uuid,
    ) -> OpsResult<Transaction> {
        self.execute(org_id, tier, request, TxType::TransferSol, Some(approval_id))
            .await
    }

    /// Execute a transfer recorded under a specific type. A plain transfer
    /// with a mint is recorded as `transfer_token`; token transfers carry no
    /// platform fee.
    pub(crate) async fn execute(
        &self,
        org_id: Uuid,
        tier: Tier,
        request: TransferRequest,
        tx_type: TxType,
        approval_id: Option<Uuid>,
    ) -> OpsResult<Transaction> {
        validate_request(&request)?;

        // A replay answers with the stored record even if the wallet has
        // since been deactivated.
        if let Some(key) = &request.idempotency_key {
            if let Some(existing) = self.store.find_by_idempotency_key(org_id, key).await? {
                return replay(existing, &request, key);
            }
        }

        let wallet = self.wallets.active_wallet(org_id, request.wallet_id).await?;

        match self.policy.evaluate(org_id, &request).await? {
            PolicyDecision::Allow => {}
            PolicyDecision::Deny {
                policy_name, reason, ..
            } => {
                warn!(
                    wallet_id = %request.wallet_id,
                    policy = %policy_name,
                    amount = request.amount,
                    reason = %reason,
                    "Transfer denied"
                );
                return Err(OpsError::PolicyDenied {
                    policy_name,
                    reason: reason.to_string(),
                });
            }
            PolicyDecision::RequireApproval { policy_id } => match approval_id {
                Some(approval_id) => {
                    debug!(approval_id = %approval_id, "Approval threshold waived by approved request");
                }
                None => {
                    let held = self.hold_for_approval(org_id, &request, policy_id).await?;
                    return Err(OpsError::ApprovalRequired { request_id: held.id });
                }
            },
        }

        let (tx_type, fee) = match (tx_type, request.token_mint) {
            (TxType::TransferSol, Some(_)) => (TxType::TransferToken, 0),
            (tx_type, Some(_)) => (tx_type, 0),
            (tx_type, None) => (tx_type, self.config.fees.fee(request.amount, tier)),
        };

        let mut tx = Transaction::pending(org_id, tx_type, wallet.address, &request, fee, self.clock.now());
        if let Err(e) = self.store.insert_transaction(&tx).await {
            // A concurrent request with the same key won the insert.
            if let (true, Some(key)) = (e.is_conflict(), &request.idempotency_key) {
                if let Some(existing) = self.store.find_by_idempotency_key(org_id, key).await? {
                    return replay(existing, &request, key);
                }
            }
            return Err(e.into());
        }

        match self.submit(&wallet, &tx).await {
            Ok(signature) => {
                tx.status = TxStatus::Submitted;
                tx.signature = Some(signature);
                self.store.update_transaction(&tx).await?;
                info!(
                    tx_id = %tx.id,
                    signature = %signature.short(),
                    amount = tx.amount,
                    fee = tx.platform_fee,
                    "Transaction submitted"
                );
                Ok(tx)
            }
            Err(e) => {
                tx.status = TxStatus::Failed;
                tx.error = Some(e.to_string());
                if let Err(store_err) = self.store.update_transaction(&tx).await {
                    error!(tx_id = %tx.id, error = %store_err, "Failed to record transaction failure");
                }
                error!(tx_id = %tx.id, error = %e, "Transaction failed");
                Err(e)
            }
        }
    }

    /// Run many transfers with bounded concurrency.
    ///
    /// Each transfer is independent; a failing item does not stop the
    /// others. At most `batch_concurrency` transfers are in flight at once,
    /// counted across every batch running through this engine.
    pub async fn batch_transfer(
        &self,
        org_id: Uuid,
        tier: Tier,
        requests: Vec<TransferRequest>,
    ) -> OpsResult<BatchReport> {
        if requests.len() > MAX_BATCH_SIZE {
            return Err(OpsError::validation(format!(
                "batch of {} transfers exceeds the maximum of {}",
                requests.len(),
                MAX_BATCH_SIZE
            )));
        }

        let count = requests.len();
        let transfers = requests.into_iter().map(|request| async move {
            let _permit = self
                .batch_permits
                .acquire()
                .await
                .map_err(|_| OpsError::validation("transfer engine is shutting down"))?;
            self.transfer(org_id, tier, request).await
        });
        let report = BatchReport {
            results: join_all(transfers).await,
        };

        info!(
            transfers = count,
            succeeded = report.succeeded(),
            "Batch transfer complete"
        );
        Ok(report)
    }

    pub async fn get_transaction(&self, org_id: Uuid, tx_id: Uuid) -> OpsResult<Transaction> {
        self.store
            .get_transaction(org_id, tx_id)
            .await?
            .ok_or_else(|| OpsError::not_found("transaction", tx_id))
    }

    /// Newest first.
    pub async fn list_transactions(
        &self,
        org_id: Uuid,
        filter: &TransactionFilter,
        page: Page,
    ) -> OpsResult<Paged<Transaction>> {
        Ok(self.store.list_transactions(org_id, filter, page).await?)
    }

    async fn hold_for_approval(
        &self,
        org_id: Uuid,
        request: &TransferRequest,
        policy_id: Uuid,
    ) -> OpsResult<ApprovalRequest> {
        let now = self.clock.now();
        let held = ApprovalRequest {
            id: Uuid::new_v4(),
            org_id,
            request: request.clone(),
            status: ApprovalStatus::Pending,
            required_approvals: self.config.required_approvals,
            decisions: Vec::new(),
            policy_id: Some(policy_id),
            reason: Some(format!(
                "Transfer of {} lamports exceeds an approval threshold",
                request.amount
            )),
            expires_at: now + Duration::hours(self.config.approval_expiry_hours),
            resolved_at: None,
            created_at: now,
        };
        self.store.create_approval(&held).await?;
        info!(
            request_id = %held.id,
            wallet_id = %request.wallet_id,
            amount = request.amount,
            "Transfer held for approval"
        );
        Ok(held)
    }

    /// Check the balance, build the instructions, sign and submit.
    async fn submit(&self, wallet: &Wallet, tx: &Transaction) -> OpsResult<Signature> {
        self.check_balance(wallet, tx).await?;
        let signer = self.wallets.signer(wallet)?;
        let instructions = self.instructions(&wallet.address, tx)?;
        sign_and_submit(self.chain.as_ref(), &instructions, &signer).await
    }

    async fn check_balance(&self, wallet: &Wallet, tx: &Transaction) -> OpsResult<()> {
        let lamports = self.chain.get_balance(&wallet.address).await?;
        let required = match tx.token_mint {
            None => tx
                .amount
                .saturating_add(tx.platform_fee)
                .saturating_add(BASE_NETWORK_FEE_LAMPORTS),
            Some(_) => BASE_NETWORK_FEE_LAMPORTS,
        };
        if lamports < required {
            return Err(OpsError::InsufficientBalance {
                available: lamports,
                required,
            });
        }

        if let Some(mint) = &tx.token_mint {
            let held: u64 = self
                .chain
                .get_token_accounts(&wallet.address, Some(mint))
                .await?
                .iter()
                .map(|a| a.amount)
                .sum();
            if held < tx.amount {
                return Err(OpsError::InsufficientBalance {
                    available: held,
                    required: tx.amount,
                });
            }
        }
        Ok(())
    }

    /// The transfer plus, when a platform wallet is configured and the fee is
    /// non-zero, the fee transfer in the same transaction.
    fn instructions(&self, from: &Pubkey, tx: &Transaction) -> OpsResult<Vec<Instruction>> {
        let mut instructions = Vec::with_capacity(2);
        match &tx.token_mint {
            Some(mint) => {
                let source = associated_token_address(from, mint)?;
                let destination = associated_token_address(&tx.to_address, mint)?;
                instructions.push(token_transfer(&source, &destination, from, tx.amount));
            }
            None => instructions.push(system_transfer(from, &tx.to_address, tx.amount)),
        }
        if let (true, Some(platform)) = (tx.platform_fee > 0, &self.config.platform_wallet) {
            instructions.push(system_transfer(from, platform, tx.platform_fee));
        }
        Ok(instructions)
    }
}

impl std::fmt::Debug for TransactionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionEngine")
            .field("batch_permits", &self.batch_permits.available_permits())
            .field("config", &self.config)
            .finish()
    }
}

fn validate_request(request: &TransferRequest) -> OpsResult<()> {
    require_positive("amount", request.amount)?;
    if let Some(memo) = &request.memo {
        if memo.len() > MAX_MEMO_LEN {
            return Err(OpsError::validation(format!(
                "memo is {} bytes; the maximum is {}",
                memo.len(),
                MAX_MEMO_LEN
            )));
        }
    }
    if let Some(key) = &request.idempotency_key {
        if key.trim().is_empty() {
            return Err(OpsError::validation("idempotency key must not be blank"));
        }
    }
    Ok(())
}

/// Return an earlier record for a replayed key, or a conflict when the
/// parameters differ.
fn replay(existing: Transaction, request: &TransferRequest, key: &str) -> OpsResult<Transaction> {
    if existing.matches_request(request) {
        debug!(tx_id = %existing.id, key, "Idempotent replay");
        Ok(existing)
    } else {
        Err(OpsError::IdempotencyConflict { key: key.to_string() })
    }
}
