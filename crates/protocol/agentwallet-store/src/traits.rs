//! Storage trait definitions.
//!
//! One async trait per entity. Every read is scoped by organization: a
//! record owned by another organization is indistinguishable from a missing
//! one. Lists return the newest records first unless noted otherwise.

use agentwallet_crypto::Pubkey;
use agentwallet_types::{
    AcpJob, AcpMemo, AcpPhase, ApprovalDecision, ApprovalRequest, ApprovalStatus, Escrow,
    EscrowStatus, Page, Paged, PdaWallet, Policy, ResourceOffering, Transaction, TxStatus, Wallet,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::types::{AcpJobFilter, DecisionOutcome, OfferingFilter, TransactionFilter, WalletFilter};

/// Storage for custodial wallets.
#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn create_wallet(&self, wallet: &Wallet) -> Result<()>;

    async fn get_wallet(&self, org_id: Uuid, id: Uuid) -> Result<Option<Wallet>>;

    /// Replace a wallet record. Fails with `NotFound` if it does not exist.
    async fn update_wallet(&self, wallet: &Wallet) -> Result<()>;

    async fn list_wallets(&self, org_id: Uuid, filter: &WalletFilter, page: Page) -> Result<Paged<Wallet>>;

    /// Number of active wallets, for tier caps.
    async fn count_active_wallets(&self, org_id: Uuid) -> Result<u64>;
}

/// Storage for transaction records.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Insert a new record.
    ///
    /// Fails with `Conflict` if another record in the same organization
    /// already carries the same idempotency key.
    async fn insert_transaction(&self, tx: &Transaction) -> Result<()>;

    async fn get_transaction(&self, org_id: Uuid, id: Uuid) -> Result<Option<Transaction>>;

    async fn find_by_idempotency_key(&self, org_id: Uuid, key: &str) -> Result<Option<Transaction>>;

    /// Replace a transaction record. Fails with `NotFound` if it does not exist.
    async fn update_transaction(&self, tx: &Transaction) -> Result<()>;

    async fn list_transactions(
        &self,
        org_id: Uuid,
        filter: &TransactionFilter,
        page: Page,
    ) -> Result<Paged<Transaction>>;

    /// Records in `status` across all organizations, oldest first.
    async fn list_by_status(&self, status: TxStatus, limit: u32) -> Result<Vec<Transaction>>;

    /// Sum of submitted and confirmed amounts out of `wallet_id` created in
    /// `[from, to)`, narrowed to `agent_id` when given.
    async fn spend_between(
        &self,
        wallet_id: Uuid,
        agent_id: Option<Uuid>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64>;
}

/// Storage for spend policies.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn create_policy(&self, policy: &Policy) -> Result<()>;

    async fn get_policy(&self, org_id: Uuid, id: Uuid) -> Result<Option<Policy>>;

    async fn update_policy(&self, policy: &Policy) -> Result<()>;

    /// Returns whether a policy was deleted.
    async fn delete_policy(&self, org_id: Uuid, id: Uuid) -> Result<bool>;

    /// Every policy of the organization in insertion order.
    async fn list_policies(&self, org_id: Uuid) -> Result<Vec<Policy>>;
}

/// Storage for approval requests.
#[async_trait]
pub trait ApprovalStore: Send + Sync {
    async fn create_approval(&self, request: &ApprovalRequest) -> Result<()>;

    async fn get_approval(&self, org_id: Uuid, id: Uuid) -> Result<Option<ApprovalRequest>>;

    async fn list_approvals(
        &self,
        org_id: Uuid,
        status: Option<ApprovalStatus>,
        page: Page,
    ) -> Result<Paged<ApprovalRequest>>;

    /// Atomically record `decision` if the request is still pending and the
    /// approver has not voted yet.
    async fn record_decision(
        &self,
        org_id: Uuid,
        id: Uuid,
        decision: ApprovalDecision,
    ) -> Result<DecisionOutcome>;

    /// Move pending requests whose `expires_at` is before `now` to
    /// `expired`, returning the updated records.
    async fn expire_approvals(&self, now: DateTime<Utc>) -> Result<Vec<ApprovalRequest>>;
}

/// Storage for escrows.
#[async_trait]
pub trait EscrowStore: Send + Sync {
    async fn create_escrow(&self, escrow: &Escrow) -> Result<()>;

    async fn get_escrow(&self, org_id: Uuid, id: Uuid) -> Result<Option<Escrow>>;

    /// Replace the record only if its stored status is still `expected`.
    ///
    /// Returns `false` when another writer changed the status first.
    async fn compare_and_update_escrow(&self, escrow: &Escrow, expected: EscrowStatus) -> Result<bool>;

    async fn list_escrows(
        &self,
        org_id: Uuid,
        status: Option<EscrowStatus>,
        page: Page,
    ) -> Result<Paged<Escrow>>;

    /// Move `created`/`funded` escrows whose `expires_at` is before `now` to
    /// `expired`, returning the updated records.
    async fn expire_escrows(&self, now: DateTime<Utc>) -> Result<Vec<Escrow>>;
}

/// Storage for ACP jobs and their memo log.
#[async_trait]
pub trait AcpStore: Send + Sync {
    /// Insert a job together with the first entry of its memo log.
    async fn create_job(&self, job: &AcpJob, first_memo: &AcpMemo) -> Result<()>;

    async fn get_job(&self, org_id: Uuid, id: Uuid) -> Result<Option<AcpJob>>;

    /// Replace the record only if its stored phase is still `expected`, and
    /// append `memo` in the same write. On `false` nothing was written.
    async fn advance_job(&self, job: &AcpJob, expected: AcpPhase, memo: &AcpMemo) -> Result<bool>;

    async fn list_jobs(&self, org_id: Uuid, filter: &AcpJobFilter, page: Page) -> Result<Paged<AcpJob>>;

    /// Append a memo. Memos are never modified afterwards.
    async fn append_memo(&self, memo: &AcpMemo) -> Result<()>;

    /// The memo log of a job in creation order.
    async fn list_memos(&self, job_id: Uuid) -> Result<Vec<AcpMemo>>;
}

/// Storage for published resource offerings.
///
/// Offerings are meant for discovery across organizations, so the list is
/// the one read that is not necessarily org-scoped.
#[async_trait]
pub trait OfferingStore: Send + Sync {
    async fn create_offering(&self, offering: &ResourceOffering) -> Result<()>;

    /// Active offerings matching `filter`, newest first.
    async fn list_offerings(&self, filter: &OfferingFilter, page: Page) -> Result<Paged<ResourceOffering>>;
}

/// Storage for PDA wallet mirrors.
#[async_trait]
pub trait PdaWalletStore: Send + Sync {
    async fn create_pda_wallet(&self, wallet: &PdaWallet) -> Result<()>;

    async fn get_pda_wallet(&self, org_id: Uuid, id: Uuid) -> Result<Option<PdaWallet>>;

    async fn find_pda_wallet_by_address(&self, address: &Pubkey) -> Result<Option<PdaWallet>>;

    async fn update_pda_wallet(&self, wallet: &PdaWallet) -> Result<()>;

    async fn list_pda_wallets(&self, org_id: Uuid, page: Page) -> Result<Paged<PdaWallet>>;
}

/// Every store trait in one bound, so services can hold `Arc<dyn Store>`.
pub trait Store:
    WalletStore
    + TransactionStore
    + PolicyStore
    + ApprovalStore
    + EscrowStore
    + AcpStore
    + OfferingStore
    + PdaWalletStore
{
}

impl<T> Store for T where
    T: WalletStore
        + TransactionStore
        + PolicyStore
        + ApprovalStore
        + EscrowStore
        + AcpStore
        + OfferingStore
        + PdaWalletStore
{
}
