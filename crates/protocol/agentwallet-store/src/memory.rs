//! In-memory store.
//!
//! Backs every store trait with maps behind one `tokio::sync::RwLock`.
//! Writes that must be atomic (idempotency keys, approval decisions,
//! compare-and-update) run under a single write guard.

use std::collections::HashMap;

use agentwallet_crypto::Pubkey;
use agentwallet_types::{
    AcpJob, AcpMemo, AcpPhase, ApprovalDecision, ApprovalRequest, ApprovalStatus, Escrow,
    EscrowStatus, Page, Paged, PdaWallet, Policy, ResourceOffering, Transaction, TxStatus, Wallet,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::traits::{
    AcpStore, ApprovalStore, EscrowStore, OfferingStore, PdaWalletStore, PolicyStore,
    TransactionStore, WalletStore,
};
use crate::types::{AcpJobFilter, DecisionOutcome, OfferingFilter, TransactionFilter, WalletFilter};

/// A record plus its insertion sequence, used to break `created_at` ties.
#[derive(Debug, Clone)]
struct Row<T> {
    seq: u64,
    value: T,
}

/// Map of rows keyed by id.
#[derive(Debug)]
struct Table<T> {
    rows: HashMap<Uuid, Row<T>>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self { rows: HashMap::new() }
    }
}

impl<T: Clone> Table<T> {
    fn insert(&mut self, seq: u64, id: Uuid, value: T) {
        self.rows.insert(id, Row { seq, value });
    }

    fn get(&self, id: &Uuid) -> Option<&T> {
        self.rows.get(id).map(|r| &r.value)
    }

    /// Replace the value of an existing row, keeping its sequence.
    fn replace(&mut self, entity: &'static str, id: Uuid, value: T) -> Result<()> {
        match self.rows.get_mut(&id) {
            Some(row) => {
                row.value = value;
                Ok(())
            }
            None => Err(StoreError::not_found(entity, id)),
        }
    }

    /// Matching values, newest first.
    fn newest_first<F, K>(&self, pred: F, created_at: K) -> Vec<T>
    where
        F: Fn(&T) -> bool,
        K: Fn(&T) -> DateTime<Utc>,
    {
        let mut rows: Vec<&Row<T>> = self.rows.values().filter(|r| pred(&r.value)).collect();
        rows.sort_by(|a, b| {
            created_at(&b.value)
                .cmp(&created_at(&a.value))
                .then(b.seq.cmp(&a.seq))
        });
        rows.into_iter().map(|r| r.value.clone()).collect()
    }

    /// Matching values in insertion order.
    fn in_insertion_order<F>(&self, pred: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        let mut rows: Vec<&Row<T>> = self.rows.values().filter(|r| pred(&r.value)).collect();
        rows.sort_by_key(|r| r.seq);
        rows.into_iter().map(|r| r.value.clone()).collect()
    }
}

fn paged<T: Clone>(items: Vec<T>, page: Page) -> Paged<T> {
    Paged {
        total: items.len() as u64,
        items: page.slice(&items),
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    seq: u64,
    wallets: Table<Wallet>,
    transactions: Table<Transaction>,
    /// (org, idempotency key) -> transaction id
    idempotency: HashMap<(Uuid, String), Uuid>,
    policies: Table<Policy>,
    approvals: Table<ApprovalRequest>,
    escrows: Table<Escrow>,
    jobs: Table<AcpJob>,
    memos: Table<AcpMemo>,
    offerings: Table<ResourceOffering>,
    pda_wallets: Table<PdaWallet>,
}

impl MemoryState {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }
}

/// In-memory implementation of every store trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletStore for MemoryStore {
    async fn create_wallet(&self, wallet: &Wallet) -> Result<()> {
        let mut state = self.state.write().await;
        let seq = state.next_seq();
        state.wallets.insert(seq, wallet.id, wallet.clone());
        Ok(())
    }

    async fn get_wallet(&self, org_id: Uuid, id: Uuid) -> Result<Option<Wallet>> {
        let state = self.state.read().await;
        Ok(state.wallets.get(&id).filter(|w| w.org_id == org_id).cloned())
    }

    async fn update_wallet(&self, wallet: &Wallet) -> Result<()> {
        let mut state = self.state.write().await;
        state.wallets.replace("wallet", wallet.id, wallet.clone())
    }

    async fn list_wallets(&self, org_id: Uuid, filter: &WalletFilter, page: Page) -> Result<Paged<Wallet>> {
        let state = self.state.read().await;
        let items = state.wallets.newest_first(
            |w| {
                w.org_id == org_id
                    && (!filter.active_only || w.is_active)
                    && filter.agent_id.map_or(true, |a| w.agent_id == Some(a))
                    && filter.wallet_type.map_or(true, |t| w.wallet_type == t)
            },
            |w| w.created_at,
        );
        Ok(paged(items, page))
    }

    async fn count_active_wallets(&self, org_id: Uuid) -> Result<u64> {
        let state = self.state.read().await;
        Ok(state
            .wallets
            .rows
            .values()
            .filter(|r| r.value.org_id == org_id && r.value.is_active)
            .count() as u64)
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn insert_transaction(&self, tx: &Transaction) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(key) = &tx.idempotency_key {
            let slot = (tx.org_id, key.clone());
            if state.idempotency.contains_key(&slot) {
                return Err(StoreError::conflict(format!("idempotency key {} already used", key)));
            }
            state.idempotency.insert(slot, tx.id);
        }
        let seq = state.next_seq();
        state.transactions.insert(seq, tx.id, tx.clone());
        Ok(())
    }

    async fn get_transaction(&self, org_id: Uuid, id: Uuid) -> Result<Option<Transaction>> {
        let state = self.state.read().await;
        Ok(state.transactions.get(&id).filter(|t| t.org_id == org_id).cloned())
    }

    async fn find_by_idempotency_key(&self, org_id: Uuid, key: &str) -> Result<Option<Transaction>> {
        let state = self.state.read().await;
        Ok(state
            .idempotency
            .get(&(org_id, key.to_string()))
            .and_then(|id| state.transactions.get(id))
            .cloned())
    }

    async fn update_transaction(&self, tx: &Transaction) -> Result<()> {
        let mut state = self.state.write().await;
        state.transactions.replace("transaction", tx.id, tx.clone())
    }

    async fn list_transactions(
        &self,
        org_id: Uuid,
        filter: &TransactionFilter,
        page: Page,
    ) -> Result<Paged<Transaction>> {
        let state = self.state.read().await;
        let items = state.transactions.newest_first(
            |t| {
                t.org_id == org_id
                    && filter.agent_id.map_or(true, |a| t.agent_id == Some(a))
                    && filter.wallet_id.map_or(true, |w| t.wallet_id == w)
                    && filter.status.map_or(true, |s| t.status == s)
            },
            |t| t.created_at,
        );
        Ok(paged(items, page))
    }

    async fn list_by_status(&self, status: TxStatus, limit: u32) -> Result<Vec<Transaction>> {
        let state = self.state.read().await;
        let mut items = state.transactions.newest_first(|t| t.status == status, |t| t.created_at);
        items.reverse();
        items.truncate(limit as usize);
        Ok(items)
    }

    async fn spend_between(
        &self,
        wallet_id: Uuid,
        agent_id: Option<Uuid>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64> {
        let state = self.state.read().await;
        Ok(state
            .transactions
            .rows
            .values()
            .map(|r| &r.value)
            .filter(|t| {
                t.wallet_id == wallet_id
                    && t.status.counts_toward_spend()
                    && t.created_at >= from
                    && t.created_at < to
                    && agent_id.map_or(true, |a| t.agent_id == Some(a))
            })
            .fold(0u64, |sum, t| sum.saturating_add(t.amount)))
    }
}

#[async_trait]
impl PolicyStore for MemoryStore {
    async fn create_policy(&self, policy: &Policy) -> Result<()> {
        let mut state = self.state.write().await;
        let seq = state.next_seq();
        state.policies.insert(seq, policy.id, policy.clone());
        Ok(())
    }

    async fn get_policy(&self, org_id: Uuid, id: Uuid) -> Result<Option<Policy>> {
        let state = self.state.read().await;
        Ok(state.policies.get(&id).filter(|p| p.org_id == org_id).cloned())
    }

    async fn update_policy(&self, policy: &Policy) -> Result<()> {
        let mut state = self.state.write().await;
        state.policies.replace("policy", policy.id, policy.clone())
    }

    async fn delete_policy(&self, org_id: Uuid, id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.policies.get(&id).is_some_and(|p| p.org_id == org_id) {
            state.policies.rows.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn list_policies(&self, org_id: Uuid) -> Result<Vec<Policy>> {
        let state = self.state.read().await;
        Ok(state.policies.in_insertion_order(|p| p.org_id == org_id))
    }
}

#[async_trait]
impl ApprovalStore for MemoryStore {
    async fn create_approval(&self, request: &ApprovalRequest) -> Result<()> {
        let mut state = self.state.write().await;
        let seq = state.next_seq();
        state.approvals.insert(seq, request.id, request.clone());
        Ok(())
    }

    async fn get_approval(&self, org_id: Uuid, id: Uuid) -> Result<Option<ApprovalRequest>> {
        let state = self.state.read().await;
        Ok(state.approvals.get(&id).filter(|a| a.org_id == org_id).cloned())
    }

    async fn list_approvals(
        &self,
        org_id: Uuid,
        status: Option<ApprovalStatus>,
        page: Page,
    ) -> Result<Paged<ApprovalRequest>> {
        let state = self.state.read().await;
        let items = state.approvals.newest_first(
            |a| a.org_id == org_id && status.map_or(true, |s| a.status == s),
            |a| a.created_at,
        );
        Ok(paged(items, page))
    }

    async fn record_decision(
        &self,
        org_id: Uuid,
        id: Uuid,
        decision: ApprovalDecision,
    ) -> Result<DecisionOutcome> {
        let mut state = self.state.write().await;
        let mut request = match state.approvals.get(&id).filter(|a| a.org_id == org_id) {
            Some(request) => request.clone(),
            None => return Err(StoreError::not_found("approval request", id)),
        };
        if request.status != ApprovalStatus::Pending {
            return Ok(DecisionOutcome::NotPending(request));
        }
        if request.has_decided(&decision.approver) {
            return Ok(DecisionOutcome::DuplicateApprover(request));
        }
        request.apply_decision(decision);
        state.approvals.replace("approval request", id, request.clone())?;
        Ok(DecisionOutcome::Recorded(request))
    }

    async fn expire_approvals(&self, now: DateTime<Utc>) -> Result<Vec<ApprovalRequest>> {
        let mut state = self.state.write().await;
        let mut expired = Vec::new();
        for row in state.approvals.rows.values_mut() {
            let request = &mut row.value;
            if request.status == ApprovalStatus::Pending && request.expires_at < now {
                request.status = ApprovalStatus::Expired;
                request.resolved_at = Some(now);
                expired.push(request.clone());
            }
        }
        Ok(expired)
    }
}

#[async_trait]
impl EscrowStore for MemoryStore {
    async fn create_escrow(&self, escrow: &Escrow) -> Result<()> {
        let mut state = self.state.write().await;
        let seq = state.next_seq();
        state.escrows.insert(seq, escrow.id, escrow.clone());
        Ok(())
    }

    async fn get_escrow(&self, org_id: Uuid, id: Uuid) -> Result<Option<Escrow>> {
        let state = self.state.read().await;
        Ok(state.escrows.get(&id).filter(|e| e.org_id == org_id).cloned())
    }

    async fn compare_and_update_escrow(&self, escrow: &Escrow, expected: EscrowStatus) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.escrows.get(&escrow.id) {
            None => Err(StoreError::not_found("escrow", escrow.id)),
            Some(current) if current.status != expected => Ok(false),
            Some(_) => {
                state.escrows.replace("escrow", escrow.id, escrow.clone())?;
                Ok(true)
            }
        }
    }

    async fn list_escrows(
        &self,
        org_id: Uuid,
        status: Option<EscrowStatus>,
        page: Page,
    ) -> Result<Paged<Escrow>> {
        let state = self.state.read().await;
        let items = state.escrows.newest_first(
            |e| e.org_id == org_id && status.map_or(true, |s| e.status == s),
            |e| e.created_at,
        );
        Ok(paged(items, page))
    }

    async fn expire_escrows(&self, now: DateTime<Utc>) -> Result<Vec<Escrow>> {
        let mut state = self.state.write().await;
        let mut expired = Vec::new();
        for row in state.escrows.rows.values_mut() {
            let escrow = &mut row.value;
            if escrow.status.is_expirable() && escrow.expires_at < now {
                escrow.status = EscrowStatus::Expired;
                escrow.completed_at = Some(now);
                expired.push(escrow.clone());
            }
        }
        Ok(expired)
    }
}

#[async_trait]
impl AcpStore for MemoryStore {
    async fn create_job(&self, job: &AcpJob, first_memo: &AcpMemo) -> Result<()> {
        let mut state = self.state.write().await;
        let seq = state.next_seq();
        state.jobs.insert(seq, job.id, job.clone());
        let seq = state.next_seq();
        state.memos.insert(seq, first_memo.id, first_memo.clone());
        Ok(())
    }

    async fn get_job(&self, org_id: Uuid, id: Uuid) -> Result<Option<AcpJob>> {
        let state = self.state.read().await;
        Ok(state.jobs.get(&id).filter(|j| j.org_id == org_id).cloned())
    }

    async fn advance_job(&self, job: &AcpJob, expected: AcpPhase, memo: &AcpMemo) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.jobs.get(&job.id) {
            None => Err(StoreError::not_found("ACP job", job.id)),
            Some(current) if current.phase != expected => Ok(false),
            Some(_) => {
                state.jobs.replace("ACP job", job.id, job.clone())?;
                let seq = state.next_seq();
                state.memos.insert(seq, memo.id, memo.clone());
                Ok(true)
            }
        }
    }

    async fn list_jobs(&self, org_id: Uuid, filter: &AcpJobFilter, page: Page) -> Result<Paged<AcpJob>> {
        let state = self.state.read().await;
        let items = state.jobs.newest_first(
            |j| {
                j.org_id == org_id
                    && filter.phase.map_or(true, |p| j.phase == p)
                    && filter.agent_id.map_or(true, |a| {
                        j.is_party(a) || j.evaluator_agent_id == Some(a)
                    })
            },
            |j| j.created_at,
        );
        Ok(paged(items, page))
    }

    async fn append_memo(&self, memo: &AcpMemo) -> Result<()> {
        let mut state = self.state.write().await;
        let seq = state.next_seq();
        state.memos.insert(seq, memo.id, memo.clone());
        Ok(())
    }

    async fn list_memos(&self, job_id: Uuid) -> Result<Vec<AcpMemo>> {
        let state = self.state.read().await;
        Ok(state.memos.in_insertion_order(|m| m.job_id == job_id))
    }
}

#[async_trait]
impl OfferingStore for MemoryStore {
    async fn create_offering(&self, offering: &ResourceOffering) -> Result<()> {
        let mut state = self.state.write().await;
        let seq = state.next_seq();
        state.offerings.insert(seq, offering.id, offering.clone());
        Ok(())
    }

    async fn list_offerings(&self, filter: &OfferingFilter, page: Page) -> Result<Paged<ResourceOffering>> {
        let state = self.state.read().await;
        let items = state.offerings.newest_first(
            |o| {
                o.is_active
                    && filter.org_id.map_or(true, |org| o.org_id == org)
                    && filter.agent_id.map_or(true, |agent| o.agent_id == agent)
            },
            |o| o.created_at,
        );
        Ok(paged(items, page))
    }
}

#[async_trait]
impl PdaWalletStore for MemoryStore {
    async fn create_pda_wallet(&self, wallet: &PdaWallet) -> Result<()> {
        let mut state = self.state.write().await;
        let seq = state.next_seq();
        state.pda_wallets.insert(seq, wallet.id, wallet.clone());
        Ok(())
    }

    async fn get_pda_wallet(&self, org_id: Uuid, id: Uuid) -> Result<Option<PdaWallet>> {
        let state = self.state.read().await;
        Ok(state.pda_wallets.get(&id).filter(|w| w.org_id == org_id).cloned())
    }

    async fn find_pda_wallet_by_address(&self, address: &Pubkey) -> Result<Option<PdaWallet>> {
        let state = self.state.read().await;
        Ok(state
            .pda_wallets
            .rows
            .values()
            .map(|r| &r.value)
            .find(|w| w.pda_address == *address)
            .cloned())
    }

    async fn update_pda_wallet(&self, wallet: &PdaWallet) -> Result<()> {
        let mut state = self.state.write().await;
        state.pda_wallets.replace("PDA wallet", wallet.id, wallet.clone())
    }

    async fn list_pda_wallets(&self, org_id: Uuid, page: Page) -> Result<Paged<PdaWallet>> {
        let state = self.state.read().await;
        let items = state
            .pda_wallets
            .newest_first(|w| w.org_id == org_id, |w| w.created_at);
        Ok(paged(items, page))
    }
}
