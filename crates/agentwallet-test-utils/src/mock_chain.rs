//! Mock implementation of the `ChainGateway` trait for testing.
//!
//! Keeps balances, account data and signature statuses in memory, records
//! every submitted transaction, and can inject failures and latency. Native
//! system transfers in submitted transactions are applied to the in-memory
//! balances, so a test can observe funds moving.

use async_trait::async_trait;
use agentwallet_chain::{ChainError, ChainGateway, ChainResult, SignatureStatus, TokenAccount};
use agentwallet_crypto::{Hash, Pubkey, Signature};
use agentwallet_wire::program::SYSTEM_PROGRAM_ID;
use agentwallet_wire::Transaction;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct MockChainInner {
    /// Lamport balances by address.
    balances: HashMap<Pubkey, u64>,
    /// Raw account data by address.
    accounts: HashMap<Pubkey, Vec<u8>>,
    /// Token accounts by owner.
    token_accounts: HashMap<Pubkey, Vec<TokenAccount>>,
    /// Blockhash handed out by `get_latest_blockhash`.
    blockhash: Hash,
    /// Explicit statuses by signature.
    statuses: HashMap<Signature, SignatureStatus>,
    /// Status for any signature without an explicit entry.
    default_status: SignatureStatus,
    /// Errors returned by the next `send_transaction` calls, in order.
    send_failures: VecDeque<ChainError>,
    /// Errors returned by the next `get_signature_status` calls, in order.
    status_failures: VecDeque<ChainError>,
    /// When set, every call fails with this error.
    fail_all: Option<ChainError>,
    /// Every transaction accepted by `send_transaction`.
    submitted: Vec<Transaction>,
    /// Call counts by method name.
    calls: HashMap<&'static str, usize>,
    /// Artificial latency applied to every call.
    latency: Duration,
}

/// A mock implementation of the `ChainGateway` trait for testing.
///
/// Uses `Arc<Mutex<...>>` internally, so it is cheap to clone and all
/// clones share the same state.
#[derive(Clone)]
pub struct MockChain {
    inner: Arc<Mutex<MockChainInner>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the in-flight counter when a call finishes.
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockChain {
    /// Create a mock where every submitted signature confirms immediately.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockChainInner {
                balances: HashMap::new(),
                accounts: HashMap::new(),
                token_accounts: HashMap::new(),
                blockhash: Hash([42; 32]),
                statuses: HashMap::new(),
                default_status: SignatureStatus::Confirmed,
                send_failures: VecDeque::new(),
                status_failures: VecDeque::new(),
                fail_all: None,
                submitted: Vec::new(),
                calls: HashMap::new(),
                latency: Duration::ZERO,
            })),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Set the lamport balance of an address.
    pub fn with_balance(self, address: Pubkey, lamports: u64) -> Self {
        self.set_balance(address, lamports);
        self
    }

    /// Delay every call by `latency`.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.inner.lock().unwrap().latency = latency;
        self
    }

    /// Status reported for signatures without an explicit entry.
    pub fn with_default_status(self, status: SignatureStatus) -> Self {
        self.inner.lock().unwrap().default_status = status;
        self
    }

    pub fn set_balance(&self, address: Pubkey, lamports: u64) {
        self.inner.lock().unwrap().balances.insert(address, lamports);
    }

    pub fn set_account(&self, address: Pubkey, data: Vec<u8>) {
        self.inner.lock().unwrap().accounts.insert(address, data);
    }

    pub fn set_token_accounts(&self, owner: Pubkey, accounts: Vec<TokenAccount>) {
        self.inner.lock().unwrap().token_accounts.insert(owner, accounts);
    }

    pub fn set_status(&self, signature: Signature, status: SignatureStatus) {
        self.inner.lock().unwrap().statuses.insert(signature, status);
    }

    pub fn set_default_status(&self, status: SignatureStatus) {
        self.inner.lock().unwrap().default_status = status;
    }

    /// Blockhash for subsequent transactions, so a resubmission signs
    /// differently.
    pub fn set_blockhash(&self, blockhash: Hash) {
        self.inner.lock().unwrap().blockhash = blockhash;
    }

    /// Fail the next `send_transaction` call with `error`.
    pub fn fail_next_send(&self, error: ChainError) {
        self.inner.lock().unwrap().send_failures.push_back(error);
    }

    /// Fail the next `get_signature_status` call with `error`.
    pub fn fail_next_status(&self, error: ChainError) {
        self.inner.lock().unwrap().status_failures.push_back(error);
    }

    /// Fail every call with `error` until cleared with `None`.
    pub fn set_fail_all(&self, error: Option<ChainError>) {
        self.inner.lock().unwrap().fail_all = error;
    }

    // =========================================================================
    // Assertion Helpers
    // =========================================================================

    pub fn balance(&self, address: &Pubkey) -> u64 {
        self.inner
            .lock()
            .unwrap()
            .balances
            .get(address)
            .copied()
            .unwrap_or(0)
    }

    /// Every transaction accepted so far, in submission order.
    pub fn submitted(&self) -> Vec<Transaction> {
        self.inner.lock().unwrap().submitted.clone()
    }

    pub fn submitted_count(&self) -> usize {
        self.inner.lock().unwrap().submitted.len()
    }

    /// Number of calls made to `method` (the trait method name).
    pub fn calls(&self, method: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .calls
            .get(method)
            .copied()
            .unwrap_or(0)
    }

    /// Highest number of calls that were in flight at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self, method: &'static str) -> ChainResult<InFlight> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight(Arc::clone(&self.in_flight));

        let (latency, fail_all) = {
            let mut inner = self.inner.lock().unwrap();
            *inner.calls.entry(method).or_insert(0) += 1;
            (inner.latency, inner.fail_all.clone())
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        match fail_all {
            Some(err) => Err(err),
            None => Ok(guard),
        }
    }
}

/// Apply native system transfers in `tx` to `balances`.
fn apply_system_transfers(tx: &Transaction, balances: &mut HashMap<Pubkey, u64>) {
    let keys = &tx.message.account_keys;
    for ix in &tx.message.instructions {
        if keys[ix.program_id_index as usize] != SYSTEM_PROGRAM_ID
            || ix.data.len() != 12
            || ix.data[..4] != [2, 0, 0, 0]
            || ix.accounts.len() < 2
        {
            continue;
        }
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&ix.data[4..12]);
        let lamports = u64::from_le_bytes(raw);
        let from = keys[ix.accounts[0] as usize];
        let to = keys[ix.accounts[1] as usize];
        let source = balances.entry(from).or_insert(0);
        *source = source.saturating_sub(lamports);
        *balances.entry(to).or_insert(0) += lamports;
    }
}

#[async_trait]
impl ChainGateway for MockChain {
    async fn get_balance(&self, address: &Pubkey) -> ChainResult<u64> {
        let _guard = self.enter("get_balance").await?;
        Ok(self.balance(address))
    }

    async fn get_latest_blockhash(&self) -> ChainResult<Hash> {
        let _guard = self.enter("get_latest_blockhash").await?;
        Ok(self.inner.lock().unwrap().blockhash)
    }

    async fn get_account_info(&self, address: &Pubkey) -> ChainResult<Option<Vec<u8>>> {
        let _guard = self.enter("get_account_info").await?;
        Ok(self.inner.lock().unwrap().accounts.get(address).cloned())
    }

    async fn get_token_accounts(
        &self,
        owner: &Pubkey,
        mint: Option<&Pubkey>,
    ) -> ChainResult<Vec<TokenAccount>> {
        let _guard = self.enter("get_token_accounts").await?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .token_accounts
            .get(owner)
            .map(|accounts| {
                accounts
                    .iter()
                    .filter(|a| mint.map_or(true, |m| a.mint == *m))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn send_transaction(&self, wire: &[u8]) -> ChainResult<Signature> {
        let _guard = self.enter("send_transaction").await?;
        let mut inner = self.inner.lock().unwrap();
        if let Some(err) = inner.send_failures.pop_front() {
            return Err(err);
        }
        let tx = Transaction::deserialize(wire)
            .map_err(|e| ChainError::transaction_failed(format!("mock: undecodable transaction: {}", e)))?;
        if !tx.verify() {
            return Err(ChainError::transaction_failed("mock: signature verification failed"));
        }
        let signature = tx.signature();
        apply_system_transfers(&tx, &mut inner.balances);
        inner.submitted.push(tx);
        Ok(signature)
    }

    async fn get_signature_status(&self, signature: &Signature) -> ChainResult<SignatureStatus> {
        let _guard = self.enter("get_signature_status").await?;
        let mut inner = self.inner.lock().unwrap();
        if let Some(err) = inner.status_failures.pop_front() {
            return Err(err);
        }
        Ok(inner
            .statuses
            .get(signature)
            .cloned()
            .unwrap_or_else(|| inner.default_status.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentwallet_crypto::Keypair;
    use agentwallet_wire::native::system_transfer;

    fn signed_transfer(payer: &Keypair, to: Pubkey, lamports: u64) -> Vec<u8> {
        let ix = system_transfer(&payer.pubkey(), &to, lamports);
        Transaction::new_signed(&[ix], payer, Hash([1; 32]))
            .unwrap()
            .serialize()
            .unwrap()
    }

    #[tokio::test]
    async fn test_send_applies_transfer() {
        let payer = Keypair::generate();
        let to = Pubkey::new([9; 32]);
        let chain = MockChain::new().with_balance(payer.pubkey(), 1_000);

        let sig = chain.send_transaction(&signed_transfer(&payer, to, 400)).await.unwrap();
        assert_eq!(chain.balance(&payer.pubkey()), 600);
        assert_eq!(chain.balance(&to), 400);
        assert_eq!(chain.submitted()[0].signature(), sig);
        assert_eq!(
            chain.get_signature_status(&sig).await.unwrap(),
            SignatureStatus::Confirmed
        );
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let chain = MockChain::new();
        chain.fail_next_send(ChainError::network("down"));
        let payer = Keypair::generate();
        let wire = signed_transfer(&payer, Pubkey::new([1; 32]), 1);

        assert!(chain.send_transaction(&wire).await.is_err());
        assert!(chain.send_transaction(&wire).await.is_ok());
        assert_eq!(chain.calls("send_transaction"), 2);
        assert_eq!(chain.submitted_count(), 1);
    }

    #[tokio::test]
    async fn test_rejects_garbage() {
        let chain = MockChain::new();
        assert!(chain.send_transaction(&[1, 2, 3]).await.is_err());
    }
}
