//! Background workers.
//!
//! Each worker is a named periodic `tick` driven by [`run_worker`] until the
//! shutdown channel flips to `true`. A failing tick is logged and the loop
//! carries on with the next one.

use std::sync::Arc;
use std::time::Duration;

use agentwallet_chain::{ChainGateway, SignatureStatus};
use agentwallet_store::Store;
use agentwallet_types::{Clock, Transaction, TxStatus};
use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::approvals::ApprovalService;
use crate::config::WorkerConfig;
use crate::error::OpsResult;
use crate::escrow::EscrowService;

/// A periodic background job.
#[async_trait]
pub trait Worker: Send + Sync {
    fn name(&self) -> &'static str;

    fn interval(&self) -> Duration;

    /// Run one pass. Returns the number of records changed.
    async fn tick(&self) -> OpsResult<usize>;
}

/// Drive `worker` until `shutdown_rx` turns `true` or its sender is dropped.
///
/// The first tick runs immediately.
pub async fn run_worker(worker: Arc<dyn Worker>, mut shutdown_rx: watch::Receiver<bool>) {
    let mut ticker = interval(worker.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(worker = worker.name(), interval = ?worker.interval(), "Worker started");

    loop {
        tokio::select! {
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                match worker.tick().await {
                    Ok(0) => {}
                    Ok(changed) => debug!(worker = worker.name(), changed, "Worker tick"),
                    Err(e) => error!(worker = worker.name(), error = %e, "Worker tick failed"),
                }
            }
        }
    }

    info!(worker = worker.name(), "Worker stopped");
}

/// Spawn each worker on its own task.
pub fn spawn_workers(workers: Vec<Arc<dyn Worker>>, shutdown_rx: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
    workers
        .into_iter()
        .map(|worker| tokio::spawn(run_worker(worker, shutdown_rx.clone())))
        .collect()
}

// =============================================================================
// Transaction confirmation
// =============================================================================

/// Settles submitted transactions.
///
/// Each tick polls the signature status of up to `limit` submitted
/// transactions, oldest first. Confirmed and failed statuses are recorded;
/// anything still pending past `timeout` is marked `timeout`. Timed-out
/// records are polled as well, so a late confirmation is still picked up.
pub struct TxConfirmationWorker {
    store: Arc<dyn Store>,
    chain: Arc<dyn ChainGateway>,
    clock: Arc<dyn Clock>,
    config: WorkerConfig,
}

impl TxConfirmationWorker {
    pub fn new(
        store: Arc<dyn Store>,
        chain: Arc<dyn ChainGateway>,
        clock: Arc<dyn Clock>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            store,
            chain,
            clock,
            config,
        }
    }

    async fn settle(&self, mut tx: Transaction) -> OpsResult<bool> {
        let Some(signature) = tx.signature else {
            warn!(tx_id = %tx.id, status = %tx.status, "Transaction has no signature");
            return Ok(false);
        };

        let status = match self.chain.get_signature_status(&signature).await {
            Ok(status) => status,
            Err(e) => {
                debug!(tx_id = %tx.id, error = %e, "Status poll failed");
                return Ok(false);
            }
        };

        let now = self.clock.now();
        match status {
            SignatureStatus::Confirmed => {
                tx.status = TxStatus::Confirmed;
                tx.confirmed_at = Some(now);
                tx.error = None;
                info!(tx_id = %tx.id, signature = %signature.short(), "Transaction confirmed");
            }
            SignatureStatus::Failed(reason) => {
                tx.status = TxStatus::Failed;
                tx.error = Some(reason);
                warn!(tx_id = %tx.id, signature = %signature.short(), "Transaction failed on-chain");
            }
            SignatureStatus::Pending => {
                let expired = (now - tx.created_at)
                    .to_std()
                    .map(|age| age >= self.config.tx_timeout)
                    .unwrap_or(false);
                if tx.status != TxStatus::Submitted || !expired {
                    return Ok(false);
                }
                tx.status = TxStatus::Timeout;
                tx.error = Some(format!("not confirmed within {:?}", self.config.tx_timeout));
                warn!(tx_id = %tx.id, signature = %signature.short(), "Transaction confirmation timed out");
            }
        }

        self.store.update_transaction(&tx).await?;
        Ok(true)
    }
}

#[async_trait]
impl Worker for TxConfirmationWorker {
    fn name(&self) -> &'static str {
        "tx_confirmation"
    }

    fn interval(&self) -> Duration {
        self.config.tx_confirmation_interval
    }

    async fn tick(&self) -> OpsResult<usize> {
        let limit = self.config.tx_confirmation_limit;
        let mut pending = self.store.list_by_status(TxStatus::Submitted, limit).await?;
        pending.extend(self.store.list_by_status(TxStatus::Timeout, limit).await?);

        let mut changed = 0;
        for tx in pending {
            let tx_id = tx.id;
            match self.settle(tx).await {
                Ok(true) => changed += 1,
                Ok(false) => {}
                Err(e) => error!(tx_id = %tx_id, error = %e, "Failed to record transaction status"),
            }
        }
        Ok(changed)
    }
}

// =============================================================================
// Expiry sweeps
// =============================================================================

/// Expires overdue escrows.
pub struct EscrowExpiryWorker {
    escrows: EscrowService,
    clock: Arc<dyn Clock>,
    every: Duration,
}

impl EscrowExpiryWorker {
    pub fn new(escrows: EscrowService, clock: Arc<dyn Clock>, every: Duration) -> Self {
        Self { escrows, clock, every }
    }
}

#[async_trait]
impl Worker for EscrowExpiryWorker {
    fn name(&self) -> &'static str {
        "escrow_expiry"
    }

    fn interval(&self) -> Duration {
        self.every
    }

    async fn tick(&self) -> OpsResult<usize> {
        Ok(self.escrows.expire_stale(self.clock.now()).await?.len())
    }
}

/// Expires overdue approval requests.
pub struct ApprovalExpiryWorker {
    approvals: ApprovalService,
    clock: Arc<dyn Clock>,
    every: Duration,
}

impl ApprovalExpiryWorker {
    pub fn new(approvals: ApprovalService, clock: Arc<dyn Clock>, every: Duration) -> Self {
        Self {
            approvals,
            clock,
            every,
        }
    }
}

#[async_trait]
impl Worker for ApprovalExpiryWorker {
    fn name(&self) -> &'static str {
        "approval_expiry"
    }

    fn interval(&self) -> Duration {
        self.every
    }

    async fn tick(&self) -> OpsResult<usize> {
        Ok(self.approvals.expire_stale(self.clock.now()).await?.len())
    }
}
