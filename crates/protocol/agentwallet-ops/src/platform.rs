//! The assembled service set.

use std::sync::Arc;

use agentwallet_chain::ChainGateway;
use agentwallet_crypto::KeyVault;
use agentwallet_store::Store;
use agentwallet_types::{Clock, SystemClock, Tier};
use uuid::Uuid;

use crate::acp::AcpService;
use crate::approvals::ApprovalService;
use crate::config::OpsConfig;
use crate::error::OpsResult;
use crate::escrow::EscrowService;
use crate::pda::PdaWalletService;
use crate::transfer::TransactionEngine;
use crate::wallets::WalletManager;
use crate::workers::{ApprovalExpiryWorker, EscrowExpiryWorker, TxConfirmationWorker, Worker};
use crate::x402::WalletPaymentSender;

/// Every wallet service wired to one store, gateway and clock.
///
/// Cloning is cheap and clones share state, including the batch semaphore
/// and the escrow event channel.
#[derive(Clone)]
pub struct Platform {
    pub wallets: WalletManager,
    pub transactions: TransactionEngine,
    pub approvals: ApprovalService,
    pub escrows: EscrowService,
    pub acp: AcpService,
    pub pda: PdaWalletService,
    store: Arc<dyn Store>,
    chain: Arc<dyn ChainGateway>,
    clock: Arc<dyn Clock>,
    config: Arc<OpsConfig>,
}

impl Platform {
    /// Validate `config` and build the services.
    pub fn new(
        store: Arc<dyn Store>,
        chain: Arc<dyn ChainGateway>,
        clock: Arc<dyn Clock>,
        vault: KeyVault,
        config: OpsConfig,
    ) -> OpsResult<Self> {
        config.validate()?;
        let config = Arc::new(config);

        let wallets = WalletManager::new(Arc::clone(&store), Arc::clone(&chain), Arc::clone(&clock), vault);
        let transactions = TransactionEngine::new(
            Arc::clone(&store),
            Arc::clone(&chain),
            Arc::clone(&clock),
            wallets.clone(),
            Arc::clone(&config),
        );
        let approvals = ApprovalService::new(Arc::clone(&store), Arc::clone(&clock), transactions.clone());
        let escrows = EscrowService::new(
            Arc::clone(&store),
            Arc::clone(&chain),
            Arc::clone(&clock),
            wallets.clone(),
            Arc::clone(&config),
        );
        let acp = AcpService::new(Arc::clone(&store), Arc::clone(&clock));
        let pda = PdaWalletService::new(
            Arc::clone(&store),
            Arc::clone(&chain),
            Arc::clone(&clock),
            wallets.clone(),
            Arc::clone(&config),
        );

        Ok(Self {
            wallets,
            transactions,
            approvals,
            escrows,
            acp,
            pda,
            store,
            chain,
            clock,
            config,
        })
    }

    /// Build with the system clock.
    pub fn with_system_clock(
        store: Arc<dyn Store>,
        chain: Arc<dyn ChainGateway>,
        vault: KeyVault,
        config: OpsConfig,
    ) -> OpsResult<Self> {
        Self::new(store, chain, Arc::new(SystemClock), vault, config)
    }

    pub fn config(&self) -> &OpsConfig {
        &self.config
    }

    /// An x402 payer drawing on `wallet_id`.
    pub fn payment_sender(&self, org_id: Uuid, tier: Tier, wallet_id: Uuid) -> WalletPaymentSender {
        WalletPaymentSender::new(
            self.transactions.clone(),
            Arc::clone(&self.clock),
            org_id,
            tier,
            wallet_id,
        )
    }

    /// The confirmation, escrow-expiry and approval-expiry workers.
    pub fn workers(&self) -> Vec<Arc<dyn Worker>> {
        let schedule = self.config.workers;
        let confirmations: Arc<dyn Worker> = Arc::new(TxConfirmationWorker::new(
            Arc::clone(&self.store),
            Arc::clone(&self.chain),
            Arc::clone(&self.clock),
            schedule,
        ));
        let escrow_expiry: Arc<dyn Worker> = Arc::new(EscrowExpiryWorker::new(
            self.escrows.clone(),
            Arc::clone(&self.clock),
            schedule.escrow_expiry_interval,
        ));
        let approval_expiry: Arc<dyn Worker> = Arc::new(ApprovalExpiryWorker::new(
            self.approvals.clone(),
            Arc::clone(&self.clock),
            schedule.approval_expiry_interval,
        ));
        vec![confirmations, escrow_expiry, approval_expiry]
    }
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .finish()
    }
}
