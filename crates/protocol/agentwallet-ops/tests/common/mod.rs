//! Shared harness for the operation integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use agentwallet_chain::ChainGateway;
use agentwallet_crypto::Pubkey;
use agentwallet_ops::{OpsConfig, Platform};
use agentwallet_store::Store;
use agentwallet_test_utils::{funded_wallet, memory_store, test_org, test_vault, ManualClock, MockChain};
use agentwallet_types::{Clock, Organization, Tier, Wallet};

pub const SOL: u64 = 1_000_000_000;

/// A platform over an in-memory store, a mock chain and a manual clock.
pub struct Harness {
    pub platform: Platform,
    pub store: Arc<dyn Store>,
    pub chain: MockChain,
    pub clock: ManualClock,
    pub org: Organization,
}

impl Harness {
    pub fn new(tier: Tier) -> Self {
        Self::with_config(tier, OpsConfig::default())
    }

    pub fn with_config(tier: Tier, config: OpsConfig) -> Self {
        Self::with_chain(tier, config, MockChain::new())
    }

    pub fn with_chain(tier: Tier, config: OpsConfig, chain: MockChain) -> Self {
        let store = memory_store();
        let clock = ManualClock::default();
        let gateway: Arc<dyn ChainGateway> = Arc::new(chain.clone());
        let clock_handle: Arc<dyn Clock> = Arc::new(clock.clone());
        let platform = Platform::new(Arc::clone(&store), gateway, clock_handle, test_vault(), config).unwrap();
        Self {
            platform,
            store,
            chain,
            clock,
            org: test_org(tier),
        }
    }

    pub async fn wallet(&self, lamports: u64) -> Wallet {
        funded_wallet(&self.store, &self.chain, self.org.id, None, lamports).await
    }

    pub fn tier(&self) -> Tier {
        self.org.tier
    }
}

pub fn recipient(byte: u8) -> Pubkey {
    Pubkey::new([byte; 32])
}
