//! Helper functions for creating test fixtures.
//!
//! Provides convenience functions for generating vaults, organizations,
//! stores and custodial wallets that are already persisted and funded on a
//! [`MockChain`].

use std::sync::Arc;

use agentwallet_crypto::{KeyVault, Keypair, Pubkey};
use agentwallet_store::{MemoryStore, SqliteStore, Store};
use agentwallet_types::{Organization, Policy, PolicyRules, Tier, Wallet, WalletType};
use chrono::{DateTime, Utc};
use tempfile::TempDir;
use uuid::Uuid;

use crate::MockChain;

/// Fixed master key so sealed fixtures are reproducible.
pub const TEST_MASTER_KEY: [u8; 32] = [42u8; 32];

/// A vault keyed with [`TEST_MASTER_KEY`].
pub fn test_vault() -> KeyVault {
    KeyVault::new(TEST_MASTER_KEY)
}

/// A fresh organization on the given tier.
pub fn test_org(tier: Tier) -> Organization {
    Organization::new("test-org", tier)
}

/// An empty in-memory store behind the service handle type.
pub fn memory_store() -> Arc<dyn Store> {
    Arc::new(MemoryStore::new())
}

/// A SQLite store in a temporary directory.
///
/// The directory must be kept alive for the duration of the test.
pub fn sqlite_store() -> (Arc<dyn Store>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let store = SqliteStore::open(temp_dir.path().join("agentwallet.db")).unwrap();
    (Arc::new(store), temp_dir)
}

/// A deterministic public key filled with `byte`.
pub fn pubkey(byte: u8) -> Pubkey {
    Pubkey::new([byte; 32])
}

/// Build an agent wallet around `keypair`, sealed with `vault`.
pub fn wallet_for(
    vault: &KeyVault,
    keypair: &Keypair,
    org_id: Uuid,
    agent_id: Option<Uuid>,
    created_at: DateTime<Utc>,
) -> Wallet {
    Wallet {
        id: Uuid::new_v4(),
        org_id,
        agent_id,
        address: keypair.pubkey(),
        wallet_type: WalletType::Agent,
        encrypted_key: vault.seal(keypair).unwrap(),
        label: "test-wallet".to_string(),
        is_active: true,
        created_at,
    }
}

/// Create, persist and fund an agent wallet.
///
/// The wallet's address is credited with `lamports` on `chain`.
pub async fn funded_wallet(
    store: &Arc<dyn Store>,
    chain: &MockChain,
    org_id: Uuid,
    agent_id: Option<Uuid>,
    lamports: u64,
) -> Wallet {
    let keypair = Keypair::generate();
    let wallet = wallet_for(&test_vault(), &keypair, org_id, agent_id, Utc::now());
    store.create_wallet(&wallet).await.unwrap();
    chain.set_balance(wallet.address, lamports);
    wallet
}

/// An enabled org-wide policy with only a daily cap.
pub fn daily_limit_policy(org_id: Uuid, daily_limit: u64) -> Policy {
    Policy::org_wide(
        org_id,
        "daily-cap",
        0,
        PolicyRules {
            daily_limit_lamports: Some(daily_limit),
            ..PolicyRules::default()
        },
    )
}

/// An enabled org-wide policy holding transfers above `threshold` for approval.
pub fn approval_policy(org_id: Uuid, threshold: u64) -> Policy {
    Policy::org_wide(
        org_id,
        "approval-gate",
        0,
        PolicyRules {
            require_approval_above_lamports: Some(threshold),
            ..PolicyRules::default()
        },
    )
}
