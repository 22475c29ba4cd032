//! Wallet operations for AgentWallet.
//!
//! This crate is the orchestration layer. It combines the foundation crates
//! (store, chain, policy, econ, wire, crypto) into the services an operator
//! or API server calls.
//!
//! # Module Organization
//!
//! - [`error`] - Operation error type and stable error codes
//! - [`config`] - Operation and worker configuration
//! - [`wallets`] - Custodial wallet creation, lookup and balances
//! - [`transfer`] - Policy-enforced transfers and bounded batches
//! - [`approvals`] - Human sign-off for held transfers
//! - [`escrow`] - Escrow state machine and event channel
//! - [`acp`] - Agent Commerce Protocol jobs and memos
//! - [`pda`] - Program-derived agent wallets
//! - [`workers`] - Confirmation and expiry workers
//! - [`x402`] - x402 payments from a custodial wallet
//! - [`platform`] - All services wired together
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use agentwallet_crypto::KeyVault;
//! use agentwallet_chain::{RpcConfig, RpcGateway};
//! use agentwallet_ops::{OpsConfig, Platform};
//! use agentwallet_store::SqliteStore;
//! use agentwallet_types::{Tier, TransferRequest, WalletType};
//!
//! let store = Arc::new(SqliteStore::open("agentwallet.db")?);
//! let chain = Arc::new(RpcGateway::new(RpcConfig::default())?);
//! let vault = KeyVault::from_base64(&std::env::var("AGENTWALLET_MASTER_KEY")?)?;
//! let platform = Platform::with_system_clock(store, chain, vault, OpsConfig::default())?;
//!
//! let wallet = platform
//!     .wallets
//!     .create_wallet(org_id, Tier::Free, None, WalletType::Agent, None)
//!     .await?;
//! let tx = platform
//!     .transactions
//!     .transfer(org_id, Tier::Free, TransferRequest::sol(wallet.id, recipient, 1_000_000))
//!     .await?;
//! ```
//!
//! # Transfer outcomes
//!
//! A transfer either returns a `submitted` record, or fails with one of:
//!
//! - `PolicyDenied`: a spend policy said no
//! - `ApprovalRequired`: the transfer is parked as an approval request;
//!   approve it and call [`ApprovalService::execute_approved`]
//! - `IdempotencyConflict`: the key was used for a different transfer
//! - `InsufficientBalance` or a chain error: the record is kept as `failed`
//!
//! The [`TxConfirmationWorker`] later moves submitted records to
//! `confirmed`, `failed` or `timeout`.

pub mod acp;
pub mod approvals;
pub mod config;
pub mod error;
pub mod escrow;
pub mod helpers;
pub mod pda;
pub mod platform;
pub mod transfer;
pub mod wallets;
pub mod workers;
pub mod x402;

// Error types
pub use error::{OpsError, OpsResult};

// Configuration
pub use config::{OpsConfig, WorkerConfig};

// Services
pub use acp::{AcpService, NewJob, NewOffering};
pub use approvals::ApprovalService;
pub use escrow::{EscrowEvent, EscrowService, NewEscrow};
pub use pda::{derive_address, read_account, LimitUpdate, PdaAccount, PdaTransfer, PdaWalletService};
pub use platform::Platform;
pub use transfer::{BatchReport, TransactionEngine};
pub use wallets::{WalletBalance, WalletManager};
pub use x402::WalletPaymentSender;

// Workers
pub use workers::{
    run_worker, spawn_workers, ApprovalExpiryWorker, EscrowExpiryWorker, TxConfirmationWorker, Worker,
};

// Helper functions
pub use helpers::{lamports_to_sol, parse_address};
