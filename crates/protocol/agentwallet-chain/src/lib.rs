//! Solana chain access for AgentWallet.
//!
//! This crate is the only place that talks to a Solana node. It provides:
//!
//! - [`ChainGateway`]: the trait the rest of the workspace programs against
//! - [`RpcGateway`]: a JSON-RPC implementation over HTTP
//! - [`RetryPolicy`]: exponential backoff with jitter around every call
//! - [`confirm_signature`]: bounded polling until a transaction settles
//!
//! # Error Handling
//!
//! Transport failures, timeouts, JSON-RPC error objects and malformed
//! responses are retried. A preflight simulation failure (`-32002`) is
//! terminal and surfaces as [`ChainError::TransactionFailed`]. When retries
//! run out the last error is wrapped in [`ChainError::RetryExhausted`].
//!
//! # Example
//!
//! ```no_run
//! use agentwallet_chain::{ChainGateway, RpcConfig, RpcGateway};
//! use agentwallet_crypto::Pubkey;
//!
//! # async fn demo() -> agentwallet_chain::ChainResult<()> {
//! let rpc = RpcGateway::new(RpcConfig::with_url("http://127.0.0.1:8899"))?;
//! let lamports = rpc.get_balance(&Pubkey::default()).await?;
//! println!("{} lamports", lamports);
//! # Ok(())
//! # }
//! ```

mod config;
mod confirm;
mod error;
mod retry;
mod rpc;
mod traits;

pub use config::{millis_serde, ConfirmConfig, RetryConfig, RpcConfig, SolanaNetwork};
pub use confirm::{confirm_signature, ConfirmationOutcome};
pub use error::{ChainError, ChainResult, RPC_PREFLIGHT_FAILURE};
pub use retry::RetryPolicy;
pub use rpc::RpcGateway;
pub use traits::{ChainGateway, SignatureStatus, TokenAccount};
