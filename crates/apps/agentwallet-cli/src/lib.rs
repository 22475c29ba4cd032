//! Operator command-line interface for AgentWallet.
//!
//! This crate provides the `agentwallet` binary. It includes commands for:
//!
//! - **Setup**: Write a default configuration
//! - **Workers**: Run the confirmation and expiry workers until shutdown
//! - **PDA wallets**: Derive addresses and read on-chain account state
//! - **Chain**: Check an address balance
//! - **Economics**: Quote the platform fee for an amount and tier
//!
//! # Quick Start
//!
//! ```bash
//! # Write ~/.local/share/agentwallet/config.toml (path varies by platform)
//! agentwallet init
//!
//! # Export the printed master key, then run the workers
//! export AGENTWALLET_MASTER_KEY=...
//! agentwallet workers
//!
//! # Quote a fee
//! agentwallet fee 1000000000 --tier pro
//! ```
//!
//! # Output Formats
//!
//! All commands support `--format`:
//!
//! - `human` (default): Human-readable with colors
//! - `json`: Machine-readable JSON
//!
//! # Configuration
//!
//! Loaded from `config.toml` in the data directory. Override with `--config`,
//! or move the data directory with `AGENTWALLET_DATA_DIR`.

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod output;
pub mod signals;

// Re-export main types
pub use cli::{Cli, Commands, OutputFormatArg, TierArg};
pub use config::CliConfig;
pub use context::OperatorContext;
pub use error::{CliError, CliResult};
pub use output::{OutputFormat, Render};
