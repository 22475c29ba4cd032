//! CLI argument definitions using clap.

use std::path::PathBuf;

use agentwallet_types::Tier;
use clap::{Parser, Subcommand, ValueEnum};

use crate::output::OutputFormat;

/// AgentWallet operator CLI.
#[derive(Parser, Debug)]
#[command(name = "agentwallet")]
#[command(author = "AgentWallet Contributors")]
#[command(version)]
#[command(about = "Operator tooling for AgentWallet custodial and PDA wallets")]
#[command(
    long_about = "AgentWallet gives AI agents policy-enforced Solana wallets.\n\nRun 'agentwallet init' to write a default configuration."
)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "AGENTWALLET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format (human or json).
    #[arg(short, long, global = true, default_value = "human")]
    pub format: OutputFormatArg,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Output format argument for clap.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormatArg {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Human => OutputFormat::Human,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

/// Organization tier argument for clap.
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum TierArg {
    #[default]
    Free,
    Pro,
    Enterprise,
}

impl From<TierArg> for Tier {
    fn from(arg: TierArg) -> Self {
        match arg {
            TierArg::Free => Tier::Free,
            TierArg::Pro => Tier::Pro,
            TierArg::Enterprise => Tier::Enterprise,
        }
    }
}

/// CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    // =========================================================================
    // Setup Commands
    // =========================================================================
    /// Write a default configuration file.
    ///
    /// Also generates a fresh vault master key to export as
    /// AGENTWALLET_MASTER_KEY.
    Init {
        /// Overwrite an existing configuration.
        #[arg(long)]
        force: bool,
    },

    // =========================================================================
    // Service Commands
    // =========================================================================
    /// Run the background workers until Ctrl-C.
    ///
    /// Confirms submitted transactions, expires stale escrows and expires
    /// pending approval requests.
    Workers,

    // =========================================================================
    // PDA Commands
    // =========================================================================
    /// Derive an agent wallet PDA address.
    DerivePda {
        /// Organization public key (base58).
        org_pubkey: String,

        /// Agent seed, 1-32 bytes.
        seed: String,
    },

    /// Read and decode an agent wallet PDA account.
    PdaState {
        /// PDA address (base58).
        address: String,
    },

    // =========================================================================
    // Chain & Economics Commands
    // =========================================================================
    /// Show the SOL balance of an address.
    Balance {
        /// Address (base58).
        address: String,
    },

    /// Quote the platform fee for a transfer.
    Fee {
        /// Amount in lamports.
        #[arg(value_parser = parse_positive_amount)]
        amount: u64,

        /// Organization tier.
        #[arg(short, long, default_value = "free")]
        tier: TierArg,
    },
}

/// Parse a lamport amount, rejecting zero.
fn parse_positive_amount(s: &str) -> Result<u64, String> {
    let amount: u64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a whole number of lamports", s))?;
    if amount == 0 {
        return Err("amount must be greater than zero".to_string());
    }
    Ok(amount)
}
