//! Output formatting for CLI.

use agentwallet_ops::{lamports_to_sol, PdaAccount};
use colored::Colorize;
use serde::Serialize;

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Human => write!(f, "human"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Trait for renderable output.
pub trait Render: Serialize {
    /// Render as human-readable string.
    fn render_human(&self) -> String;

    /// Render as JSON string.
    fn render_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Render in the specified format.
    fn render(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Human => self.render_human(),
            OutputFormat::Json => self.render_json(),
        }
    }
}

/// Format lamports as SOL with full precision.
pub fn format_sol(lamports: u64) -> String {
    format!("{:.9} SOL", lamports_to_sol(lamports))
}

// =============================================================================
// Output Types
// =============================================================================

/// Output for the init command.
#[derive(Debug, Serialize)]
pub struct InitOutput {
    pub config_path: String,
    pub database: String,
    /// Freshly generated vault key; shown once.
    pub master_key: String,
    pub master_key_env: String,
}

impl Render for InitOutput {
    fn render_human(&self) -> String {
        [
            format!("{} {}", "Configuration saved to:".green().bold(), self.config_path),
            format!("{} {}", "Database:".bold(), self.database),
            String::new(),
            format!(
                "{} export {}={}",
                "Master key (store it safely, it is not written anywhere):".yellow(),
                self.master_key_env,
                self.master_key
            ),
        ]
        .join("\n")
    }
}

/// Output for the workers command, printed after shutdown.
#[derive(Debug, Serialize)]
pub struct WorkersOutput {
    pub workers: Vec<String>,
    pub stopped: usize,
}

impl Render for WorkersOutput {
    fn render_human(&self) -> String {
        format!(
            "{} {} of {} workers ({})",
            "Stopped".green().bold(),
            self.stopped,
            self.workers.len(),
            self.workers.join(", ")
        )
    }
}

/// Output for the derive-pda command.
#[derive(Debug, Serialize)]
pub struct DerivePdaOutput {
    pub org_pubkey: String,
    pub seed: String,
    pub pda_address: String,
    pub bump: u8,
}

impl Render for DerivePdaOutput {
    fn render_human(&self) -> String {
        format!(
            "{} {}\n{} {}\n{} {}",
            "PDA:".bold(),
            self.pda_address.green(),
            "Bump:".bold(),
            self.bump,
            "Seeds:".bold(),
            format!("agent_wallet / {} / {}", self.org_pubkey, self.seed).dimmed()
        )
    }
}

/// Output for the pda-state command.
#[derive(Debug, Serialize)]
pub struct PdaStateOutput {
    #[serde(flatten)]
    pub account: PdaAccount,
}

impl Render for PdaStateOutput {
    fn render_human(&self) -> String {
        let a = &self.account;
        let status = if a.is_active {
            "active".green()
        } else {
            "inactive".red()
        };
        [
            format!("{} {} ({})", "PDA:".bold(), a.pda_address, status),
            format!("{} {}", "Agent:".bold(), a.agent_id),
            format!("{} {}", "Authority:".bold(), a.authority),
            format!("{} {}", "Org:".bold(), a.org),
            format!("{} {}", "Balance:".bold(), format_sol(a.lamports)),
            format!("{} {}", "Per-tx limit:".bold(), format_sol(a.spending_limit_per_tx)),
            format!(
                "{} {} spent of {}",
                "Today:".bold(),
                format_sol(a.daily_spent),
                format_sol(a.daily_limit)
            ),
            format!("{} {}", "Available now:".bold(), format_sol(a.available_now).green()),
        ]
        .join("\n")
    }
}

/// Output for the balance command.
#[derive(Debug, Serialize)]
pub struct BalanceOutput {
    pub address: String,
    pub lamports: u64,
    pub sol: f64,
}

impl Render for BalanceOutput {
    fn render_human(&self) -> String {
        format!(
            "{} {}\n{} {}",
            "Address:".bold(),
            self.address,
            "Balance:".bold(),
            format_sol(self.lamports).green()
        )
    }
}

/// Output for the fee command.
#[derive(Debug, Serialize)]
pub struct FeeOutput {
    pub amount: u64,
    pub tier: String,
    pub bps: u16,
    pub fee: u64,
    /// Amount plus fee plus the base network fee.
    pub total_debit: u64,
}

impl Render for FeeOutput {
    fn render_human(&self) -> String {
        format!(
            "{} {}\n{} {} ({} bps, {} tier)\n{} {}",
            "Amount:".bold(),
            format_sol(self.amount),
            "Platform fee:".bold(),
            format_sol(self.fee).yellow(),
            self.bps,
            self.tier,
            "Total debit:".bold(),
            format_sol(self.total_debit)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_sol() {
        assert_eq!(format_sol(1_000_000_000), "1.000000000 SOL");
        assert_eq!(format_sol(5_000), "0.000005000 SOL");
    }

    #[test]
    fn test_balance_output() {
        let output = BalanceOutput {
            address: "11111111111111111111111111111111".into(),
            lamports: 2_500_000_000,
            sol: 2.5,
        };

        let human = output.render(OutputFormat::Human);
        assert!(human.contains("Balance:"));
        assert!(human.contains("2.500000000 SOL"));

        let json: serde_json::Value = serde_json::from_str(&output.render(OutputFormat::Json)).unwrap();
        assert_eq!(json["lamports"], 2_500_000_000u64);
    }

    #[test]
    fn test_fee_output_json_fields() {
        let output = FeeOutput {
            amount: 1_000_000_000,
            tier: "free".into(),
            bps: 50,
            fee: 5_000_000,
            total_debit: 1_005_005_000,
        };
        let json: serde_json::Value = serde_json::from_str(&output.render_json()).unwrap();
        assert_eq!(json["fee"], 5_000_000);
        assert_eq!(json["tier"], "free");
        assert!(output.render_human().contains("50 bps"));
    }
}
