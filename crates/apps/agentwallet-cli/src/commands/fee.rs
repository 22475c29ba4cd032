//! Quote the platform fee for a transfer.

use agentwallet_types::constants::BASE_NETWORK_FEE_LAMPORTS;
use agentwallet_types::Tier;

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{FeeOutput, OutputFormat, Render};

/// Execute the fee command, using the configured fee schedule.
pub fn fee(config: &CliConfig, format: OutputFormat, amount: u64, tier: Tier) -> CliResult<String> {
    let schedule = config.ops.fees;
    let fee = schedule.fee(amount, tier);
    let total_debit = amount
        .checked_add(fee)
        .and_then(|t| t.checked_add(BASE_NETWORK_FEE_LAMPORTS))
        .ok_or_else(|| CliError::user(format!("amount {} overflows with fees", amount)))?;

    let output = FeeOutput {
        amount,
        tier: tier.to_string(),
        bps: schedule.bps(tier),
        fee,
        total_debit,
    };
    Ok(output.render(format))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(amount: u64, tier: Tier) -> serde_json::Value {
        let out = fee(&CliConfig::default(), OutputFormat::Json, amount, tier).unwrap();
        serde_json::from_str(&out).unwrap()
    }

    #[test]
    fn test_fee_by_tier() {
        let free = quote(1_000_000_000, Tier::Free);
        assert_eq!(free["fee"], 5_000_000);
        assert_eq!(free["bps"], 50);
        assert_eq!(free["total_debit"], 1_005_005_000u64);

        let enterprise = quote(1_000_000_000, Tier::Enterprise);
        assert_eq!(enterprise["fee"], 1_000_000);
        assert_eq!(enterprise["tier"], "enterprise");
    }

    #[test]
    fn test_dust_pays_no_fee() {
        let dust = quote(1_000, Tier::Free);
        assert_eq!(dust["fee"], 0);
        assert_eq!(dust["total_debit"], 6_000);
    }

    #[test]
    fn test_overflow_is_user_error() {
        let err = fee(&CliConfig::default(), OutputFormat::Human, u64::MAX, Tier::Free).unwrap_err();
        assert!(matches!(err, CliError::User(_)));
    }
}
