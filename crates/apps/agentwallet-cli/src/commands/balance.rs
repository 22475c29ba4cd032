//! Show the balance of an address.

use agentwallet_chain::ChainGateway;
use agentwallet_crypto::Pubkey;
use agentwallet_ops::lamports_to_sol;

use crate::config::CliConfig;
use crate::context::chain_gateway;
use crate::error::CliResult;
use crate::output::{BalanceOutput, OutputFormat, Render};

/// Execute the balance command.
pub async fn balance(config: CliConfig, format: OutputFormat, address: &str) -> CliResult<String> {
    let address: Pubkey = address.trim().parse()?;
    let chain = chain_gateway(&config)?;

    let lamports = chain.get_balance(&address).await?;

    let output = BalanceOutput {
        address: address.to_string(),
        lamports,
        sol: lamports_to_sol(lamports),
    };
    Ok(output.render(format))
}
