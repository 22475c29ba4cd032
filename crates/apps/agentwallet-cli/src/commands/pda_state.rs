//! Read an agent wallet PDA account.

use agentwallet_crypto::Pubkey;
use agentwallet_ops::read_account;
use agentwallet_types::{Clock, SystemClock};

use crate::config::CliConfig;
use crate::context::chain_gateway;
use crate::error::CliResult;
use crate::output::{OutputFormat, PdaStateOutput, Render};

/// Execute the pda-state command.
pub async fn pda_state(config: CliConfig, format: OutputFormat, address: &str) -> CliResult<String> {
    let address: Pubkey = address.trim().parse()?;
    let chain = chain_gateway(&config)?;

    let account = read_account(chain.as_ref(), &address, SystemClock.now().timestamp()).await?;

    Ok(PdaStateOutput { account }.render(format))
}
