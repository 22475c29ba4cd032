//! Derive an agent wallet PDA address.

use agentwallet_crypto::Pubkey;
use agentwallet_ops::derive_address;

use crate::error::CliResult;
use crate::output::{DerivePdaOutput, OutputFormat, Render};

/// Execute the derive-pda command. Offline.
pub fn derive_pda(format: OutputFormat, org_pubkey: &str, seed: &str) -> CliResult<String> {
    let org: Pubkey = org_pubkey.trim().parse()?;
    let (pda, bump) = derive_address(&org, seed)?;

    let output = DerivePdaOutput {
        org_pubkey: org.to_string(),
        seed: seed.to_string(),
        pda_address: pda.to_string(),
        bump,
    };
    Ok(output.render(format))
}
