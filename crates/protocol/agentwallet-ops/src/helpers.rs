//! Utility functions shared by the operation services.

use agentwallet_chain::ChainGateway;
use agentwallet_crypto::{Keypair, Pubkey, Signature};
use agentwallet_wire::{Instruction, Transaction as WireTransaction};
use tracing::debug;

use crate::error::{OpsError, OpsResult};

/// Fetch a fresh blockhash, sign `instructions` with `signer` as fee payer
/// and submit. Returns the transaction signature.
pub(crate) async fn sign_and_submit(
    chain: &dyn ChainGateway,
    instructions: &[Instruction],
    signer: &Keypair,
) -> OpsResult<Signature> {
    let blockhash = chain.get_latest_blockhash().await?;
    let tx = WireTransaction::new_signed(instructions, signer, blockhash)?;
    let wire = tx.serialize()?;
    debug!(
        payer = %signer.pubkey().short(),
        instructions = instructions.len(),
        bytes = wire.len(),
        "Submitting transaction"
    );
    Ok(chain.send_transaction(&wire).await?)
}

/// Parse a base58 address supplied by a caller.
pub fn parse_address(field: &str, value: &str) -> OpsResult<Pubkey> {
    value
        .trim()
        .parse()
        .map_err(|e| OpsError::validation(format!("{} is not a valid address: {}", field, e)))
}

/// Reject a zero amount.
pub(crate) fn require_positive(field: &str, amount: u64) -> OpsResult<()> {
    if amount == 0 {
        return Err(OpsError::validation(format!("{} must be greater than zero", field)));
    }
    Ok(())
}

/// Lamports as SOL for display.
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / agentwallet_types::constants::LAMPORTS_PER_SOL as f64
}
