//! Confirmation polling for submitted transactions.

use agentwallet_crypto::Signature;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::ConfirmConfig;
use crate::traits::{ChainGateway, SignatureStatus};

/// Final outcome of polling a signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    /// Reached confirmed or finalized commitment
    Confirmed,
    /// Landed with an on-chain error
    Failed(String),
    /// Still unknown after every poll
    TimedOut,
}

/// Poll the status of `signature` until it settles or the poll budget runs
/// out.
///
/// A status query that errors counts as a pending poll; the transaction may
/// well have landed, so the caller should leave the record for the
/// background confirmation worker rather than fail it.
pub async fn confirm_signature(
    chain: &dyn ChainGateway,
    signature: &Signature,
    config: &ConfirmConfig,
) -> ConfirmationOutcome {
    for poll in 0..config.max_polls {
        if poll > 0 {
            sleep(config.poll_interval).await;
        }
        match chain.get_signature_status(signature).await {
            Ok(SignatureStatus::Confirmed) => {
                debug!(signature = %signature.short(), poll, "Transaction confirmed");
                return ConfirmationOutcome::Confirmed;
            }
            Ok(SignatureStatus::Failed(reason)) => {
                warn!(signature = %signature.short(), reason = %reason, "Transaction failed on-chain");
                return ConfirmationOutcome::Failed(reason);
            }
            Ok(SignatureStatus::Pending) => {}
            Err(e) => {
                warn!(signature = %signature.short(), error = %e, "Status poll failed");
            }
        }
    }
    debug!(signature = %signature.short(), polls = config.max_polls, "Confirmation timed out");
    ConfirmationOutcome::TimedOut
}
