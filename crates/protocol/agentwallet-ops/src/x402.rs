//! Paying for x402 resources from a custodial wallet.

use std::sync::Arc;

use agentwallet_types::{Clock, Tier, TransferRequest, TxType};
use agentwallet_x402::{PaymentOrder, PaymentProof, PaymentSender, X402Error, X402Result};
use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::error::OpsError;
use crate::helpers::parse_address;
use crate::transfer::TransactionEngine;

/// [`PaymentSender`] that pays through the transaction engine.
///
/// Payments are ordinary policy-checked transfers recorded as
/// `x402_payment`, so the wallet's spend policies cover them too.
#[derive(Debug, Clone)]
pub struct WalletPaymentSender {
    engine: TransactionEngine,
    clock: Arc<dyn Clock>,
    org_id: Uuid,
    tier: Tier,
    wallet_id: Uuid,
    agent_id: Option<Uuid>,
}

impl WalletPaymentSender {
    pub fn new(engine: TransactionEngine, clock: Arc<dyn Clock>, org_id: Uuid, tier: Tier, wallet_id: Uuid) -> Self {
        Self {
            engine,
            clock,
            org_id,
            tier,
            wallet_id,
            agent_id: None,
        }
    }

    /// Attribute payments to an agent.
    pub fn with_agent(mut self, agent_id: Uuid) -> Self {
        self.agent_id = Some(agent_id);
        self
    }

    fn request(&self, order: &PaymentOrder) -> Result<TransferRequest, OpsError> {
        let to = parse_address("pay_to", &order.pay_to)?;
        let mut request = TransferRequest::sol(self.wallet_id, to, order.amount).with_memo(truncate_memo(&order.resource));
        if let Some(mint) = &order.token_mint {
            request = request.with_token(parse_address("token_mint", mint)?);
        }
        if let Some(agent_id) = self.agent_id {
            request = request.with_agent(agent_id);
        }
        Ok(request)
    }
}

#[async_trait]
impl PaymentSender for WalletPaymentSender {
    async fn send_payment(&self, order: &PaymentOrder) -> X402Result<PaymentProof> {
        let request = self.request(order).map_err(payment_error)?;
        let tx = self
            .engine
            .execute(self.org_id, self.tier, request, TxType::X402Payment, None)
            .await
            .map_err(payment_error)?;

        let signature = tx
            .signature
            .ok_or_else(|| X402Error::PaymentFailed("transaction was not submitted".into()))?;
        info!(
            tx_id = %tx.id,
            resource = %order.resource,
            amount = order.amount,
            signature = %signature.short(),
            "x402 payment sent"
        );
        Ok(PaymentProof {
            signature: signature.to_string(),
            payer: tx.from_address.to_string(),
            amount: order.amount.to_string(),
            token_mint: order.token_mint.clone(),
            timestamp: self.clock.now().timestamp(),
        })
    }
}

fn payment_error(e: OpsError) -> X402Error {
    match e {
        OpsError::PolicyDenied { .. } | OpsError::ApprovalRequired { .. } => X402Error::SpendingLimit(e.to_string()),
        other => X402Error::PaymentFailed(other.to_string()),
    }
}

/// The resource URL as a memo, cut at a char boundary to fit.
fn truncate_memo(resource: &str) -> String {
    const PREFIX: &str = "x402:";
    let budget = agentwallet_types::constants::MAX_MEMO_LEN - PREFIX.len();
    let mut end = resource.len().min(budget);
    while !resource.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", PREFIX, &resource[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentwallet_types::constants::MAX_MEMO_LEN;

    #[test]
    fn test_truncate_memo_fits() {
        assert_eq!(truncate_memo("https://api.example.com/report"), "x402:https://api.example.com/report");
        let long = "é".repeat(MAX_MEMO_LEN);
        assert!(truncate_memo(&long).len() <= MAX_MEMO_LEN);
    }

    #[test]
    fn test_payment_error_mapping() {
        let denied = OpsError::PolicyDenied {
            policy_name: "daily".into(),
            reason: "daily limit exceeded".into(),
        };
        assert!(matches!(payment_error(denied), X402Error::SpendingLimit(_)));
        assert!(matches!(
            payment_error(OpsError::validation("bad")),
            X402Error::PaymentFailed(_)
        ));
    }
}
