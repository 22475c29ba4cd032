//! Paywall gate for x402-protected routes.
//!
//! The `PaywallGate` sits in front of business logic and handles the server
//! side of the x402 flow:
//! 1. Match the request against the pricing table
//! 2. Answer unpaid requests with 402 Payment Required
//! 3. Verify `X-PAYMENT` proofs on-chain
//! 4. Record verified payments for reporting

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use agentwallet_chain::{confirm_signature, ChainGateway, ConfirmConfig, ConfirmationOutcome};
use agentwallet_crypto::Signature;
use agentwallet_types::Clock;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::{Verdict, VerificationCache, DEFAULT_CACHE_CAPACITY};
use crate::error::{X402Error, X402Result};
use crate::pricing::{usdc_to_raw, PricingConfig, PricingRule, PricingRuleConfig};
use crate::types::{
    decode_payment_header, PaymentReceipt, PaymentRequirement, ProofFields, DEFAULT_NETWORK,
    HEADER_PAYMENT_RECEIPT, HEADER_PAYMENT_REQUIRED, HEADER_WWW_AUTHENTICATE,
};

/// Server-side x402 settings, loadable from the operator's config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct X402ServerSettings {
    pub enabled: bool,
    pub network: String,
    pub default_pay_to: Option<String>,
    pub rules: Vec<PricingRuleConfig>,
    /// Confirmation polling while verifying a proof.
    pub verify: ConfirmConfig,
    pub cache_capacity: usize,
}

impl Default for X402ServerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            network: DEFAULT_NETWORK.to_string(),
            default_pay_to: None,
            rules: Vec::new(),
            verify: ConfirmConfig::new(5, Duration::from_secs(1)),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Confirmation polling for [`verify_payment_proof`].
pub fn standalone_verify_config() -> ConfirmConfig {
    ConfirmConfig::new(10, Duration::from_millis(1500))
}

/// A verified incoming payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub route_pattern: String,
    pub method: String,
    pub path: String,
    pub payer: String,
    pub pay_to: String,
    /// Smallest unit of the paid asset.
    pub amount: u64,
    /// `None` for native SOL.
    pub token_mint: Option<String>,
    pub signature: String,
    pub verified_at: DateTime<Utc>,
}

/// A 402 response ready to hand to the HTTP layer.
#[derive(Debug, Clone, PartialEq)]
pub struct PaywallResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl PaywallResponse {
    /// First header value named `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A payment that passed verification.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedPayment {
    pub signature: String,
    pub payer: String,
    pub amount: u64,
    pub token_mint: Option<String>,
    /// Value for the `X-PAYMENT-RECEIPT` response header.
    pub receipt_header: String,
}

impl VerifiedPayment {
    pub fn receipt(&self) -> (&'static str, &str) {
        (HEADER_PAYMENT_RECEIPT, &self.receipt_header)
    }
}

/// What the HTTP layer should do with a request.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// Route is free (or the paywall is off); continue.
    Pass,
    /// Reply with this 402 instead of running the handler.
    PaymentRequired(PaywallResponse),
    /// Paid; run the handler and attach the receipt header.
    Verified(VerifiedPayment),
}

/// Gate for x402-protected routes.
pub struct PaywallGate {
    /// Pricing table, replaced wholesale by [`configure`](Self::configure).
    config: Arc<RwLock<PricingConfig>>,

    /// On-chain confirmation verdicts by signature.
    cache: Arc<RwLock<VerificationCache>>,

    /// Verified payments, oldest first.
    payments: Arc<RwLock<Vec<PaymentRecord>>>,

    chain: Arc<dyn ChainGateway>,
    clock: Arc<dyn Clock>,
    verify: ConfirmConfig,
}

impl PaywallGate {
    /// Build a gate from settings.
    pub fn new(
        settings: &X402ServerSettings,
        chain: Arc<dyn ChainGateway>,
        clock: Arc<dyn Clock>,
    ) -> X402Result<Self> {
        let config = PricingConfig::new(
            &settings.rules,
            settings.enabled,
            settings.network.clone(),
            settings.default_pay_to.clone(),
        )?;
        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            cache: Arc::new(RwLock::new(VerificationCache::new(settings.cache_capacity))),
            payments: Arc::new(RwLock::new(Vec::new())),
            chain,
            clock,
            verify: settings.verify,
        })
    }

    /// Replace the pricing table. On error the current table stays.
    pub async fn configure(
        &self,
        rules: &[PricingRuleConfig],
        enabled: bool,
        network: impl Into<String>,
        default_pay_to: Option<String>,
    ) -> X402Result<()> {
        let compiled = PricingConfig::new(rules, enabled, network, default_pay_to)?;
        info!(rules = compiled.rules().len(), enabled, network = %compiled.network, "x402 pricing configured");
        *self.config.write().await = compiled;
        Ok(())
    }

    /// Snapshot of the configured rules.
    pub async fn routes(&self) -> Vec<PricingRule> {
        self.config.read().await.rules().to_vec()
    }

    pub async fn is_enabled(&self) -> bool {
        self.config.read().await.enabled
    }

    /// Decide how to handle a request.
    pub async fn check(&self, method: &str, path: &str, payment_header: Option<&str>) -> GateDecision {
        let (rule, network) = {
            let config = self.config.read().await;
            match config.match_route(method, path) {
                Some(rule) => (rule.clone(), config.network.clone()),
                None => return GateDecision::Pass,
            }
        };

        let header = match payment_header.map(str::trim).filter(|h| !h.is_empty()) {
            Some(h) => h,
            None => {
                debug!(method, path, route = %rule.route_pattern, "Payment required");
                return GateDecision::PaymentRequired(payment_required(&rule, &network, path));
            }
        };

        match self.verify(&rule, header).await {
            Ok(proof) => {
                self.record(&rule, method, path, &proof).await;
                let receipt = json!(PaymentReceipt::accepted(proof.signature.clone())).to_string();
                GateDecision::Verified(VerifiedPayment {
                    signature: proof.signature,
                    payer: proof.payer,
                    amount: proof.amount,
                    token_mint: proof.token_mint,
                    receipt_header: receipt,
                })
            }
            Err(e) => {
                warn!(method, path, route = %rule.route_pattern, error = %e, "Payment rejected");
                GateDecision::PaymentRequired(invalid_payment(&rule, &network, path, &e))
            }
        }
    }

    async fn verify(&self, rule: &PricingRule, header: &str) -> X402Result<ProofFields> {
        let proof = ProofFields::from_value(&decode_payment_header(header)?)?;

        // Freshness and terms are checked against the route being served on
        // every presentation, cached or not.
        if let Some(ts) = proof.timestamp {
            let age_secs = self.clock.now().timestamp() - ts;
            if age_secs > rule.max_deadline_seconds as i64 {
                return Err(X402Error::PaymentExpired {
                    age_secs,
                    deadline_secs: rule.max_deadline_seconds,
                });
            }
        }
        check_terms(&proof, Some(&rule.pay_to), rule.amount())?;

        match self.cache.read().await.get(&proof.signature) {
            Some(Verdict::Confirmed) => return Ok(proof),
            Some(Verdict::Failed) => return Err(X402Error::PreviouslyRejected),
            None => {}
        }

        let result = confirm_on_chain(self.chain.as_ref(), &proof.signature, &self.verify).await;
        let verdict = match &result {
            Ok(()) => Some(Verdict::Confirmed),
            // A timeout may still land; let the payer try again.
            Err(X402Error::NotConfirmed { reason }) if reason == TIMED_OUT => None,
            Err(X402Error::NotConfirmed { .. }) => Some(Verdict::Failed),
            Err(_) => None,
        };
        if let Some(verdict) = verdict {
            self.cache.write().await.insert(&proof.signature, verdict);
        }
        result.map(|()| proof)
    }

    async fn record(&self, rule: &PricingRule, method: &str, path: &str, proof: &ProofFields) {
        let mut payments = self.payments.write().await;
        if payments.iter().any(|p| p.signature == proof.signature) {
            return;
        }
        info!(
            signature = %truncate(&proof.signature),
            payer = %truncate(&proof.payer),
            amount = proof.amount,
            route = %rule.route_pattern,
            "x402 payment verified"
        );
        payments.push(PaymentRecord {
            id: Uuid::new_v4(),
            route_pattern: rule.route_pattern.clone(),
            method: method.to_ascii_uppercase(),
            path: path.to_string(),
            payer: proof.payer.clone(),
            pay_to: rule.pay_to.clone(),
            amount: proof.amount,
            token_mint: proof.token_mint.clone(),
            signature: proof.signature.clone(),
            verified_at: self.clock.now(),
        });
    }

    /// Most recent verified payments, newest first.
    pub async fn recent_payments(&self, limit: usize) -> Vec<PaymentRecord> {
        let payments = self.payments.read().await;
        payments.iter().rev().take(limit).cloned().collect()
    }

    /// Lamports received through native SOL payments.
    pub async fn total_incoming(&self) -> u64 {
        self.payments
            .read()
            .await
            .iter()
            .filter(|p| p.token_mint.is_none())
            .fold(0u64, |sum, p| sum.saturating_add(p.amount))
    }
}

impl std::fmt::Debug for PaywallGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaywallGate")
            .field("verify", &self.verify)
            .finish_non_exhaustive()
    }
}

const TIMED_OUT: &str = "timed out";

/// Poll `signature` until it confirms. Errors while polling count as
/// pending, so an unreachable node ends in a timeout rejection.
async fn confirm_on_chain(chain: &dyn ChainGateway, signature: &str, config: &ConfirmConfig) -> X402Result<()> {
    let sig = Signature::from_str(signature).map_err(|e| X402Error::MalformedPayload {
        reason: format!("invalid signature: {}", e),
    })?;
    match confirm_signature(chain, &sig, config).await {
        ConfirmationOutcome::Confirmed => Ok(()),
        ConfirmationOutcome::Failed(reason) => Err(X402Error::NotConfirmed { reason }),
        ConfirmationOutcome::TimedOut => Err(X402Error::NotConfirmed {
            reason: TIMED_OUT.to_string(),
        }),
    }
}

/// Amount and recipient checks against the self-reported proof.
fn check_terms(proof: &ProofFields, pay_to: Option<&str>, required: u64) -> X402Result<()> {
    if let (Some(expected), Some(got)) = (pay_to.filter(|p| !p.is_empty()), proof.pay_to.as_deref()) {
        if expected != got {
            return Err(X402Error::WrongRecipient {
                expected: expected.to_string(),
                got: got.to_string(),
            });
        }
    }
    if proof.amount < required {
        return Err(X402Error::InsufficientPayment {
            required,
            received: proof.amount,
        });
    }
    Ok(())
}

/// Verify a payment header outside the gate.
///
/// Amounts are checked before the chain is asked; confirmation uses
/// [`standalone_verify_config`].
pub async fn verify_payment_proof(
    chain: &dyn ChainGateway,
    payment_header: &str,
    expected_pay_to: &str,
    expected_lamports: Option<u64>,
    expected_usdc: Option<f64>,
) -> X402Result<ProofFields> {
    let proof = ProofFields::from_value(&decode_payment_header(payment_header)?)?;
    let required = expected_lamports
        .unwrap_or(0)
        .max(expected_usdc.map(usdc_to_raw).unwrap_or(0));
    check_terms(&proof, Some(expected_pay_to), required)?;
    confirm_on_chain(chain, &proof.signature, &standalone_verify_config()).await?;
    Ok(proof)
}

fn payment_required(rule: &PricingRule, network: &str, resource: &str) -> PaywallResponse {
    let requirement = rule.requirement(network, resource);
    let description = if rule.description.is_empty() {
        "This endpoint requires payment"
    } else {
        rule.description.as_str()
    };
    let www_authenticate = format!(
        "x402 pay_to=\"{}\", amount=\"{}\", network=\"{}\"",
        requirement.pay_to, requirement.max_amount_required, network
    );
    PaywallResponse {
        status: 402,
        headers: vec![
            (HEADER_PAYMENT_REQUIRED.to_string(), requirement_json(&requirement).to_string()),
            (HEADER_WWW_AUTHENTICATE.to_string(), www_authenticate),
        ],
        body: json!({
            "error": "Payment Required",
            "description": description,
            "x402": requirement_json(&requirement),
            "accepts": [requirement_json(&requirement)],
        }),
    }
}

fn invalid_payment(rule: &PricingRule, network: &str, resource: &str, error: &X402Error) -> PaywallResponse {
    let requirement = requirement_json(&rule.requirement(network, resource));
    PaywallResponse {
        status: 402,
        headers: vec![(HEADER_PAYMENT_REQUIRED.to_string(), requirement.to_string())],
        body: json!({
            "error": "Invalid payment",
            "detail": error.to_string(),
            "x402": requirement,
        }),
    }
}

fn requirement_json(requirement: &PaymentRequirement) -> Value {
    json!(requirement)
}

fn truncate(s: &str) -> String {
    if s.chars().count() > 12 {
        format!("{}...", s.chars().take(12).collect::<String>())
    } else {
        s.to_string()
    }
}
