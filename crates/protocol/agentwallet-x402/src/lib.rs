//! x402 Payment Required protocol for AgentWallet.
//!
//! Implements both halves of the [x402 payment protocol](https://www.x402.org/)
//! on Solana with the `exact` scheme: a paywall that prices HTTP routes and
//! verifies payment proofs on-chain, and a client that pays for 402
//! responses automatically.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐      GET /report       ┌──────────────┐
//! │ X402Client  │ ──────────────────────→│ PaywallGate  │
//! │             │ ←────────────────────  │              │
//! │             │  402 + requirement     │              │
//! │   ┌─────────┤                        │              │
//! │   │Payment  │  transfer on-chain     │              │
//! │   │Sender   │ ─────────┐             │              │
//! │   └─────────┤          ▼             │  confirm     │
//! │             │      ┌───────┐ ←───────│  signature   │
//! │             │      │Solana │         │              │
//! │             │      └───────┘         │              │
//! │             │  GET + X-PAYMENT       │              │
//! │             │ ──────────────────────→│              │
//! │             │ ←────────────────────  │              │
//! │             │  200 + X-PAYMENT-RECEIPT              │
//! └─────────────┘                        └──────────────┘
//! ```
//!
//! # Components
//!
//! - **[`types`]**: wire shapes (requirement, proof envelope, receipt)
//! - **[`pricing`]**: pricing rules and most-specific route matching
//! - **[`gate`]**: the server-side paywall and payment ledger
//! - **[`client`]**: the auto-paying HTTP client and spending tracker
//! - **[`error`]**: error types with recovery suggestions
//!
//! # Usage
//!
//! ```rust
//! use agentwallet_x402::{PricingConfig, PricingRuleConfig};
//!
//! let rules = vec![
//!     PricingRuleConfig::lamports("/api/*", 10_000),
//!     PricingRuleConfig::usdc("/api/report", 0.25).with_method("GET"),
//! ];
//! let pricing = PricingConfig::new(&rules, true, "solana-devnet", Some("payee".into())).unwrap();
//!
//! let rule = pricing.match_route("GET", "/api/report").unwrap();
//! assert_eq!(rule.amount(), 250_000);
//! assert_eq!(pricing.match_route("POST", "/api/report").unwrap().amount(), 10_000);
//! ```

pub mod cache;
pub mod client;
pub mod error;
pub mod gate;
pub mod pricing;
pub mod types;

pub use cache::{Verdict, VerificationCache};
pub use client::{
    parse_payment_requirements, ClientResponse, HttpRequest, HttpResponse, HttpTransport, PaymentCaps,
    PaymentOrder, PaymentSender, ReqwestTransport, SpendRecord, SpendingLimit, SpendingSummary,
    SpendingTracker, X402Client,
};
pub use error::{X402Error, X402Result};
pub use gate::{
    standalone_verify_config, verify_payment_proof, GateDecision, PaymentRecord, PaywallGate,
    PaywallResponse, VerifiedPayment, X402ServerSettings,
};
pub use pricing::{PricingConfig, PricingRule, PricingRuleConfig, RouteMatcher, USDC_MINT};
pub use types::{
    decode_payment_header, PaymentEnvelope, PaymentExtra, PaymentProof, PaymentReceipt,
    PaymentRequirement, ProofFields, HEADER_PAYMENT, HEADER_PAYMENT_RECEIPT,
    HEADER_PAYMENT_REQUIRED, HEADER_WWW_AUTHENTICATE, X402_VERSION,
};
