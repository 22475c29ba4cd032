//! Paywall gate flows against a mock chain.

use std::sync::Arc;

use agentwallet_chain::{ChainError, SignatureStatus};
use agentwallet_crypto::Signature;
use agentwallet_test_utils::{ManualClock, MockChain};
use agentwallet_types::Clock;
use agentwallet_x402::{
    verify_payment_proof, GateDecision, PaymentEnvelope, PaymentProof, PaywallGate, PaywallResponse,
    PricingRuleConfig, X402Error, X402ServerSettings, HEADER_PAYMENT_REQUIRED, HEADER_WWW_AUTHENTICATE,
};
use serde_json::Value;

const PAYEE: &str = "PayeeAddress1111111111111111111111111111111";

struct Fixture {
    gate: PaywallGate,
    chain: MockChain,
    clock: ManualClock,
}

fn fixture(chain: MockChain) -> Fixture {
    let clock = ManualClock::default();
    let settings = X402ServerSettings {
        enabled: true,
        network: "solana-devnet".into(),
        default_pay_to: Some(PAYEE.into()),
        rules: vec![
            PricingRuleConfig::lamports("/pay/*", 1_000).with_method("GET"),
            PricingRuleConfig::lamports("/pay/special", 5_000).with_description("special data"),
            PricingRuleConfig::usdc("/report", 0.5),
        ],
        ..X402ServerSettings::default()
    };
    let gate = PaywallGate::new(&settings, Arc::new(chain.clone()), Arc::new(clock.clone())).unwrap();
    Fixture { gate, chain, clock }
}

fn sig(byte: u8) -> String {
    Signature([byte; 64]).to_string()
}

fn header(signature: &str, amount: u64, timestamp: i64) -> String {
    PaymentEnvelope::exact(
        "solana-devnet",
        PaymentProof {
            signature: signature.to_string(),
            payer: "PayerAddress".into(),
            amount: amount.to_string(),
            token_mint: None,
            timestamp,
        },
    )
    .to_header()
    .unwrap()
}

fn rejected(decision: GateDecision) -> PaywallResponse {
    match decision {
        GateDecision::PaymentRequired(resp) => resp,
        other => panic!("expected 402, got {:?}", other),
    }
}

fn detail(resp: &PaywallResponse) -> String {
    assert_eq!(resp.body["error"], "Invalid payment");
    resp.body["detail"].as_str().unwrap().to_string()
}

#[tokio::test(start_paused = true)]
async fn test_free_route_passes() {
    let f = fixture(MockChain::new());
    assert_eq!(f.gate.check("GET", "/free", None).await, GateDecision::Pass);
    assert_eq!(f.gate.check("POST", "/pay/thing", None).await, GateDecision::Pass);
}

#[tokio::test(start_paused = true)]
async fn test_unpaid_request_gets_402() {
    let f = fixture(MockChain::new());
    let resp = rejected(f.gate.check("GET", "/pay/thing", None).await);

    assert_eq!(resp.status, 402);
    assert_eq!(resp.body["error"], "Payment Required");
    assert_eq!(resp.body["description"], "This endpoint requires payment");
    assert_eq!(resp.body["x402"]["max_amount_required"], "1000");
    assert_eq!(resp.body["x402"]["pay_to"], PAYEE);
    assert_eq!(resp.body["x402"]["resource"], "/pay/thing");
    assert_eq!(resp.body["accepts"].as_array().unwrap().len(), 1);

    let required: Value = serde_json::from_str(resp.header(HEADER_PAYMENT_REQUIRED).unwrap()).unwrap();
    assert_eq!(required, resp.body["x402"]);
    assert_eq!(
        resp.header(HEADER_WWW_AUTHENTICATE).unwrap(),
        format!("x402 pay_to=\"{}\", amount=\"1000\", network=\"solana-devnet\"", PAYEE)
    );
}

#[tokio::test(start_paused = true)]
async fn test_exact_wildcard_rule_beats_glob_get_rule() {
    let f = fixture(MockChain::new());
    let resp = rejected(f.gate.check("GET", "/pay/special", None).await);
    assert_eq!(resp.body["x402"]["max_amount_required"], "5000");
    assert_eq!(resp.body["description"], "special data");
}

#[tokio::test(start_paused = true)]
async fn test_usdc_route_quotes_raw_units() {
    let f = fixture(MockChain::new());
    let resp = rejected(f.gate.check("GET", "/report", None).await);
    assert_eq!(resp.body["x402"]["max_amount_required"], "500000");
    assert_eq!(resp.body["x402"]["extra"]["token_symbol"], "USDC");
    assert_eq!(resp.body["x402"]["extra"]["decimals"], 6);
}

#[tokio::test(start_paused = true)]
async fn test_valid_payment_verified_and_cached() {
    let f = fixture(MockChain::new());
    let signature = sig(7);
    let proof = header(&signature, 1_000, f.clock.now().timestamp());

    let paid = match f.gate.check("GET", "/pay/thing", Some(&proof)).await {
        GateDecision::Verified(paid) => paid,
        other => panic!("expected verified, got {:?}", other),
    };
    assert_eq!(paid.signature, signature);
    assert_eq!(paid.amount, 1_000);
    let receipt: Value = serde_json::from_str(paid.receipt().1).unwrap();
    assert_eq!(receipt["status"], "accepted");
    assert_eq!(receipt["signature"], signature.as_str());

    // Second presentation is answered from the cache.
    assert!(matches!(
        f.gate.check("GET", "/pay/thing", Some(&proof)).await,
        GateDecision::Verified(_)
    ));
    assert_eq!(f.chain.calls("get_signature_status"), 1);

    let payments = f.gate.recent_payments(10).await;
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].route_pattern, "/pay/*");
    assert_eq!(payments[0].pay_to, PAYEE);
    assert_eq!(f.gate.total_incoming().await, 1_000);
}

#[tokio::test(start_paused = true)]
async fn test_insufficient_amount_rejected_before_chain() {
    let f = fixture(MockChain::new());
    let resp = rejected(
        f.gate
            .check("GET", "/pay/thing", Some(&header(&sig(8), 999, f.clock.now().timestamp())))
            .await,
    );
    assert!(detail(&resp).contains("insufficient payment"));
    assert!(resp.header(HEADER_PAYMENT_REQUIRED).is_some());
    assert_eq!(f.chain.calls("get_signature_status"), 0);
    assert!(f.gate.recent_payments(10).await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_confirmed_proof_checked_against_each_route() {
    let f = fixture(MockChain::new());
    let proof = header(&sig(13), 1_000, f.clock.now().timestamp());

    assert!(matches!(
        f.gate.check("GET", "/pay/thing", Some(&proof)).await,
        GateDecision::Verified(_)
    ));

    // Confirmed on chain already, but too little for the pricier route.
    let resp = rejected(f.gate.check("GET", "/pay/special", Some(&proof)).await);
    assert!(detail(&resp).contains("insufficient payment"));
    assert_eq!(f.chain.calls("get_signature_status"), 1);

    // Past the deadline the cached confirmation no longer helps.
    f.clock.advance(chrono::Duration::seconds(120));
    let resp = rejected(f.gate.check("GET", "/pay/thing", Some(&proof)).await);
    assert!(detail(&resp).contains("expired"));
    assert_eq!(f.gate.total_incoming().await, 1_000);
}

#[tokio::test(start_paused = true)]
async fn test_stale_proof_rejected_without_chain_call() {
    let f = fixture(MockChain::new());
    let stale = f.clock.now().timestamp() - 120;
    let resp = rejected(f.gate.check("GET", "/pay/thing", Some(&header(&sig(9), 1_000, stale))).await);
    assert!(detail(&resp).contains("expired"));
    assert_eq!(f.chain.calls("get_signature_status"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_transaction_rejected() {
    let f = fixture(MockChain::new());
    let signature = sig(10);
    f.chain.set_status(
        Signature([10; 64]),
        SignatureStatus::Failed("InstructionError".into()),
    );
    let resp = rejected(
        f.gate
            .check("GET", "/pay/thing", Some(&header(&signature, 1_000, f.clock.now().timestamp())))
            .await,
    );
    assert!(detail(&resp).contains("InstructionError"));

    // The failure is remembered.
    let resp = rejected(
        f.gate
            .check("GET", "/pay/thing", Some(&header(&signature, 1_000, f.clock.now().timestamp())))
            .await,
    );
    assert!(detail(&resp).contains("previously rejected"));
    assert_eq!(f.chain.calls("get_signature_status"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unconfirmed_payment_can_be_retried() {
    let f = fixture(MockChain::new().with_default_status(SignatureStatus::Pending));
    let signature = sig(11);
    let proof = header(&signature, 1_000, f.clock.now().timestamp());

    let resp = rejected(f.gate.check("GET", "/pay/thing", Some(&proof)).await);
    assert!(detail(&resp).contains("timed out"));
    assert_eq!(f.chain.calls("get_signature_status"), 5);

    f.chain.set_default_status(SignatureStatus::Confirmed);
    assert!(matches!(
        f.gate.check("GET", "/pay/thing", Some(&proof)).await,
        GateDecision::Verified(_)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_rpc_outage_rejects_payment() {
    let f = fixture(MockChain::new());
    f.chain.set_fail_all(Some(ChainError::network("connection refused")));
    let resp = rejected(
        f.gate
            .check("GET", "/pay/thing", Some(&header(&sig(12), 1_000, f.clock.now().timestamp())))
            .await,
    );
    assert!(detail(&resp).contains("not confirmed"));
    assert_eq!(f.gate.total_incoming().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_headers() {
    let f = fixture(MockChain::new());
    let resp = rejected(f.gate.check("GET", "/pay/thing", Some("%%% not a header")).await);
    assert!(detail(&resp).contains("cannot decode"));

    let resp = rejected(f.gate.check("GET", "/pay/thing", Some(r#"{"payload": {"amount": "5"}}"#)).await);
    assert!(detail(&resp).contains("no signature"));
}

#[tokio::test(start_paused = true)]
async fn test_configure_replaces_rules() {
    let f = fixture(MockChain::new());
    f.gate
        .configure(&[PricingRuleConfig::lamports("/new", 42)], true, "solana-mainnet", Some("other".into()))
        .await
        .unwrap();
    assert_eq!(f.gate.check("GET", "/pay/thing", None).await, GateDecision::Pass);
    let resp = rejected(f.gate.check("GET", "/new", None).await);
    assert_eq!(resp.body["x402"]["network"], "solana-mainnet");
    assert_eq!(resp.body["x402"]["pay_to"], "other");

    let err = f
        .gate
        .configure(&[PricingRuleConfig::lamports("^/(", 1)], true, "solana-mainnet", None)
        .await
        .unwrap_err();
    assert!(matches!(err, X402Error::InvalidRoute { .. }));
    assert_eq!(f.gate.routes().await.len(), 1);

    f.gate.configure(&[], false, "solana-mainnet", None).await.unwrap();
    assert!(!f.gate.is_enabled().await);
}

#[tokio::test(start_paused = true)]
async fn test_standalone_verification() {
    let chain = MockChain::new();
    let signature = sig(13);

    let err = verify_payment_proof(&chain, &header(&signature, 100, 0), PAYEE, Some(500), None)
        .await
        .unwrap_err();
    assert!(matches!(err, X402Error::InsufficientPayment { required: 500, received: 100 }));
    assert_eq!(chain.calls("get_signature_status"), 0);

    let err = verify_payment_proof(&chain, &header(&signature, 400_000, 0), PAYEE, None, Some(0.5))
        .await
        .unwrap_err();
    assert!(matches!(err, X402Error::InsufficientPayment { required: 500_000, .. }));

    let proof = verify_payment_proof(&chain, &header(&signature, 500, 0), PAYEE, Some(500), None)
        .await
        .unwrap();
    assert_eq!(proof.signature, signature);
    assert_eq!(proof.timestamp, None);

    chain.set_default_status(SignatureStatus::Pending);
    let err = verify_payment_proof(&chain, &header(&sig(14), 500, 0), PAYEE, Some(500), None)
        .await
        .unwrap_err();
    assert!(matches!(err, X402Error::NotConfirmed { .. }));
}
