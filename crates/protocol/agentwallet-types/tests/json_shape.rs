//! JSON shape of records persisted as documents and returned to API callers.

use agentwallet_crypto::Keypair;
use agentwallet_types::{
    AcpPhase, EscrowStatus, Policy, PolicyRules, PolicyScope, TimeWindow, Transaction, TransferRequest,
    TxStatus, TxType,
};
use chrono::Utc;
use uuid::Uuid;

#[test]
fn transaction_fields_are_snake_case_strings() {
    let request = TransferRequest::sol(Uuid::new_v4(), Keypair::generate().pubkey(), 1_500_000)
        .with_idempotency_key("order-17");
    let mut tx = Transaction::pending(
        Uuid::new_v4(),
        TxType::TransferSol,
        Keypair::generate().pubkey(),
        &request,
        7_500,
        Utc::now(),
    );
    tx.status = TxStatus::Submitted;

    let json = serde_json::to_value(&tx).unwrap();
    assert_eq!(json["tx_type"], "transfer_sol");
    assert_eq!(json["status"], "submitted");
    assert_eq!(json["amount"], 1_500_000);
    assert_eq!(json["platform_fee"], 7_500);
    assert_eq!(json["idempotency_key"], "order-17");
    assert_eq!(json["to_address"], request.to_address.to_string());

    let back: Transaction = serde_json::from_value(json).unwrap();
    assert_eq!(back, tx);
}

#[test]
fn policy_rules_omit_unset_fields() {
    let rules = PolicyRules {
        daily_limit_lamports: Some(1_000_000_000),
        time_window: Some(TimeWindow {
            start: "09:00".into(),
            end: "17:30".into(),
            timezone: "+02:00".into(),
        }),
        ..Default::default()
    };
    let policy = Policy::org_wide(Uuid::new_v4(), "business hours", 10, rules)
        .scoped(PolicyScope::Agent, Uuid::new_v4());

    let json = serde_json::to_value(&policy).unwrap();
    assert_eq!(json["scope"], "agent");
    let rules = json["rules"].as_object().unwrap();
    assert_eq!(rules.len(), 2);
    assert_eq!(rules["time_window"]["end"], "17:30");
}

#[test]
fn status_enums_parse_their_display_form() {
    for status in EscrowStatus::ALL {
        assert_eq!(status.to_string().parse::<EscrowStatus>().unwrap(), *status);
    }
    for phase in AcpPhase::ALL {
        assert_eq!(phase.to_string().parse::<AcpPhase>().unwrap(), *phase);
    }
    assert!("refunding".parse::<EscrowStatus>().is_err());
}
