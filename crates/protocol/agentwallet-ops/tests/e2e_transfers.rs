//! End-to-end transfer tests.
//!
//! Every test runs the real services over an in-memory store, a
//! [`MockChain`] and a [`ManualClock`], so policy windows and balances are
//! fully deterministic.

mod common;

use std::time::Duration;

use agentwallet_chain::{ChainError, SignatureStatus, TokenAccount};
use agentwallet_ops::{OpsConfig, OpsError, Worker};
use agentwallet_store::TransactionFilter;
use agentwallet_test_utils::{approval_policy, daily_limit_policy, MockChain};
use agentwallet_types::{
    ApprovalStatus, Clock, ErrorCode, Page, Tier, TransferRequest, TxStatus, TxType, WalletType,
};
use agentwallet_wire::program::USDC_MINT;
use common::{recipient, Harness, SOL};

// ============ DAILY LIMIT ============

#[tokio::test]
async fn test_daily_limit_resets_next_day() {
    let h = Harness::new(Tier::Free);
    let wallet = h.wallet(5 * SOL).await;
    h.store
        .create_policy(&daily_limit_policy(h.org.id, SOL))
        .await
        .unwrap();

    let first = h
        .platform
        .transactions
        .transfer(h.org.id, h.tier(), TransferRequest::sol(wallet.id, recipient(1), 600_000_000))
        .await
        .unwrap();
    assert_eq!(first.status, TxStatus::Submitted);
    assert!(first.signature.is_some());

    let denied = h
        .platform
        .transactions
        .transfer(h.org.id, h.tier(), TransferRequest::sol(wallet.id, recipient(2), 500_000_000))
        .await
        .unwrap_err();
    assert!(matches!(denied, OpsError::PolicyDenied { ref policy_name, .. } if policy_name == "daily-cap"));
    assert_eq!(denied.error_code(), ErrorCode::PolicyDenied);

    h.clock.advance(chrono::Duration::days(1));
    let next_day = h
        .platform
        .transactions
        .transfer(h.org.id, h.tier(), TransferRequest::sol(wallet.id, recipient(2), 500_000_000))
        .await
        .unwrap();
    assert_eq!(next_day.status, TxStatus::Submitted);
    assert_eq!(h.chain.submitted_count(), 2);
}

// ============ FEES & BALANCES ============

#[tokio::test]
async fn test_fee_lands_in_same_transaction() {
    let platform_wallet = recipient(200);
    let h = Harness::with_config(Tier::Free, OpsConfig::default().with_platform_wallet(platform_wallet));
    let wallet = h.wallet(SOL).await;

    let tx = h
        .platform
        .transactions
        .transfer(h.org.id, h.tier(), TransferRequest::sol(wallet.id, recipient(3), 1_000_000))
        .await
        .unwrap();

    // 50 bps of 0.001 SOL on the free tier.
    assert_eq!(tx.platform_fee, 5_000);
    let submitted = h.chain.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].message.instructions.len(), 2);
    assert_eq!(h.chain.balance(&recipient(3)), 1_000_000);
    assert_eq!(h.chain.balance(&platform_wallet), 5_000);
}

#[tokio::test]
async fn test_insufficient_balance_records_failure() {
    let h = Harness::new(Tier::Pro);
    let wallet = h.wallet(1_000).await;

    let err = h
        .platform
        .transactions
        .transfer(h.org.id, h.tier(), TransferRequest::sol(wallet.id, recipient(4), 1_000_000))
        .await
        .unwrap_err();
    assert!(matches!(err, OpsError::InsufficientBalance { available: 1_000, .. }));

    let filter = TransactionFilter {
        status: Some(TxStatus::Failed),
        ..TransactionFilter::default()
    };
    let failed = h
        .platform
        .transactions
        .list_transactions(h.org.id, &filter, Page::default())
        .await
        .unwrap();
    assert_eq!(failed.total, 1);
    assert!(failed.items[0].error.as_deref().unwrap().contains("insufficient balance"));
    assert_eq!(h.chain.submitted_count(), 0);
}

#[tokio::test]
async fn test_send_failure_marks_failed() {
    let h = Harness::new(Tier::Free);
    let wallet = h.wallet(SOL).await;
    h.chain
        .fail_next_send(ChainError::transaction_failed("custom program error: 0x1"));

    let err = h
        .platform
        .transactions
        .transfer(h.org.id, h.tier(), TransferRequest::sol(wallet.id, recipient(5), 10_000))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::TransactionFailed);
    assert!(!err.is_retryable());

    let records = h
        .platform
        .transactions
        .list_transactions(h.org.id, &TransactionFilter::default(), Page::default())
        .await
        .unwrap();
    assert_eq!(records.items[0].status, TxStatus::Failed);
}

#[tokio::test]
async fn test_token_transfer_has_no_platform_fee() {
    let h = Harness::new(Tier::Free);
    let wallet = h.wallet(SOL).await;
    h.chain.set_token_accounts(
        wallet.address,
        vec![TokenAccount {
            address: recipient(60),
            mint: USDC_MINT,
            amount: 2_000_000,
            decimals: 6,
        }],
    );

    let tx = h
        .platform
        .transactions
        .transfer(
            h.org.id,
            h.tier(),
            TransferRequest::sol(wallet.id, recipient(6), 1_500_000).with_token(USDC_MINT),
        )
        .await
        .unwrap();
    assert_eq!(tx.tx_type, TxType::TransferToken);
    assert_eq!(tx.platform_fee, 0);

    let err = h
        .platform
        .transactions
        .transfer(
            h.org.id,
            h.tier(),
            TransferRequest::sol(wallet.id, recipient(6), 3_000_000).with_token(USDC_MINT),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, OpsError::InsufficientBalance { available: 2_000_000, .. }));
}

#[tokio::test]
async fn test_validation_happens_before_chain() {
    let h = Harness::new(Tier::Free);
    let wallet = h.wallet(SOL).await;

    let err = h
        .platform
        .transactions
        .transfer(h.org.id, h.tier(), TransferRequest::sol(wallet.id, recipient(7), 0))
        .await
        .unwrap_err();
    assert!(matches!(err, OpsError::Validation(_)));

    let deactivated = h.platform.wallets.deactivate_wallet(h.org.id, wallet.id).await.unwrap();
    assert!(!deactivated.is_active);
    let err = h
        .platform
        .transactions
        .transfer(h.org.id, h.tier(), TransferRequest::sol(wallet.id, recipient(7), 10))
        .await
        .unwrap_err();
    assert!(matches!(err, OpsError::Validation(_)));
    assert_eq!(h.chain.calls("get_balance"), 0);
}

// ============ IDEMPOTENCY ============

#[tokio::test]
async fn test_idempotent_replay_and_conflict() {
    let h = Harness::new(Tier::Free);
    let wallet = h.wallet(SOL).await;
    let request = TransferRequest::sol(wallet.id, recipient(8), 100_000).with_idempotency_key("order-42");

    let first = h
        .platform
        .transactions
        .transfer(h.org.id, h.tier(), request.clone())
        .await
        .unwrap();
    let replay = h
        .platform
        .transactions
        .transfer(h.org.id, h.tier(), request.clone())
        .await
        .unwrap();
    assert_eq!(first.id, replay.id);
    assert_eq!(h.chain.submitted_count(), 1);

    let mut changed = request;
    changed.amount = 200_000;
    let err = h
        .platform
        .transactions
        .transfer(h.org.id, h.tier(), changed)
        .await
        .unwrap_err();
    assert!(matches!(err, OpsError::IdempotencyConflict { ref key } if key == "order-42"));
}

#[tokio::test]
async fn test_replay_after_wallet_deactivated() {
    let h = Harness::new(Tier::Free);
    let wallet = h.wallet(SOL).await;
    let request = TransferRequest::sol(wallet.id, recipient(9), 100_000).with_idempotency_key("order-43");

    let first = h
        .platform
        .transactions
        .transfer(h.org.id, h.tier(), request.clone())
        .await
        .unwrap();
    h.platform.wallets.deactivate_wallet(h.org.id, wallet.id).await.unwrap();

    let replay = h
        .platform
        .transactions
        .transfer(h.org.id, h.tier(), request.clone())
        .await
        .unwrap();
    assert_eq!(replay.id, first.id);
    assert_eq!(replay.signature, first.signature);
    assert_eq!(h.chain.submitted_count(), 1);

    let fresh = TransferRequest::sol(wallet.id, recipient(9), 100_000).with_idempotency_key("order-44");
    let err = h
        .platform
        .transactions
        .transfer(h.org.id, h.tier(), fresh)
        .await
        .unwrap_err();
    assert!(matches!(err, OpsError::Validation(_)));
}

// ============ BATCHES ============

#[tokio::test(start_paused = true)]
async fn test_batch_respects_concurrency_bound() {
    let chain = MockChain::new().with_latency(Duration::from_millis(50));
    let h = Harness::with_chain(Tier::Enterprise, OpsConfig::default(), chain);
    let wallet = h.wallet(100 * SOL).await;

    let requests = (0..20u8)
        .map(|i| TransferRequest::sol(wallet.id, recipient(100 + i), 1_000_000))
        .collect();
    let report = h
        .platform
        .transactions
        .batch_transfer(h.org.id, h.tier(), requests)
        .await
        .unwrap();

    assert_eq!(report.results.len(), 20);
    assert_eq!(report.succeeded(), 20);
    assert_eq!(h.chain.submitted_count(), 20);
    assert!(h.chain.max_in_flight() <= 5, "max in flight: {}", h.chain.max_in_flight());
    assert!(h.chain.max_in_flight() >= 2);
}

#[tokio::test]
async fn test_batch_reports_per_item_failures() {
    let h = Harness::new(Tier::Pro);
    let wallet = h.wallet(SOL).await;

    let requests = vec![
        TransferRequest::sol(wallet.id, recipient(9), 10_000),
        TransferRequest::sol(wallet.id, recipient(9), 0),
        TransferRequest::sol(wallet.id, recipient(10), 20_000),
    ];
    let report = h
        .platform
        .transactions
        .batch_transfer(h.org.id, h.tier(), requests)
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 2);
    let failures: Vec<usize> = report.failures().map(|(i, _)| i).collect();
    assert_eq!(failures, vec![1]);

    let too_many = (0..101)
        .map(|_| TransferRequest::sol(wallet.id, recipient(9), 1))
        .collect();
    assert!(matches!(
        h.platform.transactions.batch_transfer(h.org.id, h.tier(), too_many).await,
        Err(OpsError::Validation(_))
    ));
}

// ============ APPROVALS ============

#[tokio::test]
async fn test_approval_flow_executes_once() {
    let h = Harness::new(Tier::Pro);
    let wallet = h.wallet(10 * SOL).await;
    h.store
        .create_policy(&approval_policy(h.org.id, SOL))
        .await
        .unwrap();

    let err = h
        .platform
        .transactions
        .transfer(h.org.id, h.tier(), TransferRequest::sol(wallet.id, recipient(11), 2 * SOL))
        .await
        .unwrap_err();
    let request_id = match err {
        OpsError::ApprovalRequired { request_id } => request_id,
        other => panic!("expected approval, got {other:?}"),
    };
    assert_eq!(h.chain.submitted_count(), 0);

    let pending = h
        .platform
        .approvals
        .list(h.org.id, Some(ApprovalStatus::Pending), Page::default())
        .await
        .unwrap();
    assert_eq!(pending.total, 1);

    // Not yet approved.
    assert!(h
        .platform
        .approvals
        .execute_approved(h.org.id, request_id, h.tier())
        .await
        .is_err());

    let approved = h
        .platform
        .approvals
        .decide(h.org.id, request_id, "alice", true, Some("ok".into()))
        .await
        .unwrap();
    assert_eq!(approved.status, ApprovalStatus::Approved);

    let again = h
        .platform
        .approvals
        .decide(h.org.id, request_id, "bob", true, None)
        .await
        .unwrap_err();
    assert!(matches!(again, OpsError::StateError { .. }));

    let tx = h
        .platform
        .approvals
        .execute_approved(h.org.id, request_id, h.tier())
        .await
        .unwrap();
    assert_eq!(tx.status, TxStatus::Submitted);
    let replay = h
        .platform
        .approvals
        .execute_approved(h.org.id, request_id, h.tier())
        .await
        .unwrap();
    assert_eq!(tx.id, replay.id);
    assert_eq!(h.chain.submitted_count(), 1);
}

#[tokio::test]
async fn test_rejection_and_expiry() {
    let h = Harness::new(Tier::Pro);
    let wallet = h.wallet(10 * SOL).await;
    h.store
        .create_policy(&approval_policy(h.org.id, SOL))
        .await
        .unwrap();

    let held = |amount| TransferRequest::sol(wallet.id, recipient(12), amount);
    let first = match h.platform.transactions.transfer(h.org.id, h.tier(), held(2 * SOL)).await {
        Err(OpsError::ApprovalRequired { request_id }) => request_id,
        other => panic!("unexpected {other:?}"),
    };
    let second = match h.platform.transactions.transfer(h.org.id, h.tier(), held(3 * SOL)).await {
        Err(OpsError::ApprovalRequired { request_id }) => request_id,
        other => panic!("unexpected {other:?}"),
    };

    let rejected = h
        .platform
        .approvals
        .decide(h.org.id, first, "carol", false, Some("too large".into()))
        .await
        .unwrap();
    assert_eq!(rejected.status, ApprovalStatus::Rejected);

    h.clock.advance(chrono::Duration::hours(25));
    let expired = h.platform.approvals.expire_stale(h.clock.now()).await.unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].id, second);
    assert_eq!(
        h.platform.approvals.get(h.org.id, second).await.unwrap().status,
        ApprovalStatus::Expired
    );
}

// ============ WALLETS ============

#[tokio::test]
async fn test_free_tier_wallet_cap() {
    let h = Harness::new(Tier::Free);
    for _ in 0..5 {
        h.platform
            .wallets
            .create_wallet(h.org.id, h.tier(), None, WalletType::Agent, None)
            .await
            .unwrap();
    }
    let err = h
        .platform
        .wallets
        .create_wallet(h.org.id, h.tier(), None, WalletType::Agent, None)
        .await
        .unwrap_err();
    assert!(matches!(err, OpsError::TierLimit { limit: 5, .. }));

    let listed = h
        .platform
        .wallets
        .list_wallets(h.org.id, None, Some(WalletType::Agent), Page::default())
        .await
        .unwrap();
    assert_eq!(listed.total, 5);
    assert!(listed.items[0].label.starts_with("agent-"));
}

// ============ CONFIRMATION WORKER ============

#[tokio::test]
async fn test_confirmation_worker_settles_records() {
    let h = Harness::new(Tier::Pro);
    let wallet = h.wallet(10 * SOL).await;
    let transfer = |byte| TransferRequest::sol(wallet.id, recipient(byte), 1_000_000);

    let confirmed = h.platform.transactions.transfer(h.org.id, h.tier(), transfer(20)).await.unwrap();
    let reverted = h.platform.transactions.transfer(h.org.id, h.tier(), transfer(21)).await.unwrap();
    let stuck = h.platform.transactions.transfer(h.org.id, h.tier(), transfer(22)).await.unwrap();
    h.chain
        .set_status(reverted.signature.unwrap(), SignatureStatus::Failed("InstructionError".into()));
    h.chain.set_status(stuck.signature.unwrap(), SignatureStatus::Pending);

    let worker = h
        .platform
        .workers()
        .into_iter()
        .find(|w| w.name() == "tx_confirmation")
        .unwrap();
    assert_eq!(worker.tick().await.unwrap(), 2);

    let status = |id| {
        let transactions = h.platform.transactions.clone();
        let org_id = h.org.id;
        async move { transactions.get_transaction(org_id, id).await.unwrap() }
    };
    let settled = status(confirmed.id).await;
    assert_eq!(settled.status, TxStatus::Confirmed);
    assert!(settled.confirmed_at.is_some());
    assert_eq!(status(reverted.id).await.status, TxStatus::Failed);
    assert_eq!(status(stuck.id).await.status, TxStatus::Submitted);

    // Past the timeout the stuck record becomes `timeout`, never `failed`.
    h.clock.advance(chrono::Duration::minutes(5));
    assert_eq!(worker.tick().await.unwrap(), 1);
    assert_eq!(status(stuck.id).await.status, TxStatus::Timeout);

    // A late confirmation is still picked up.
    h.chain.set_status(stuck.signature.unwrap(), SignatureStatus::Confirmed);
    assert_eq!(worker.tick().await.unwrap(), 1);
    assert_eq!(status(stuck.id).await.status, TxStatus::Confirmed);
}
