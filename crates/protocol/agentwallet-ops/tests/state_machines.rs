//! Escrow and ACP lifecycle tests.

mod common;

use agentwallet_chain::{ChainError, SignatureStatus};
use agentwallet_crypto::Hash;
use agentwallet_ops::{EscrowEvent, NewEscrow, NewJob, NewOffering, OpsConfig, OpsError};
use agentwallet_types::{AcpPhase, Clock, EscrowStatus, MemoType, Page, Tier};
use common::{recipient, Harness, SOL};
use serde_json::json;
use uuid::Uuid;

// ============ ESCROW ============

#[tokio::test]
async fn test_escrow_funds_and_releases() {
    let h = Harness::new(Tier::Pro);
    let funder = h.wallet(5 * SOL).await;
    let mut events = h.platform.escrows.subscribe();

    let escrow = h
        .platform
        .escrows
        .create_escrow(h.org.id, NewEscrow::new(funder.id, recipient(30), SOL))
        .await
        .unwrap();
    assert_eq!(escrow.status, EscrowStatus::Funded);
    assert!(escrow.fund_signature.is_some());
    assert!(escrow.funded_at.is_some());
    // No platform wallet configured: funds go straight to the recipient.
    assert_eq!(escrow.escrow_address, Some(recipient(30)));
    assert_eq!(h.chain.balance(&recipient(30)), SOL);

    let released = h.platform.escrows.release(h.org.id, escrow.id).await.unwrap();
    assert_eq!(released.status, EscrowStatus::Released);
    assert!(released.completed_at.is_some());

    assert_eq!(
        events.recv().await.unwrap(),
        EscrowEvent::Funded {
            escrow_id: escrow.id,
            org_id: h.org.id
        }
    );
    assert_eq!(
        events.recv().await.unwrap(),
        EscrowEvent::Released {
            escrow_id: escrow.id,
            org_id: h.org.id
        }
    );

    let err = h.platform.escrows.refund(h.org.id, escrow.id).await.unwrap_err();
    match err {
        OpsError::StateError {
            entity,
            current,
            target,
            allowed,
        } => {
            assert_eq!(entity, "escrow");
            assert_eq!(current, "released");
            assert_eq!(target, "refunded");
            assert!(allowed.is_empty());
        }
        other => panic!("expected state error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_escrow_to_platform_wallet() {
    let holder = recipient(250);
    let h = Harness::with_config(Tier::Pro, OpsConfig::default().with_platform_wallet(holder));
    let funder = h.wallet(5 * SOL).await;

    let escrow = h
        .platform
        .escrows
        .create_escrow(h.org.id, NewEscrow::new(funder.id, recipient(31), 2 * SOL))
        .await
        .unwrap();
    assert_eq!(escrow.escrow_address, Some(holder));
    assert_eq!(h.chain.balance(&holder), 2 * SOL);
    assert_eq!(h.chain.balance(&recipient(31)), 0);
}

#[tokio::test]
async fn test_unfunded_escrow_stays_created() {
    let h = Harness::new(Tier::Pro);
    let funder = h.wallet(5 * SOL).await;
    h.chain.fail_next_send(ChainError::network("connection reset"));

    let escrow = h
        .platform
        .escrows
        .create_escrow(h.org.id, NewEscrow::new(funder.id, recipient(32), SOL))
        .await
        .unwrap();
    assert_eq!(escrow.status, EscrowStatus::Created);
    assert!(escrow.fund_signature.is_none());

    // created -> released skips funding.
    let err = h.platform.escrows.release(h.org.id, escrow.id).await.unwrap_err();
    assert!(err.to_string().contains("allowed: funded"));

    let funded = h.platform.escrows.fund(h.org.id, escrow.id).await.unwrap();
    assert_eq!(funded.status, EscrowStatus::Funded);
    assert!(h.platform.escrows.fund(h.org.id, escrow.id).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_funding_retry_waits_for_earlier_transfer() {
    let h = Harness::new(Tier::Pro);
    let funder = h.wallet(5 * SOL).await;
    h.chain.set_default_status(SignatureStatus::Pending);

    let escrow = h
        .platform
        .escrows
        .create_escrow(h.org.id, NewEscrow::new(funder.id, recipient(36), SOL))
        .await
        .unwrap();
    assert_eq!(escrow.status, EscrowStatus::Created);
    let first = escrow.fund_signature.unwrap();
    assert_eq!(h.chain.submitted_count(), 1);

    // Still pending: nothing new is sent.
    let still = h.platform.escrows.fund(h.org.id, escrow.id).await.unwrap();
    assert_eq!(still.status, EscrowStatus::Created);
    assert_eq!(h.chain.submitted_count(), 1);

    // The first transfer lands late.
    h.chain.set_default_status(SignatureStatus::Confirmed);
    let funded = h.platform.escrows.fund(h.org.id, escrow.id).await.unwrap();
    assert_eq!(funded.status, EscrowStatus::Funded);
    assert_eq!(funded.fund_signature, Some(first));
    assert_eq!(h.chain.submitted_count(), 1);
    assert_eq!(h.chain.balance(&recipient(36)), SOL);
}

#[tokio::test]
async fn test_reverted_funding_is_resubmitted() {
    let h = Harness::new(Tier::Pro);
    let funder = h.wallet(5 * SOL).await;
    h.chain.set_default_status(SignatureStatus::Failed("InstructionError".into()));

    let escrow = h
        .platform
        .escrows
        .create_escrow(h.org.id, NewEscrow::new(funder.id, recipient(37), SOL))
        .await
        .unwrap();
    assert_eq!(escrow.status, EscrowStatus::Created);
    let first = escrow.fund_signature.unwrap();
    h.chain.set_status(first, SignatureStatus::Failed("InstructionError".into()));

    h.chain.set_default_status(SignatureStatus::Confirmed);
    h.chain.set_blockhash(Hash([7; 32]));
    let funded = h.platform.escrows.fund(h.org.id, escrow.id).await.unwrap();
    assert_eq!(funded.status, EscrowStatus::Funded);
    assert_ne!(funded.fund_signature, Some(first));
    assert_eq!(h.chain.submitted_count(), 2);
}

#[tokio::test]
async fn test_escrow_dispute_and_resolve() {
    let h = Harness::new(Tier::Pro);
    let funder = h.wallet(5 * SOL).await;
    let escrow = h
        .platform
        .escrows
        .create_escrow(h.org.id, NewEscrow::new(funder.id, recipient(33), SOL))
        .await
        .unwrap();

    assert!(matches!(
        h.platform.escrows.dispute(h.org.id, escrow.id, "  ").await,
        Err(OpsError::Validation(_))
    ));
    let disputed = h
        .platform
        .escrows
        .dispute(h.org.id, escrow.id, "work not delivered")
        .await
        .unwrap();
    assert_eq!(disputed.status, EscrowStatus::Disputed);
    assert_eq!(disputed.dispute_reason.as_deref(), Some("work not delivered"));
    assert!(disputed.completed_at.is_none());

    let resolved = h
        .platform
        .escrows
        .resolve(h.org.id, escrow.id, "split agreed")
        .await
        .unwrap();
    assert_eq!(resolved.status, EscrowStatus::Resolved);
    assert!(resolved.completed_at.is_some());

    // Resolved accepts nothing.
    assert!(h.platform.escrows.refund(h.org.id, escrow.id).await.is_err());
    assert!(h.platform.escrows.release(h.org.id, escrow.id).await.is_err());
}

#[tokio::test]
async fn test_escrow_expiry_sweep() {
    let h = Harness::new(Tier::Pro);
    let funder = h.wallet(5 * SOL).await;
    let mut short = NewEscrow::new(funder.id, recipient(34), SOL / 2);
    short.expires_in_hours = Some(1);
    let expiring = h.platform.escrows.create_escrow(h.org.id, short).await.unwrap();
    let lasting = h
        .platform
        .escrows
        .create_escrow(h.org.id, NewEscrow::new(funder.id, recipient(35), SOL / 2))
        .await
        .unwrap();
    let mut events = h.platform.escrows.subscribe();

    h.clock.advance(chrono::Duration::hours(2));
    let expired = h.platform.escrows.expire_stale(h.clock.now()).await.unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].id, expiring.id);
    assert_eq!(events.recv().await.unwrap().escrow_id(), expiring.id);

    let listed = h
        .platform
        .escrows
        .list(h.org.id, Some(EscrowStatus::Funded), Page::default())
        .await
        .unwrap();
    assert_eq!(listed.total, 1);
    assert_eq!(listed.items[0].id, lasting.id);
}

#[tokio::test]
async fn test_escrow_is_org_scoped() {
    let h = Harness::new(Tier::Pro);
    let funder = h.wallet(5 * SOL).await;
    let escrow = h
        .platform
        .escrows
        .create_escrow(h.org.id, NewEscrow::new(funder.id, recipient(36), SOL))
        .await
        .unwrap();

    let err = h.platform.escrows.get(Uuid::new_v4(), escrow.id).await.unwrap_err();
    assert!(matches!(err, OpsError::NotFound { entity: "escrow", .. }));
}

// ============ ACP ============

struct Agents {
    buyer: Uuid,
    seller: Uuid,
    evaluator: Uuid,
}

fn agents() -> Agents {
    Agents {
        buyer: Uuid::new_v4(),
        seller: Uuid::new_v4(),
        evaluator: Uuid::new_v4(),
    }
}

#[tokio::test]
async fn test_acp_happy_path_with_evaluator() {
    let h = Harness::new(Tier::Pro);
    let a = agents();
    let acp = &h.platform.acp;

    let job = acp
        .create_job(
            h.org.id,
            NewJob::new(a.buyer, a.seller, "Summarize filings", 50_000_000)
                .with_evaluator(a.evaluator)
                .with_description("Q3 10-K summaries"),
        )
        .await
        .unwrap();
    assert_eq!(job.phase, AcpPhase::Request);

    // Only the seller negotiates.
    assert!(matches!(
        acp.negotiate(h.org.id, job.id, a.buyer, json!({"deadline": "friday"}), None).await,
        Err(OpsError::Validation(_))
    ));
    let job = acp
        .negotiate(h.org.id, job.id, a.seller, json!({"deadline": "friday"}), Some(60_000_000))
        .await
        .unwrap();
    assert_eq!(job.phase, AcpPhase::Negotiation);
    assert_eq!(job.agreed_price, 60_000_000);
    assert!(job.negotiated_at.is_some());

    let job = acp.start_transaction(h.org.id, job.id, a.buyer).await.unwrap();
    assert_eq!(job.phase, AcpPhase::Transaction);

    let job = acp
        .deliver(h.org.id, job.id, a.seller, json!({"summary": "..."}), Some("done".into()))
        .await
        .unwrap();
    assert_eq!(job.phase, AcpPhase::Evaluation);
    assert!(job.result_data.is_some());

    // With an evaluator assigned, neither seller nor buyer may evaluate.
    assert!(matches!(
        acp.evaluate(h.org.id, job.id, a.seller, true, None, Some(5)).await,
        Err(OpsError::Validation(_))
    ));
    assert!(matches!(
        acp.evaluate(h.org.id, job.id, a.buyer, true, None, Some(5)).await,
        Err(OpsError::Validation(_))
    ));
    assert!(matches!(
        acp.evaluate(h.org.id, job.id, a.evaluator, true, None, Some(6)).await,
        Err(OpsError::Validation(_))
    ));
    let job = acp
        .evaluate(h.org.id, job.id, a.evaluator, true, Some("great".into()), Some(5))
        .await
        .unwrap();
    assert_eq!(job.phase, AcpPhase::Completed);
    assert_eq!(job.rating, Some(5));
    assert!(job.completed_at.is_some());

    let memos = acp.list_memos(h.org.id, job.id).await.unwrap();
    let kinds: Vec<&str> = memos.iter().map(|m| m.memo_type.as_str()).collect();
    assert_eq!(
        kinds,
        vec!["job_request", "agreement", "transaction", "deliverable", "evaluation"]
    );
    assert!(!memos[0].advances_phase);
    assert!(memos[1..].iter().all(|m| m.advances_phase));
    assert_eq!(memos[2].content, json!({"funded": true, "amount": 60_000_000}));
}

#[tokio::test]
async fn test_acp_buyer_evaluates_without_evaluator() {
    let h = Harness::new(Tier::Pro);
    let a = agents();
    let acp = &h.platform.acp;

    let job = acp
        .create_job(h.org.id, NewJob::new(a.buyer, a.seller, "Label images", 1_000))
        .await
        .unwrap();
    acp.negotiate(h.org.id, job.id, a.seller, json!({}), None).await.unwrap();
    acp.start_transaction(h.org.id, job.id, a.buyer).await.unwrap();
    acp.deliver(h.org.id, job.id, a.seller, json!({"labels": 100}), None)
        .await
        .unwrap();

    let job = acp
        .evaluate(h.org.id, job.id, a.buyer, false, Some("wrong labels".into()), None)
        .await
        .unwrap();
    assert_eq!(job.phase, AcpPhase::Disputed);
    assert_eq!(job.evaluation_approved, Some(false));

    let job = acp
        .resolve(h.org.id, job.id, a.buyer, "partial refund")
        .await
        .unwrap();
    assert_eq!(job.phase, AcpPhase::Resolved);
}

#[tokio::test]
async fn test_acp_illegal_transitions() {
    let h = Harness::new(Tier::Pro);
    let a = agents();
    let acp = &h.platform.acp;

    let job = acp
        .create_job(h.org.id, NewJob::new(a.buyer, a.seller, "Translate docs", 1_000))
        .await
        .unwrap();

    let err = acp.start_transaction(h.org.id, job.id, a.buyer).await.unwrap_err();
    assert!(matches!(err, OpsError::StateError { entity: "acp job", .. }));

    // Disputes need a transaction in flight.
    assert!(acp.dispute(h.org.id, job.id, a.seller, "stalled").await.is_err());

    let job = acp.cancel(h.org.id, job.id, a.seller, "unavailable").await.unwrap();
    assert_eq!(job.phase, AcpPhase::Cancelled);
    assert!(acp.negotiate(h.org.id, job.id, a.seller, json!({}), None).await.is_err());
}

#[tokio::test]
async fn test_acp_free_form_memos() {
    let h = Harness::new(Tier::Pro);
    let a = agents();
    let acp = &h.platform.acp;
    let job = acp
        .create_job(h.org.id, NewJob::new(a.buyer, a.seller, "Research", 1_000))
        .await
        .unwrap();

    let memo = acp
        .send_memo(
            h.org.id,
            job.id,
            a.seller,
            MemoType::from("question"),
            json!({"text": "which sources?"}),
            Some("sig".into()),
        )
        .await
        .unwrap();
    assert_eq!(memo.memo_type, MemoType::Custom("question".into()));
    assert!(!memo.advances_phase);

    let outsider = Uuid::new_v4();
    assert!(acp
        .send_memo(h.org.id, job.id, outsider, MemoType::from("spam"), json!({}), None)
        .await
        .is_err());

    let unchanged = acp.get_job(h.org.id, job.id).await.unwrap();
    assert_eq!(unchanged.phase, AcpPhase::Request);

    let mine = acp
        .list_jobs(h.org.id, Some(a.seller), None, Page::default())
        .await
        .unwrap();
    assert_eq!(mine.total, 1);
    let none = acp
        .list_jobs(h.org.id, Some(outsider), None, Page::default())
        .await
        .unwrap();
    assert_eq!(none.total, 0);
}

#[tokio::test]
async fn test_racing_advances_leave_one_memo() {
    let h = Harness::new(Tier::Pro);
    let a = agents();
    let acp = &h.platform.acp;
    let job = acp
        .create_job(h.org.id, NewJob::new(a.buyer, a.seller, "Scrape prices", 1_000))
        .await
        .unwrap();

    let (first, second) = tokio::join!(
        acp.negotiate(h.org.id, job.id, a.seller, json!({"round": 1}), None),
        acp.negotiate(h.org.id, job.id, a.seller, json!({"round": 2}), None),
    );
    assert_eq!([first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count(), 1);
    let loser = if first.is_ok() { second } else { first };
    assert!(matches!(loser, Err(OpsError::StateError { .. })));

    let memos = acp.list_memos(h.org.id, job.id).await.unwrap();
    let kinds: Vec<&str> = memos.iter().map(|m| m.memo_type.as_str()).collect();
    assert_eq!(kinds, vec!["job_request", "agreement"]);
    assert!(memos[1].advances_phase);
}

// ============ OFFERINGS ============

#[tokio::test]
async fn test_publish_and_discover_offerings() {
    let h = Harness::new(Tier::Pro);
    let acp = &h.platform.acp;
    let (oracle, scraper) = (Uuid::new_v4(), Uuid::new_v4());

    let mut params = NewOffering::new(oracle, "  SOL price feed ", "Spot price every minute", "/v1/resources/sol/price");
    params.parameters = json!({"interval": "1m"});
    let offering = acp.create_offering(h.org.id, params).await.unwrap();
    assert_eq!(offering.name, "SOL price feed");
    assert!(offering.is_active);
    assert_eq!(offering.total_calls, 0);
    assert_eq!(offering.created_at, h.clock.now());

    acp.create_offering(h.org.id, NewOffering::new(scraper, "Listings", "New token listings", "/v1/listings"))
        .await
        .unwrap();
    let elsewhere = Uuid::new_v4();
    acp.create_offering(elsewhere, NewOffering::new(oracle, "ETH price feed", "Spot price", "/v1/eth"))
        .await
        .unwrap();

    let ours = acp.list_offerings(Some(h.org.id), None, Page::default()).await.unwrap();
    assert_eq!(ours.total, 2);
    let by_oracle = acp.list_offerings(None, Some(oracle), Page::default()).await.unwrap();
    assert_eq!(by_oracle.total, 2);
    let everything = acp.list_offerings(None, None, Page::default()).await.unwrap();
    assert_eq!(everything.total, 3);
}

#[tokio::test]
async fn test_offering_validation() {
    let h = Harness::new(Tier::Pro);
    let acp = &h.platform.acp;
    let agent = Uuid::new_v4();

    for params in [
        NewOffering::new(agent, "   ", "desc", "/v1/x"),
        NewOffering::new(agent, "x".repeat(256), "desc", "/v1/x"),
        NewOffering::new(agent, "feed", "", "/v1/x"),
        NewOffering::new(agent, "feed", "desc", ""),
        NewOffering::new(agent, "feed", "desc", format!("/{}", "p".repeat(500))),
    ] {
        assert!(matches!(
            acp.create_offering(h.org.id, params).await,
            Err(OpsError::Validation(_))
        ));
    }
    assert_eq!(acp.list_offerings(Some(h.org.id), None, Page::default()).await.unwrap().total, 0);
}
