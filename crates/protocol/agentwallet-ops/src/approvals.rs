//! Human sign-off for transfers held by an approval threshold.

use std::sync::Arc;

use agentwallet_store::{DecisionOutcome, Store};
use agentwallet_types::{
    ApprovalDecision, ApprovalRequest, ApprovalStatus, Clock, Page, Paged, Tier, Transaction,
};
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::error::{OpsError, OpsResult};
use crate::transfer::TransactionEngine;

/// Approval request queue and executor.
#[derive(Clone)]
pub struct ApprovalService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    engine: TransactionEngine,
}

impl ApprovalService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, engine: TransactionEngine) -> Self {
        Self { store, clock, engine }
    }

    pub async fn get(&self, org_id: Uuid, id: Uuid) -> OpsResult<ApprovalRequest> {
        self.store
            .get_approval(org_id, id)
            .await?
            .ok_or_else(|| OpsError::not_found("approval request", id))
    }

    /// Newest first, optionally narrowed to one status.
    pub async fn list(
        &self,
        org_id: Uuid,
        status: Option<ApprovalStatus>,
        page: Page,
    ) -> OpsResult<Paged<ApprovalRequest>> {
        Ok(self.store.list_approvals(org_id, status, page).await?)
    }

    /// Record one approver's vote.
    ///
    /// A rejection settles the request at once; approvals settle it when
    /// `required_approvals` is reached. Returns the updated request.
    pub async fn decide(
        &self,
        org_id: Uuid,
        id: Uuid,
        approver: &str,
        approved: bool,
        comment: Option<String>,
    ) -> OpsResult<ApprovalRequest> {
        let approver = approver.trim();
        if approver.is_empty() {
            return Err(OpsError::validation("approver must not be empty"));
        }

        let decision = ApprovalDecision {
            approver: approver.to_string(),
            approved,
            comment,
            decided_at: self.clock.now(),
        };
        match self.store.record_decision(org_id, id, decision).await {
            Ok(DecisionOutcome::Recorded(request)) => {
                info!(
                    request_id = %id,
                    approver,
                    approved,
                    status = %request.status,
                    "Approval decision recorded"
                );
                Ok(request)
            }
            Ok(DecisionOutcome::DuplicateApprover(_)) => Err(OpsError::validation(format!(
                "{} has already decided request {}",
                approver, id
            ))),
            Ok(DecisionOutcome::NotPending(request)) => {
                let target = if approved {
                    ApprovalStatus::Approved
                } else {
                    ApprovalStatus::Rejected
                };
                Err(OpsError::state("approval request", request.status, target, &[]))
            }
            Err(e) if e.is_not_found() => Err(OpsError::not_found("approval request", id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Run the held transfer of an approved request.
    ///
    /// The approval id becomes the idempotency key, so executing the same
    /// request twice returns the first transaction.
    pub async fn execute_approved(&self, org_id: Uuid, id: Uuid, tier: Tier) -> OpsResult<Transaction> {
        let approval = self.get(org_id, id).await?;
        if approval.status != ApprovalStatus::Approved {
            return Err(OpsError::validation(format!(
                "approval request {} is {}, not approved",
                id, approval.status
            )));
        }

        let request = approval.request.with_idempotency_key(approval.id.to_string());
        let tx = self.engine.execute_approved(org_id, tier, request, approval.id).await?;
        info!(request_id = %id, tx_id = %tx.id, "Approved transfer executed");
        Ok(tx)
    }

    /// Expire pending requests older than their deadline.
    pub async fn expire_stale(&self, now: DateTime<Utc>) -> OpsResult<Vec<ApprovalRequest>> {
        let expired = self.store.expire_approvals(now).await?;
        for request in &expired {
            info!(request_id = %request.id, "Approval request expired");
        }
        Ok(expired)
    }
}

impl std::fmt::Debug for ApprovalService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApprovalService").field("engine", &self.engine).finish()
    }
}
