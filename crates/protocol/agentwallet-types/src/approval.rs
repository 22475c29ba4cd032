//! Approval requests for transfers held by a policy threshold.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::TransferRequest;

/// Lifecycle of an approval request. Only `pending` accepts decisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Expired,
}

string_enum!(ApprovalStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
    Expired => "expired",
});

/// One approver's vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalDecision {
    pub approver: String,
    pub approved: bool,
    pub comment: Option<String>,
    pub decided_at: DateTime<Utc>,
}

/// A transfer that a policy held for human sign-off.
///
/// `request` is a full snapshot of the original transfer so it can be
/// replayed once approved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: Uuid,
    pub org_id: Uuid,
    pub request: TransferRequest,
    pub status: ApprovalStatus,
    pub required_approvals: u32,
    pub decisions: Vec<ApprovalDecision>,
    pub policy_id: Option<Uuid>,
    pub reason: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ApprovalRequest {
    /// Number of approving decisions so far.
    pub fn approval_count(&self) -> u32 {
        self.decisions.iter().filter(|d| d.approved).count() as u32
    }

    pub fn has_decided(&self, approver: &str) -> bool {
        self.decisions.iter().any(|d| d.approver == approver)
    }

    /// Append a decision and move to `approved` or `rejected` when the vote
    /// settles. The caller checks that the request is still pending.
    pub fn apply_decision(&mut self, decision: ApprovalDecision) {
        let at = decision.decided_at;
        let approved = decision.approved;
        self.decisions.push(decision);
        if !approved {
            self.status = ApprovalStatus::Rejected;
            self.resolved_at = Some(at);
        } else if self.approval_count() >= self.required_approvals {
            self.status = ApprovalStatus::Approved;
            self.resolved_at = Some(at);
        }
    }
}
