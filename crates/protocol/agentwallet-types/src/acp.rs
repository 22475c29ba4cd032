//! Agent Commerce Protocol: jobs, phases and memos.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Amount;

/// Phase of an ACP job.
///
/// ```text
/// request ─► negotiation ─► transaction ─► evaluation ─► completed
///    │            │              │  └──────────┐   │
///    └────────────┴──► cancelled ◄┘   disputed ◄┴───┘
///                          ▲            │
///                          └────────────┴─► resolved
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcpPhase {
    #[default]
    Request,
    Negotiation,
    Transaction,
    Evaluation,
    Completed,
    Cancelled,
    Disputed,
    Resolved,
}

string_enum!(AcpPhase {
    Request => "request",
    Negotiation => "negotiation",
    Transaction => "transaction",
    Evaluation => "evaluation",
    Completed => "completed",
    Cancelled => "cancelled",
    Disputed => "disputed",
    Resolved => "resolved",
});

impl AcpPhase {
    pub fn allowed_transitions(&self) -> &'static [AcpPhase] {
        use AcpPhase::*;
        match self {
            Request => &[Negotiation, Cancelled],
            Negotiation => &[Transaction, Cancelled],
            Transaction => &[Evaluation, Cancelled, Disputed],
            Evaluation => &[Completed, Disputed],
            Disputed => &[Resolved, Cancelled],
            Completed | Cancelled | Resolved => &[],
        }
    }

    pub fn can_transition_to(&self, target: AcpPhase) -> bool {
        self.allowed_transitions().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

/// Semantic tag of a memo. Serialized as its snake_case name; unknown names
/// become [`MemoType::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemoType {
    JobRequest,
    Agreement,
    Transaction,
    Deliverable,
    Evaluation,
    Cancellation,
    Dispute,
    Resolution,
    /// Free-form message between participants.
    Custom(String),
}

impl MemoType {
    pub fn as_str(&self) -> &str {
        match self {
            MemoType::JobRequest => "job_request",
            MemoType::Agreement => "agreement",
            MemoType::Transaction => "transaction",
            MemoType::Deliverable => "deliverable",
            MemoType::Evaluation => "evaluation",
            MemoType::Cancellation => "cancellation",
            MemoType::Dispute => "dispute",
            MemoType::Resolution => "resolution",
            MemoType::Custom(s) => s,
        }
    }
}

impl std::fmt::Display for MemoType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for MemoType {
    fn from(s: &str) -> Self {
        match s {
            "job_request" => MemoType::JobRequest,
            "agreement" => MemoType::Agreement,
            "transaction" => MemoType::Transaction,
            "deliverable" => MemoType::Deliverable,
            "evaluation" => MemoType::Evaluation,
            "cancellation" => MemoType::Cancellation,
            "dispute" => MemoType::Dispute,
            "resolution" => MemoType::Resolution,
            other => MemoType::Custom(other.to_string()),
        }
    }
}

impl Serialize for MemoType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MemoType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(MemoType::from(s.as_str()))
    }
}

/// A buyer/seller engagement negotiated through memos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcpJob {
    pub id: Uuid,
    pub org_id: Uuid,
    pub buyer_agent_id: Uuid,
    pub seller_agent_id: Uuid,
    pub evaluator_agent_id: Option<Uuid>,
    pub phase: AcpPhase,
    pub title: String,
    pub description: String,
    pub requirements: serde_json::Value,
    pub deliverables: serde_json::Value,
    pub agreed_terms: Option<serde_json::Value>,
    pub agreed_price: Amount,
    pub fund_transfer: bool,
    pub escrow_id: Option<Uuid>,
    pub result_data: Option<serde_json::Value>,
    pub evaluation_notes: Option<String>,
    pub evaluation_approved: Option<bool>,
    pub rating: Option<u8>,
    pub negotiated_at: Option<DateTime<Utc>>,
    pub transacted_at: Option<DateTime<Utc>>,
    pub evaluated_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AcpJob {
    /// Whether `agent_id` is the buyer or the seller.
    pub fn is_party(&self, agent_id: Uuid) -> bool {
        self.buyer_agent_id == agent_id || self.seller_agent_id == agent_id
    }

    /// The agent entitled to evaluate: the designated evaluator, or the
    /// buyer when none was assigned.
    pub fn effective_evaluator(&self) -> Uuid {
        self.evaluator_agent_id.unwrap_or(self.buyer_agent_id)
    }
}

/// Immutable entry in a job's audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcpMemo {
    pub id: Uuid,
    pub job_id: Uuid,
    pub sender_agent_id: Uuid,
    pub memo_type: MemoType,
    pub content: serde_json::Value,
    pub signature: Option<String>,
    pub tx_signature: Option<String>,
    pub advances_phase: bool,
    pub created_at: DateTime<Utc>,
}

/// A lightweight data endpoint an agent publishes for other agents to
/// discover. Unlike a job it carries no negotiation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceOffering {
    pub id: Uuid,
    pub org_id: Uuid,
    pub agent_id: Uuid,
    pub name: String,
    pub description: String,
    /// e.g. `/v1/resources/{id}/data`
    pub endpoint_path: String,
    pub parameters: serde_json::Value,
    pub response_schema: serde_json::Value,
    pub is_active: bool,
    pub total_calls: u64,
    pub avg_response_ms: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
