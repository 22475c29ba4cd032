//! Agent Commerce Protocol jobs.
//!
//! A job moves `request -> negotiation -> transaction -> evaluation ->
//! completed`, with side exits to `cancelled` and `disputed`. Each step is
//! taken by a specific participant and leaves a memo in the job's
//! append-only log, written in the same store operation as the phase change.
//!
//! Agents can also publish [`ResourceOffering`]s: data endpoints other
//! agents discover without negotiating a job.

use std::sync::Arc;

use agentwallet_store::{AcpJobFilter, OfferingFilter, Store};
use agentwallet_types::{AcpJob, AcpMemo, AcpPhase, Clock, MemoType, Page, Paged, ResourceOffering};
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{OpsError, OpsResult};

/// Parameters of a new job.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub buyer_agent_id: Uuid,
    pub seller_agent_id: Uuid,
    pub evaluator_agent_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub price: u64,
    pub requirements: Value,
    pub deliverables: Value,
    pub fund_transfer: bool,
}

impl NewJob {
    pub fn new(buyer_agent_id: Uuid, seller_agent_id: Uuid, title: impl Into<String>, price: u64) -> Self {
        Self {
            buyer_agent_id,
            seller_agent_id,
            evaluator_agent_id: None,
            title: title.into(),
            description: String::new(),
            price,
            requirements: json!({}),
            deliverables: json!({}),
            fund_transfer: false,
        }
    }

    pub fn with_evaluator(mut self, evaluator: Uuid) -> Self {
        self.evaluator_agent_id = Some(evaluator);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Parameters of a new resource offering.
#[derive(Debug, Clone)]
pub struct NewOffering {
    pub agent_id: Uuid,
    pub name: String,
    pub description: String,
    pub endpoint_path: String,
    pub parameters: Value,
    pub response_schema: Value,
}

impl NewOffering {
    pub fn new(
        agent_id: Uuid,
        name: impl Into<String>,
        description: impl Into<String>,
        endpoint_path: impl Into<String>,
    ) -> Self {
        Self {
            agent_id,
            name: name.into(),
            description: description.into(),
            endpoint_path: endpoint_path.into(),
            parameters: json!({}),
            response_schema: json!({}),
        }
    }

    fn validate(&self) -> OpsResult<()> {
        let name_len = self.name.trim().chars().count();
        if name_len == 0 || name_len > MAX_OFFERING_NAME {
            return Err(OpsError::validation(format!(
                "offering name must be 1-{} characters",
                MAX_OFFERING_NAME
            )));
        }
        if self.description.trim().is_empty() {
            return Err(OpsError::validation("offering description must not be empty"));
        }
        let path_len = self.endpoint_path.trim().chars().count();
        if path_len == 0 || path_len > MAX_ENDPOINT_PATH {
            return Err(OpsError::validation(format!(
                "endpoint_path must be 1-{} characters",
                MAX_ENDPOINT_PATH
            )));
        }
        Ok(())
    }
}

const MAX_OFFERING_NAME: usize = 255;
const MAX_ENDPOINT_PATH: usize = 500;

/// Who may take a step.
#[derive(Debug, Clone, Copy)]
enum Role {
    Buyer,
    Seller,
    BuyerOrSeller,
    Evaluator,
}

impl Role {
    fn permits(self, job: &AcpJob, agent_id: Uuid) -> bool {
        match self {
            Role::Buyer => job.buyer_agent_id == agent_id,
            Role::Seller => job.seller_agent_id == agent_id,
            Role::BuyerOrSeller => job.is_party(agent_id),
            Role::Evaluator => job.effective_evaluator() == agent_id,
        }
    }

    fn describe(self, job: &AcpJob) -> &'static str {
        match self {
            Role::Buyer => "the buyer",
            Role::Seller => "the seller",
            Role::BuyerOrSeller => "the buyer or the seller",
            Role::Evaluator if job.evaluator_agent_id.is_some() => "the assigned evaluator",
            Role::Evaluator => "the buyer (no evaluator assigned)",
        }
    }
}

/// Drives ACP jobs through their phases.
#[derive(Clone)]
pub struct AcpService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl AcpService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Open a job in the `request` phase with a `job_request` memo from the
    /// buyer.
    pub async fn create_job(&self, org_id: Uuid, params: NewJob) -> OpsResult<AcpJob> {
        if params.title.trim().is_empty() {
            return Err(OpsError::validation("title must not be empty"));
        }
        if params.buyer_agent_id == params.seller_agent_id {
            return Err(OpsError::validation("buyer and seller must be different agents"));
        }

        let now = self.clock.now();
        let job = AcpJob {
            id: Uuid::new_v4(),
            org_id,
            buyer_agent_id: params.buyer_agent_id,
            seller_agent_id: params.seller_agent_id,
            evaluator_agent_id: params.evaluator_agent_id,
            phase: AcpPhase::Request,
            title: params.title,
            description: params.description,
            requirements: params.requirements,
            deliverables: params.deliverables,
            agreed_terms: None,
            agreed_price: params.price,
            fund_transfer: params.fund_transfer,
            escrow_id: None,
            result_data: None,
            evaluation_notes: None,
            evaluation_approved: None,
            rating: None,
            negotiated_at: None,
            transacted_at: None,
            evaluated_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        let content = json!({
            "title": job.title,
            "description": job.description,
            "price": job.agreed_price,
        });
        let request = self.memo(&job, job.buyer_agent_id, MemoType::JobRequest, content, None, false);
        self.store.create_job(&job, &request).await?;

        info!(job_id = %job.id, price = job.agreed_price, "ACP job created");
        Ok(job)
    }

    /// Seller proposes terms, optionally changing the price.
    pub async fn negotiate(
        &self,
        org_id: Uuid,
        job_id: Uuid,
        seller: Uuid,
        terms: Value,
        price: Option<u64>,
    ) -> OpsResult<AcpJob> {
        let memo = terms.clone();
        self.advance(org_id, job_id, seller, Role::Seller, AcpPhase::Negotiation, MemoType::Agreement, |job| {
            job.agreed_terms = Some(terms);
            if let Some(price) = price {
                job.agreed_price = price;
            }
            memo
        })
        .await
    }

    /// Buyer commits to the agreed price.
    pub async fn start_transaction(&self, org_id: Uuid, job_id: Uuid, buyer: Uuid) -> OpsResult<AcpJob> {
        self.advance(org_id, job_id, buyer, Role::Buyer, AcpPhase::Transaction, MemoType::Transaction, |job| {
            json!({ "funded": true, "amount": job.agreed_price })
        })
        .await
    }

    /// Seller hands over the result.
    pub async fn deliver(
        &self,
        org_id: Uuid,
        job_id: Uuid,
        seller: Uuid,
        result: Value,
        notes: Option<String>,
    ) -> OpsResult<AcpJob> {
        self.advance(org_id, job_id, seller, Role::Seller, AcpPhase::Evaluation, MemoType::Deliverable, |job| {
            job.result_data = Some(result.clone());
            json!({ "result": result, "notes": notes })
        })
        .await
    }

    /// Accept or reject the delivery. Approval completes the job; rejection
    /// disputes it.
    pub async fn evaluate(
        &self,
        org_id: Uuid,
        job_id: Uuid,
        evaluator: Uuid,
        approved: bool,
        notes: Option<String>,
        rating: Option<u8>,
    ) -> OpsResult<AcpJob> {
        if let Some(rating) = rating {
            if !(1..=5).contains(&rating) {
                return Err(OpsError::validation(format!("rating must be 1-5, got {}", rating)));
            }
        }

        let target = if approved {
            AcpPhase::Completed
        } else {
            AcpPhase::Disputed
        };
        self.advance(org_id, job_id, evaluator, Role::Evaluator, target, MemoType::Evaluation, |job| {
            job.evaluation_approved = Some(approved);
            job.evaluation_notes = notes.clone();
            if approved {
                job.rating = rating;
                json!({ "approved": true, "notes": notes, "rating": rating })
            } else {
                json!({ "approved": false, "notes": notes })
            }
        })
        .await
    }

    pub async fn cancel(&self, org_id: Uuid, job_id: Uuid, agent: Uuid, reason: &str) -> OpsResult<AcpJob> {
        self.advance(org_id, job_id, agent, Role::BuyerOrSeller, AcpPhase::Cancelled, MemoType::Cancellation, |_| {
            json!({ "reason": reason })
        })
        .await
    }

    pub async fn dispute(&self, org_id: Uuid, job_id: Uuid, agent: Uuid, reason: &str) -> OpsResult<AcpJob> {
        if reason.trim().is_empty() {
            return Err(OpsError::validation("dispute reason must not be empty"));
        }
        self.advance(org_id, job_id, agent, Role::BuyerOrSeller, AcpPhase::Disputed, MemoType::Dispute, |_| {
            json!({ "reason": reason })
        })
        .await
    }

    /// Settle a disputed job.
    pub async fn resolve(&self, org_id: Uuid, job_id: Uuid, agent: Uuid, resolution: &str) -> OpsResult<AcpJob> {
        self.advance(org_id, job_id, agent, Role::Evaluator, AcpPhase::Resolved, MemoType::Resolution, |_| {
            json!({ "resolution": resolution })
        })
        .await
    }

    /// Append a free-form memo. Never changes the phase.
    pub async fn send_memo(
        &self,
        org_id: Uuid,
        job_id: Uuid,
        sender: Uuid,
        memo_type: MemoType,
        content: Value,
        signature: Option<String>,
    ) -> OpsResult<AcpMemo> {
        let job = self.get_job(org_id, job_id).await?;
        if !job.is_party(sender) && job.evaluator_agent_id != Some(sender) {
            return Err(OpsError::validation(format!(
                "agent {} is not a participant of job {}",
                sender, job_id
            )));
        }
        let memo = self.memo(&job, sender, memo_type, content, signature, false);
        self.store.append_memo(&memo).await?;
        debug!(job_id = %job.id, memo_type = %memo.memo_type, "Memo appended");
        Ok(memo)
    }

    /// The memo log in creation order.
    pub async fn list_memos(&self, org_id: Uuid, job_id: Uuid) -> OpsResult<Vec<AcpMemo>> {
        self.get_job(org_id, job_id).await?;
        Ok(self.store.list_memos(job_id).await?)
    }

    pub async fn get_job(&self, org_id: Uuid, job_id: Uuid) -> OpsResult<AcpJob> {
        self.store
            .get_job(org_id, job_id)
            .await?
            .ok_or_else(|| OpsError::not_found("acp job", job_id))
    }

    /// Newest first. `agent` matches buyer, seller or evaluator.
    pub async fn list_jobs(
        &self,
        org_id: Uuid,
        agent: Option<Uuid>,
        phase: Option<AcpPhase>,
        page: Page,
    ) -> OpsResult<Paged<AcpJob>> {
        let filter = AcpJobFilter { agent_id: agent, phase };
        Ok(self.store.list_jobs(org_id, &filter, page).await?)
    }

    /// Publish a data endpoint for discovery.
    pub async fn create_offering(&self, org_id: Uuid, params: NewOffering) -> OpsResult<ResourceOffering> {
        params.validate()?;
        let now = self.clock.now();
        let offering = ResourceOffering {
            id: Uuid::new_v4(),
            org_id,
            agent_id: params.agent_id,
            name: params.name.trim().to_string(),
            description: params.description,
            endpoint_path: params.endpoint_path.trim().to_string(),
            parameters: params.parameters,
            response_schema: params.response_schema,
            is_active: true,
            total_calls: 0,
            avg_response_ms: 0.0,
            created_at: now,
            updated_at: now,
        };
        self.store.create_offering(&offering).await?;
        info!(offering_id = %offering.id, agent_id = %offering.agent_id, name = %offering.name, "Resource offering published");
        Ok(offering)
    }

    /// Active offerings, newest first. Without `org_id` this lists across
    /// organizations.
    pub async fn list_offerings(
        &self,
        org_id: Option<Uuid>,
        agent_id: Option<Uuid>,
        page: Page,
    ) -> OpsResult<Paged<ResourceOffering>> {
        let filter = OfferingFilter { org_id, agent_id };
        Ok(self.store.list_offerings(&filter, page).await?)
    }

    /// Check role and transition, apply `update`, then persist the job and
    /// the returned memo content with one phase compare-and-update.
    #[allow(clippy::too_many_arguments)]
    async fn advance<F>(
        &self,
        org_id: Uuid,
        job_id: Uuid,
        agent: Uuid,
        role: Role,
        target: AcpPhase,
        memo_type: MemoType,
        update: F,
    ) -> OpsResult<AcpJob>
    where
        F: FnOnce(&mut AcpJob) -> Value,
    {
        let mut job = self.get_job(org_id, job_id).await?;
        if !role.permits(&job, agent) {
            return Err(OpsError::validation(format!(
                "only {} can move job {} to {}",
                role.describe(&job),
                job_id,
                target
            )));
        }

        let current = job.phase;
        if !current.can_transition_to(target) {
            return Err(OpsError::state("acp job", current, target, current.allowed_transitions()));
        }

        let content = update(&mut job);
        let now = self.clock.now();
        job.phase = target;
        job.updated_at = now;
        match target {
            AcpPhase::Negotiation => job.negotiated_at = Some(now),
            AcpPhase::Transaction => job.transacted_at = Some(now),
            AcpPhase::Evaluation => job.evaluated_at = Some(now),
            AcpPhase::Completed => job.completed_at = Some(now),
            _ => {}
        }

        let memo = self.memo(&job, agent, memo_type, content, None, true);
        if !self.store.advance_job(&job, current, &memo).await? {
            let latest = self.get_job(org_id, job_id).await?;
            return Err(OpsError::state(
                "acp job",
                latest.phase,
                target,
                latest.phase.allowed_transitions(),
            ));
        }

        info!(job_id = %job_id, from = %current, to = %target, "ACP phase advanced");
        Ok(job)
    }

    fn memo(
        &self,
        job: &AcpJob,
        sender: Uuid,
        memo_type: MemoType,
        content: Value,
        signature: Option<String>,
        advances_phase: bool,
    ) -> AcpMemo {
        AcpMemo {
            id: Uuid::new_v4(),
            job_id: job.id,
            sender_agent_id: sender,
            memo_type,
            content,
            signature,
            tx_signature: None,
            advances_phase,
            created_at: self.clock.now(),
        }
    }
}

impl std::fmt::Debug for AcpService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcpService").field("clock", &self.clock).finish()
    }
}
