use agentwallet_types::{ApprovalDecision, ApprovalRequest, ApprovalStatus, Page, Paged};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{millis, query_docs, query_one, query_page, text, to_doc, Filter, SqliteStore};
use crate::error::{Result, StoreError};
use crate::traits::ApprovalStore;
use crate::types::DecisionOutcome;

fn write_status(conn: &Connection, request: &ApprovalRequest) -> Result<()> {
    conn.execute(
        "UPDATE approvals SET status = ?2, doc = ?3 WHERE id = ?1",
        params![request.id.to_string(), request.status.as_str(), to_doc(request)?],
    )?;
    Ok(())
}

#[async_trait]
impl ApprovalStore for SqliteStore {
    async fn create_approval(&self, request: &ApprovalRequest) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO approvals (id, org_id, status, expires_at, created_at, doc)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                request.id.to_string(),
                request.org_id.to_string(),
                request.status.as_str(),
                millis(request.expires_at),
                millis(request.created_at),
                to_doc(request)?,
            ],
        )?;
        Ok(())
    }

    async fn get_approval(&self, org_id: Uuid, id: Uuid) -> Result<Option<ApprovalRequest>> {
        let conn = self.lock()?;
        query_one(
            &conn,
            "SELECT doc FROM approvals WHERE id = ?1 AND org_id = ?2",
            &[text(id), text(org_id)],
        )
    }

    async fn list_approvals(
        &self,
        org_id: Uuid,
        status: Option<ApprovalStatus>,
        page: Page,
    ) -> Result<Paged<ApprovalRequest>> {
        let mut where_ = Filter::new("org_id = ?", text(org_id));
        where_.push_if(status, "status = ?", |s| text(s.as_str()));
        let conn = self.lock()?;
        query_page(&conn, "approvals", &where_, page)
    }

    async fn record_decision(
        &self,
        org_id: Uuid,
        id: Uuid,
        decision: ApprovalDecision,
    ) -> Result<DecisionOutcome> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut request: ApprovalRequest = query_one(
            &tx,
            "SELECT doc FROM approvals WHERE id = ?1 AND org_id = ?2",
            &[text(id), text(org_id)],
        )?
        .ok_or_else(|| StoreError::not_found("approval request", id))?;

        if request.status != ApprovalStatus::Pending {
            return Ok(DecisionOutcome::NotPending(request));
        }
        if request.has_decided(&decision.approver) {
            return Ok(DecisionOutcome::DuplicateApprover(request));
        }
        request.apply_decision(decision);
        write_status(&tx, &request)?;
        tx.commit()?;
        Ok(DecisionOutcome::Recorded(request))
    }

    async fn expire_approvals(&self, now: DateTime<Utc>) -> Result<Vec<ApprovalRequest>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut stale: Vec<ApprovalRequest> = query_docs(
            &tx,
            "SELECT doc FROM approvals WHERE status = 'pending' AND expires_at < ?1",
            &[Value::Integer(millis(now))],
        )?;
        for request in &mut stale {
            request.status = ApprovalStatus::Expired;
            request.resolved_at = Some(now);
            write_status(&tx, request)?;
        }
        tx.commit()?;
        Ok(stale)
    }
}
