use agentwallet_types::{AcpJob, AcpMemo, AcpPhase, Page, Paged};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{millis, query_docs, query_one, query_page, text, to_doc, Filter, SqliteStore};
use crate::error::{Result, StoreError};
use crate::traits::AcpStore;
use crate::types::AcpJobFilter;

#[async_trait]
impl AcpStore for SqliteStore {
    async fn create_job(&self, job: &AcpJob, first_memo: &AcpMemo) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO acp_jobs
                (id, org_id, buyer_agent_id, seller_agent_id, evaluator_agent_id, phase, created_at, doc)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                job.id.to_string(),
                job.org_id.to_string(),
                job.buyer_agent_id.to_string(),
                job.seller_agent_id.to_string(),
                job.evaluator_agent_id.map(|e| e.to_string()),
                job.phase.as_str(),
                millis(job.created_at),
                to_doc(job)?,
            ],
        )?;
        insert_memo(&tx, first_memo)?;
        tx.commit()?;
        Ok(())
    }

    async fn get_job(&self, org_id: Uuid, id: Uuid) -> Result<Option<AcpJob>> {
        let conn = self.lock()?;
        query_one(
            &conn,
            "SELECT doc FROM acp_jobs WHERE id = ?1 AND org_id = ?2",
            &[text(id), text(org_id)],
        )
    }

    async fn advance_job(&self, job: &AcpJob, expected: AcpPhase, memo: &AcpMemo) -> Result<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let changed = tx.execute(
            "UPDATE acp_jobs SET phase = ?2, doc = ?3 WHERE id = ?1 AND phase = ?4",
            params![job.id.to_string(), job.phase.as_str(), to_doc(job)?, expected.as_str()],
        )?;
        if changed == 0 {
            let exists: i64 = tx.query_row(
                "SELECT COUNT(*) FROM acp_jobs WHERE id = ?1",
                [job.id.to_string()],
                |row| row.get(0),
            )?;
            if exists == 0 {
                return Err(StoreError::not_found("ACP job", job.id));
            }
            return Ok(false);
        }
        insert_memo(&tx, memo)?;
        tx.commit()?;
        Ok(true)
    }

    async fn list_jobs(&self, org_id: Uuid, filter: &AcpJobFilter, page: Page) -> Result<Paged<AcpJob>> {
        let mut where_ = Filter::new("org_id = ?", text(org_id));
        where_.push_if(filter.phase, "phase = ?", |p| text(p.as_str()));
        if let Some(agent) = filter.agent_id {
            where_.push_many(
                "(buyer_agent_id = ? OR seller_agent_id = ? OR evaluator_agent_id = ?)",
                vec![text(agent), text(agent), text(agent)],
            );
        }
        let conn = self.lock()?;
        query_page(&conn, "acp_jobs", &where_, page)
    }

    async fn append_memo(&self, memo: &AcpMemo) -> Result<()> {
        let conn = self.lock()?;
        insert_memo(&conn, memo)
    }

    async fn list_memos(&self, job_id: Uuid) -> Result<Vec<AcpMemo>> {
        let conn = self.lock()?;
        query_docs(
            &conn,
            "SELECT doc FROM acp_memos WHERE job_id = ?1 ORDER BY rowid ASC",
            &[text(job_id)],
        )
    }
}

fn insert_memo(conn: &Connection, memo: &AcpMemo) -> Result<()> {
    conn.execute(
        "INSERT INTO acp_memos (id, job_id, created_at, doc) VALUES (?1, ?2, ?3, ?4)",
        params![
            memo.id.to_string(),
            memo.job_id.to_string(),
            millis(memo.created_at),
            to_doc(memo)?,
        ],
    )?;
    Ok(())
}
