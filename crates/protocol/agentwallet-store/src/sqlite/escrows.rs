use agentwallet_types::{Escrow, EscrowStatus, Page, Paged};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::params;
use rusqlite::types::Value;
use uuid::Uuid;

use super::{millis, query_docs, query_one, query_page, text, to_doc, Filter, SqliteStore};
use crate::error::{Result, StoreError};
use crate::traits::EscrowStore;

#[async_trait]
impl EscrowStore for SqliteStore {
    async fn create_escrow(&self, escrow: &Escrow) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO escrows (id, org_id, status, expires_at, created_at, doc)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                escrow.id.to_string(),
                escrow.org_id.to_string(),
                escrow.status.as_str(),
                millis(escrow.expires_at),
                millis(escrow.created_at),
                to_doc(escrow)?,
            ],
        )?;
        Ok(())
    }

    async fn get_escrow(&self, org_id: Uuid, id: Uuid) -> Result<Option<Escrow>> {
        let conn = self.lock()?;
        query_one(
            &conn,
            "SELECT doc FROM escrows WHERE id = ?1 AND org_id = ?2",
            &[text(id), text(org_id)],
        )
    }

    async fn compare_and_update_escrow(&self, escrow: &Escrow, expected: EscrowStatus) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE escrows SET status = ?2, doc = ?3 WHERE id = ?1 AND status = ?4",
            params![
                escrow.id.to_string(),
                escrow.status.as_str(),
                to_doc(escrow)?,
                expected.as_str(),
            ],
        )?;
        if changed == 0 {
            let exists: i64 = conn.query_row(
                "SELECT COUNT(*) FROM escrows WHERE id = ?1",
                [escrow.id.to_string()],
                |row| row.get(0),
            )?;
            if exists == 0 {
                return Err(StoreError::not_found("escrow", escrow.id));
            }
        }
        Ok(changed > 0)
    }

    async fn list_escrows(
        &self,
        org_id: Uuid,
        status: Option<EscrowStatus>,
        page: Page,
    ) -> Result<Paged<Escrow>> {
        let mut where_ = Filter::new("org_id = ?", text(org_id));
        where_.push_if(status, "status = ?", |s| text(s.as_str()));
        let conn = self.lock()?;
        query_page(&conn, "escrows", &where_, page)
    }

    async fn expire_escrows(&self, now: DateTime<Utc>) -> Result<Vec<Escrow>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut stale: Vec<Escrow> = query_docs(
            &tx,
            "SELECT doc FROM escrows WHERE status IN ('created', 'funded') AND expires_at < ?1",
            &[Value::Integer(millis(now))],
        )?;
        for escrow in &mut stale {
            escrow.status = EscrowStatus::Expired;
            escrow.completed_at = Some(now);
            tx.execute(
                "UPDATE escrows SET status = ?2, doc = ?3 WHERE id = ?1",
                params![escrow.id.to_string(), escrow.status.as_str(), to_doc(escrow)?],
            )?;
        }
        tx.commit()?;
        Ok(stale)
    }
}
