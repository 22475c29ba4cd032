use agentwallet_types::{Page, Paged, Transaction, TxStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::params;
use rusqlite::types::Value;
use uuid::Uuid;

use super::{
    is_unique_violation, millis, query_docs, query_one, query_page, text, to_doc, Filter,
    SqliteStore,
};
use crate::error::{Result, StoreError};
use crate::traits::TransactionStore;
use crate::types::TransactionFilter;

#[async_trait]
impl TransactionStore for SqliteStore {
    async fn insert_transaction(&self, tx: &Transaction) -> Result<()> {
        let conn = self.lock()?;
        let result = conn.execute(
            "INSERT INTO transactions
                (id, org_id, wallet_id, agent_id, status, idempotency_key, amount, created_at, doc)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                tx.id.to_string(),
                tx.org_id.to_string(),
                tx.wallet_id.to_string(),
                tx.agent_id.map(|a| a.to_string()),
                tx.status.as_str(),
                tx.idempotency_key,
                tx.amount as i64,
                millis(tx.created_at),
                to_doc(tx)?,
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(StoreError::conflict(format!(
                "idempotency key {} already used",
                tx.idempotency_key.as_deref().unwrap_or_default()
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_transaction(&self, org_id: Uuid, id: Uuid) -> Result<Option<Transaction>> {
        let conn = self.lock()?;
        query_one(
            &conn,
            "SELECT doc FROM transactions WHERE id = ?1 AND org_id = ?2",
            &[text(id), text(org_id)],
        )
    }

    async fn find_by_idempotency_key(&self, org_id: Uuid, key: &str) -> Result<Option<Transaction>> {
        let conn = self.lock()?;
        query_one(
            &conn,
            "SELECT doc FROM transactions WHERE org_id = ?1 AND idempotency_key = ?2",
            &[text(org_id), text(key)],
        )
    }

    async fn update_transaction(&self, tx: &Transaction) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE transactions SET status = ?2, doc = ?3 WHERE id = ?1",
            params![tx.id.to_string(), tx.status.as_str(), to_doc(tx)?],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("transaction", tx.id));
        }
        Ok(())
    }

    async fn list_transactions(
        &self,
        org_id: Uuid,
        filter: &TransactionFilter,
        page: Page,
    ) -> Result<Paged<Transaction>> {
        let mut where_ = Filter::new("org_id = ?", text(org_id));
        where_
            .push_if(filter.agent_id, "agent_id = ?", text)
            .push_if(filter.wallet_id, "wallet_id = ?", text)
            .push_if(filter.status, "status = ?", |s| text(s.as_str()));
        let conn = self.lock()?;
        query_page(&conn, "transactions", &where_, page)
    }

    async fn list_by_status(&self, status: TxStatus, limit: u32) -> Result<Vec<Transaction>> {
        let conn = self.lock()?;
        query_docs(
            &conn,
            "SELECT doc FROM transactions WHERE status = ?1 ORDER BY created_at ASC, rowid ASC LIMIT ?2",
            &[text(status.as_str()), Value::Integer(i64::from(limit))],
        )
    }

    async fn spend_between(
        &self,
        wallet_id: Uuid,
        agent_id: Option<Uuid>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64> {
        let mut where_ = Filter::new("wallet_id = ?", text(wallet_id));
        where_
            .push_raw("status IN ('submitted', 'confirmed')")
            .push("created_at >= ?", Value::Integer(millis(from)))
            .push("created_at < ?", Value::Integer(millis(to)))
            .push_if(agent_id, "agent_id = ?", text);
        let conn = self.lock()?;
        let total: i64 = conn.query_row(
            &format!("SELECT COALESCE(SUM(amount), 0) FROM transactions{}", where_.sql()),
            rusqlite::params_from_iter(where_.params.iter()),
            |row| row.get(0),
        )?;
        Ok(total.max(0) as u64)
    }
}
