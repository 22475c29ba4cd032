use agentwallet_types::Policy;
use async_trait::async_trait;
use rusqlite::params;
use uuid::Uuid;

use super::{query_docs, query_one, text, to_doc, SqliteStore};
use crate::error::{Result, StoreError};
use crate::traits::PolicyStore;

#[async_trait]
impl PolicyStore for SqliteStore {
    async fn create_policy(&self, policy: &Policy) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO policies (id, org_id, doc) VALUES (?1, ?2, ?3)",
            params![policy.id.to_string(), policy.org_id.to_string(), to_doc(policy)?],
        )?;
        Ok(())
    }

    async fn get_policy(&self, org_id: Uuid, id: Uuid) -> Result<Option<Policy>> {
        let conn = self.lock()?;
        query_one(
            &conn,
            "SELECT doc FROM policies WHERE id = ?1 AND org_id = ?2",
            &[text(id), text(org_id)],
        )
    }

    async fn update_policy(&self, policy: &Policy) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE policies SET doc = ?2 WHERE id = ?1",
            params![policy.id.to_string(), to_doc(policy)?],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("policy", policy.id));
        }
        Ok(())
    }

    async fn delete_policy(&self, org_id: Uuid, id: Uuid) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "DELETE FROM policies WHERE id = ?1 AND org_id = ?2",
            params![id.to_string(), org_id.to_string()],
        )?;
        Ok(changed > 0)
    }

    async fn list_policies(&self, org_id: Uuid) -> Result<Vec<Policy>> {
        let conn = self.lock()?;
        query_docs(
            &conn,
            "SELECT doc FROM policies WHERE org_id = ?1 ORDER BY rowid ASC",
            &[text(org_id)],
        )
    }
}
