use agentwallet_types::{Page, Paged, Wallet};
use async_trait::async_trait;
use rusqlite::params;
use rusqlite::types::Value;
use uuid::Uuid;

use super::{millis, query_one, query_page, text, to_doc, Filter, SqliteStore};
use crate::error::{Result, StoreError};
use crate::traits::WalletStore;
use crate::types::WalletFilter;

#[async_trait]
impl WalletStore for SqliteStore {
    async fn create_wallet(&self, wallet: &Wallet) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO wallets (id, org_id, agent_id, wallet_type, is_active, created_at, doc)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                wallet.id.to_string(),
                wallet.org_id.to_string(),
                wallet.agent_id.map(|a| a.to_string()),
                wallet.wallet_type.as_str(),
                wallet.is_active,
                millis(wallet.created_at),
                to_doc(wallet)?,
            ],
        )?;
        Ok(())
    }

    async fn get_wallet(&self, org_id: Uuid, id: Uuid) -> Result<Option<Wallet>> {
        let conn = self.lock()?;
        query_one(
            &conn,
            "SELECT doc FROM wallets WHERE id = ?1 AND org_id = ?2",
            &[text(id), text(org_id)],
        )
    }

    async fn update_wallet(&self, wallet: &Wallet) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE wallets SET agent_id = ?2, wallet_type = ?3, is_active = ?4, doc = ?5 WHERE id = ?1",
            params![
                wallet.id.to_string(),
                wallet.agent_id.map(|a| a.to_string()),
                wallet.wallet_type.as_str(),
                wallet.is_active,
                to_doc(wallet)?,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("wallet", wallet.id));
        }
        Ok(())
    }

    async fn list_wallets(&self, org_id: Uuid, filter: &WalletFilter, page: Page) -> Result<Paged<Wallet>> {
        let mut where_ = Filter::new("org_id = ?", text(org_id));
        where_
            .push_if(filter.agent_id, "agent_id = ?", text)
            .push_if(filter.wallet_type, "wallet_type = ?", |t| text(t.as_str()));
        if filter.active_only {
            where_.push("is_active = ?", Value::Integer(1));
        }
        let conn = self.lock()?;
        query_page(&conn, "wallets", &where_, page)
    }

    async fn count_active_wallets(&self, org_id: Uuid) -> Result<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM wallets WHERE org_id = ?1 AND is_active = 1",
            [org_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
