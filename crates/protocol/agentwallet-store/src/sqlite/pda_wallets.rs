use agentwallet_crypto::Pubkey;
use agentwallet_types::{Page, Paged, PdaWallet};
use async_trait::async_trait;
use rusqlite::params;
use uuid::Uuid;

use super::{is_unique_violation, millis, query_one, query_page, text, to_doc, Filter, SqliteStore};
use crate::error::{Result, StoreError};
use crate::traits::PdaWalletStore;

#[async_trait]
impl PdaWalletStore for SqliteStore {
    async fn create_pda_wallet(&self, wallet: &PdaWallet) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO pda_wallets (id, org_id, pda_address, created_at, doc)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                wallet.id.to_string(),
                wallet.org_id.to_string(),
                wallet.pda_address.to_string(),
                millis(wallet.created_at),
                to_doc(wallet)?,
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::conflict(format!("PDA wallet {} already registered", wallet.pda_address))
            } else {
                e.into()
            }
        })?;
        Ok(())
    }

    async fn get_pda_wallet(&self, org_id: Uuid, id: Uuid) -> Result<Option<PdaWallet>> {
        let conn = self.lock()?;
        query_one(
            &conn,
            "SELECT doc FROM pda_wallets WHERE id = ?1 AND org_id = ?2",
            &[text(id), text(org_id)],
        )
    }

    async fn find_pda_wallet_by_address(&self, address: &Pubkey) -> Result<Option<PdaWallet>> {
        let conn = self.lock()?;
        query_one(
            &conn,
            "SELECT doc FROM pda_wallets WHERE pda_address = ?1",
            &[text(address)],
        )
    }

    async fn update_pda_wallet(&self, wallet: &PdaWallet) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE pda_wallets SET doc = ?2 WHERE id = ?1",
            params![wallet.id.to_string(), to_doc(wallet)?],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("PDA wallet", wallet.id));
        }
        Ok(())
    }

    async fn list_pda_wallets(&self, org_id: Uuid, page: Page) -> Result<Paged<PdaWallet>> {
        let where_ = Filter::new("org_id = ?", text(org_id));
        let conn = self.lock()?;
        query_page(&conn, "pda_wallets", &where_, page)
    }
}
