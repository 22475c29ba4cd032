use agentwallet_types::{Page, Paged, ResourceOffering};
use async_trait::async_trait;
use rusqlite::params;

use super::{millis, query_page, text, to_doc, Filter, SqliteStore};
use crate::error::Result;
use crate::traits::OfferingStore;
use crate::types::OfferingFilter;

#[async_trait]
impl OfferingStore for SqliteStore {
    async fn create_offering(&self, offering: &ResourceOffering) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO resource_offerings (id, org_id, agent_id, is_active, created_at, doc)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                offering.id.to_string(),
                offering.org_id.to_string(),
                offering.agent_id.to_string(),
                offering.is_active,
                millis(offering.created_at),
                to_doc(offering)?,
            ],
        )?;
        Ok(())
    }

    async fn list_offerings(&self, filter: &OfferingFilter, page: Page) -> Result<Paged<ResourceOffering>> {
        let mut where_ = Filter::default();
        where_
            .push_raw("is_active = 1")
            .push_if(filter.org_id, "org_id = ?", text)
            .push_if(filter.agent_id, "agent_id = ?", text);
        let conn = self.lock()?;
        query_page(&conn, "resource_offerings", &where_, page)
    }
}
