//! SQL schema initialization.
//!
//! Every table stores the full record as a JSON document plus the columns
//! that queries filter or sort on.

use rusqlite::Connection;

use crate::error::Result;

/// Schema version for migration tracking.
pub const SCHEMA_VERSION: u32 = 1;

/// Initialize the database schema.
///
/// Creates all tables and indexes if they don't exist. Calling it again on
/// an initialized database is a no-op.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    // WAL keeps readers from blocking the confirmation worker's writes
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        [],
    )?;

    let current_version: Option<u32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
        .ok();

    match current_version {
        None => {
            create_tables(conn)?;
            conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [SCHEMA_VERSION])?;
        }
        Some(version) if version > SCHEMA_VERSION => {
            return Err(crate::StoreError::schema(format!(
                "database schema version {} is newer than supported version {}",
                version, SCHEMA_VERSION
            )));
        }
        Some(_) => {}
    }

    Ok(())
}

fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS wallets (
            id TEXT PRIMARY KEY,
            org_id TEXT NOT NULL,
            agent_id TEXT,
            wallet_type TEXT NOT NULL,
            is_active INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            doc TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_wallets_org ON wallets(org_id, created_at);

        CREATE TABLE IF NOT EXISTS transactions (
            id TEXT PRIMARY KEY,
            org_id TEXT NOT NULL,
            wallet_id TEXT NOT NULL,
            agent_id TEXT,
            status TEXT NOT NULL,
            idempotency_key TEXT,
            amount INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            doc TEXT NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_transactions_idempotency
            ON transactions(org_id, idempotency_key);
        CREATE INDEX IF NOT EXISTS idx_transactions_org ON transactions(org_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_transactions_wallet ON transactions(wallet_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_transactions_status ON transactions(status, created_at);

        CREATE TABLE IF NOT EXISTS policies (
            id TEXT PRIMARY KEY,
            org_id TEXT NOT NULL,
            doc TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_policies_org ON policies(org_id);

        CREATE TABLE IF NOT EXISTS approvals (
            id TEXT PRIMARY KEY,
            org_id TEXT NOT NULL,
            status TEXT NOT NULL,
            expires_at INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            doc TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_approvals_org ON approvals(org_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_approvals_status ON approvals(status, expires_at);

        CREATE TABLE IF NOT EXISTS escrows (
            id TEXT PRIMARY KEY,
            org_id TEXT NOT NULL,
            status TEXT NOT NULL,
            expires_at INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            doc TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_escrows_org ON escrows(org_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_escrows_status ON escrows(status, expires_at);

        CREATE TABLE IF NOT EXISTS acp_jobs (
            id TEXT PRIMARY KEY,
            org_id TEXT NOT NULL,
            buyer_agent_id TEXT NOT NULL,
            seller_agent_id TEXT NOT NULL,
            evaluator_agent_id TEXT,
            phase TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            doc TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_acp_jobs_org ON acp_jobs(org_id, created_at);

        CREATE TABLE IF NOT EXISTS acp_memos (
            id TEXT PRIMARY KEY,
            job_id TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            doc TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_acp_memos_job ON acp_memos(job_id);

        CREATE TABLE IF NOT EXISTS resource_offerings (
            id TEXT PRIMARY KEY,
            org_id TEXT NOT NULL,
            agent_id TEXT NOT NULL,
            is_active INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            doc TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_resource_offerings_org ON resource_offerings(org_id, created_at);

        CREATE TABLE IF NOT EXISTS pda_wallets (
            id TEXT PRIMARY KEY,
            org_id TEXT NOT NULL,
            pda_address TEXT NOT NULL UNIQUE,
            created_at INTEGER NOT NULL,
            doc TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_pda_wallets_org ON pda_wallets(org_id, created_at);",
    )?;
    Ok(())
}
