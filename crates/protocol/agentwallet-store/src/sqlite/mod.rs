//! SQLite store.
//!
//! One connection behind a mutex, shared by every trait implementation.
//! Each statement (or explicit transaction) runs entirely while the lock is
//! held, so compare-and-update and the idempotency constraint are atomic.

mod acp;
mod approvals;
mod escrows;
mod offerings;
mod pda_wallets;
mod policies;
mod transactions;
mod wallets;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use serde::de::DeserializeOwned;
use serde::Serialize;

use agentwallet_types::{Page, Paged};

use crate::error::{Result, StoreError};
use crate::schema::initialize_schema;

/// SQLite implementation of every store trait.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a database file and initialize the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::schema(format!("cannot create {}: {}", parent.display(), e)))?;
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// An in-memory database, for tests and ephemeral runs.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        initialize_schema(&conn)?;
        tracing::debug!("SQLite store opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::lock_poisoned("database connection lock poisoned"))
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

fn to_doc<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn from_doc<T: DeserializeOwned>(doc: &str) -> Result<T> {
    Ok(serde_json::from_str(doc)?)
}

fn millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

fn text(value: impl ToString) -> Value {
    Value::Text(value.to_string())
}

/// Is this the UNIQUE constraint failure SQLite raises on a duplicate key?
fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// A `WHERE` clause assembled from optional filters.
#[derive(Debug, Default)]
struct Filter {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl Filter {
    fn new(clause: &str, param: Value) -> Self {
        let mut filter = Self::default();
        filter.push(clause, param);
        filter
    }

    /// Add `clause`, which must contain exactly one `?`.
    fn push(&mut self, clause: &str, param: Value) -> &mut Self {
        self.clauses.push(clause.to_string());
        self.params.push(param);
        self
    }

    /// Add a clause with one parameter per `?`.
    fn push_many(&mut self, clause: &str, params: Vec<Value>) -> &mut Self {
        self.clauses.push(clause.to_string());
        self.params.extend(params);
        self
    }

    /// Add a clause with no parameters.
    fn push_raw(&mut self, clause: &str) -> &mut Self {
        self.clauses.push(clause.to_string());
        self
    }

    fn push_if<T>(&mut self, value: Option<T>, clause: &str, to_value: impl FnOnce(T) -> Value) -> &mut Self {
        if let Some(v) = value {
            self.push(clause, to_value(v));
        }
        self
    }

    fn sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

/// Run `sql` and decode the single `doc` column of every row.
fn query_docs<T: DeserializeOwned>(conn: &Connection, sql: &str, params: &[Value]) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let docs = stmt
        .query_map(params_from_iter(params.iter()), |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    docs.iter().map(|d| from_doc(d)).collect()
}

fn query_one<T: DeserializeOwned>(conn: &Connection, sql: &str, params: &[Value]) -> Result<Option<T>> {
    Ok(query_docs(conn, sql, params)?.into_iter().next())
}

/// Newest-first page over `table` plus the total match count.
fn query_page<T: DeserializeOwned>(conn: &Connection, table: &str, filter: &Filter, page: Page) -> Result<Paged<T>> {
    let where_sql = filter.sql();
    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}{}", table, where_sql),
        params_from_iter(filter.params.iter()),
        |row| row.get(0),
    )?;

    let mut params = filter.params.clone();
    params.push(Value::Integer(i64::from(page.limit)));
    params.push(Value::Integer(i64::from(page.offset)));
    let items = query_docs(
        conn,
        &format!(
            "SELECT doc FROM {}{} ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?",
            table, where_sql
        ),
        &params,
    )?;

    Ok(Paged {
        items,
        total: total as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_sql() {
        let mut filter = Filter::new("org_id = ?", text("o"));
        filter
            .push_if(Some("submitted"), "status = ?", text)
            .push_if(None::<&str>, "agent_id = ?", text);
        assert_eq!(filter.sql(), " WHERE org_id = ? AND status = ?");
        assert_eq!(filter.params.len(), 2);
        assert_eq!(Filter::default().sql(), "");
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("agentwallet.db");
        SqliteStore::open(&path).unwrap();
        assert!(path.exists());
    }
}
