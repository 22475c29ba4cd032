//! Persistence layer for AgentWallet.
//!
//! This crate defines one async trait per stored entity and two backends
//! that implement all of them:
//!
//! - [`MemoryStore`]: maps behind a `tokio::sync::RwLock`, for tests and
//!   single-process runs
//! - [`SqliteStore`]: SQLite via `rusqlite`, one JSON document column per
//!   record plus indexed columns for filtering and ordering
//!
//! # Atomicity
//!
//! - `(org_id, idempotency_key)` is unique; a duplicate insert fails with
//!   [`StoreError::Conflict`]
//! - approval decisions are recorded with an atomic compare on the pending
//!   status
//! - escrow and ACP job updates are compare-and-set on the current state;
//!   a job's phase change and its memo are written together
//!
//! # Example
//!
//! ```
//! use agentwallet_store::{MemoryStore, PolicyStore};
//! use agentwallet_types::{Policy, PolicyRules};
//! use uuid::Uuid;
//!
//! # tokio_test_block_on(async {
//! let store = MemoryStore::new();
//! let org = Uuid::new_v4();
//! store.create_policy(&Policy::org_wide(org, "cap", 1, PolicyRules::default())).await.unwrap();
//! assert_eq!(store.list_policies(org).await.unwrap().len(), 1);
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

pub mod error;
pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod traits;
pub mod types;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{
    AcpStore, ApprovalStore, EscrowStore, OfferingStore, PdaWalletStore, PolicyStore, Store,
    TransactionStore, WalletStore,
};
pub use types::{AcpJobFilter, DecisionOutcome, OfferingFilter, TransactionFilter, WalletFilter};
