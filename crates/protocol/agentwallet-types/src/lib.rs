//! Data structures for AgentWallet.
//!
//! This crate holds the data model shared by every other crate: wallets,
//! transactions, policies, approval requests, escrows, ACP jobs and PDA
//! wallet mirrors, plus error codes and the clock abstraction. It contains
//! no I/O and only the business logic that is intrinsic to the data, such as
//! the legal state-transition tables.
//!
//! # Module Organization
//!
//! - [`org`] - Organizations and pricing tiers
//! - [`wallet`] - Custodial wallets and PDA wallet mirrors
//! - [`transaction`] - Transfer records and the transfer request shape
//! - [`policy`] - Spend policies and their rule set
//! - [`approval`] - Approval requests for held transfers
//! - [`escrow`] - Escrow records and their state machine
//! - [`acp`] - Agent Commerce Protocol jobs, phases and memos
//! - [`page`] - Pagination
//! - [`clock`] - Injectable wall clock
//! - [`constants`] - Limits and defaults
//! - [`error`] - Stable numeric error codes
//!
//! # Example
//!
//! ```
//! use agentwallet_types::{EscrowStatus, AcpPhase};
//!
//! assert!(EscrowStatus::Created.can_transition_to(EscrowStatus::Funded));
//! assert!(!EscrowStatus::Created.can_transition_to(EscrowStatus::Released));
//! assert!(AcpPhase::Resolved.is_terminal());
//! ```
//!
//! # Type Conventions
//!
//! - Identifiers are random UUIDs
//! - Timestamps are `DateTime<Utc>`
//! - Amounts are `u64` in the smallest unit (lamports or raw token units)
//! - Enums serialize as `snake_case` strings and round-trip through
//!   `Display`/`FromStr`

/// Crate version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Generates `as_str`, `Display`, `FromStr` and an `ALL` list for a
/// fieldless enum whose serde form is its snake_case name.
macro_rules! string_enum {
    ($ty:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            /// All variants in declaration order.
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            /// The canonical lowercase name.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name),+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = $crate::error::ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($ty::$variant),)+
                    other => Err($crate::error::ParseEnumError {
                        kind: stringify!($ty),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

pub mod acp;
pub mod approval;
pub mod clock;
pub mod constants;
pub mod error;
pub mod escrow;
pub mod org;
pub mod page;
pub mod policy;
pub mod transaction;
pub mod wallet;

pub use acp::{AcpJob, AcpMemo, AcpPhase, MemoType, ResourceOffering};
pub use approval::{ApprovalDecision, ApprovalRequest, ApprovalStatus};
pub use clock::{utc_day_bounds, utc_day_start, Clock, SystemClock};
pub use error::{ErrorCode, ParseEnumError};
pub use escrow::{Escrow, EscrowStatus};
pub use org::{Organization, Tier};
pub use page::{Page, Paged};
pub use policy::{Policy, PolicyRules, PolicyScope, TimeWindow};
pub use transaction::{Transaction, TransferRequest, TxStatus, TxType};
pub use wallet::{PdaWallet, Wallet, WalletType};

/// Amount in the smallest unit of the asset.
pub type Amount = u64;

/// Organization identifier.
pub type OrgId = uuid::Uuid;

/// Agent identifier.
pub type AgentId = uuid::Uuid;
