//! Spend policy engine for AgentWallet.
//!
//! Every custodial transfer is evaluated against the organization's enabled
//! policies before anything touches the chain. A policy is a prioritized rule
//! set scoped to the whole organization, one agent or one wallet.
//!
//! # Evaluation
//!
//! Policies are checked in ascending priority. The first deny short-circuits;
//! approval thresholds accumulate and only hold the transfer when nothing
//! denies it. See [`check_policy`] for the per-policy check order.
//!
//! ```
//! use agentwallet_crypto::Pubkey;
//! use agentwallet_policy::{check_policy, DenyReason, PolicyCheck};
//! use agentwallet_types::{Policy, PolicyRules, TransferRequest};
//! use chrono::Utc;
//! use uuid::Uuid;
//!
//! let rules = PolicyRules {
//!     spending_limit_lamports: Some(1_000),
//!     ..PolicyRules::default()
//! };
//! let policy = Policy::org_wide(Uuid::new_v4(), "cap", 0, rules);
//! let request = TransferRequest::sol(Uuid::new_v4(), Pubkey::new([1; 32]), 5_000);
//!
//! assert_eq!(
//!     check_policy(&policy, &request, 0, Utc::now()),
//!     PolicyCheck::Deny(DenyReason::ExceedsTransactionLimit { amount: 5_000, limit: 1_000 })
//! );
//! ```
//!
//! # Time windows
//!
//! Windows are `HH:MM` bounds in a fixed-offset timezone (`UTC`, `Z`,
//! `±HH:MM`, `UTC±HH[:MM]`), inclusive at both ends. A start after the end
//! wraps midnight.

pub mod decision;
pub mod engine;
pub mod error;
pub mod rules;

pub use decision::{DenyReason, PolicyDecision};
pub use engine::{check_policy, PolicyCheck, PolicyEngine};
pub use error::{PolicyError, PolicyResult};
pub use rules::{parse_minute_of_day, parse_timezone, parse_window, validate_rules, ParsedWindow};
