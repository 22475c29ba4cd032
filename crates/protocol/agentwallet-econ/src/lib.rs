//! Platform fees for AgentWallet.
//!
//! Custodial SOL transfers pay a platform fee on top of the amount, collected
//! by a second instruction in the same transaction. The rate depends on the
//! organization's tier:
//!
//! | Tier       | Rate   |
//! |------------|--------|
//! | free       | 50 bps |
//! | pro        | 25 bps |
//! | enterprise | 10 bps |
//!
//! Amounts at or below the minimum (1000 lamports by default) pay nothing;
//! above it the fee is never less than the minimum.

pub mod error;
pub mod fee;

pub use error::{EconError, EconResult};
pub use fee::{fee_at_rate, FeeSchedule};
