//! Limits and defaults.

use crate::Amount;

// =============================================================================
// Chain
// =============================================================================

/// Lamports per SOL.
pub const LAMPORTS_PER_SOL: Amount = 1_000_000_000;

/// Network fee reserved per signature when checking balance before a send.
pub const BASE_NETWORK_FEE_LAMPORTS: Amount = 5_000;

/// USDC uses 6 decimals.
pub const USDC_DECIMALS: u8 = 6;

// =============================================================================
// Fees
// =============================================================================

/// Fees are expressed in basis points of the transfer amount.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Default minimum platform fee. Transfers at or below this pay no fee.
pub const DEFAULT_MIN_FEE_LAMPORTS: Amount = 1_000;

// =============================================================================
// Lifecycles
// =============================================================================

/// Escrows expire this many hours after creation unless configured.
pub const DEFAULT_ESCROW_EXPIRY_HOURS: i64 = 24;

/// Pending approval requests expire after this many hours.
pub const DEFAULT_APPROVAL_EXPIRY_HOURS: i64 = 24;

/// Approvals needed to release a held transfer.
pub const DEFAULT_REQUIRED_APPROVALS: u32 = 1;

/// Concurrent chain submissions allowed across all batch transfers.
pub const DEFAULT_BATCH_CONCURRENCY: usize = 5;

/// Upper bound on items in one batch transfer call.
pub const MAX_BATCH_SIZE: usize = 100;

// =============================================================================
// Pagination
// =============================================================================

/// Default page size.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Largest page size a caller may request.
pub const MAX_PAGE_LIMIT: u32 = 100;

// =============================================================================
// Data limits
// =============================================================================

/// Maximum memo length on a transfer.
pub const MAX_MEMO_LEN: usize = 256;

/// PDA seeds are limited to 32 bytes each; the agent seed is one of them.
pub const MAX_AGENT_SEED_LEN: usize = 32;
