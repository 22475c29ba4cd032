//! Economic error types.

use thiserror::Error;

/// Result type for fee configuration.
pub type EconResult<T> = std::result::Result<T, EconError>;

/// Errors in a fee schedule.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EconError {
    /// A rate above 100%
    #[error("{tier} rate of {bps} bps exceeds 10000")]
    RateTooHigh {
        /// Tier the rate belongs to
        tier: &'static str,
        /// The configured rate
        bps: u16,
    },
}
