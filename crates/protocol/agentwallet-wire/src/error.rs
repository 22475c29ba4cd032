//! Error types for the wire encoding module.

use thiserror::Error;

/// Result type for wire operations.
pub type WireResult<T> = Result<T, WireError>;

/// Errors from encoding instructions or decoding account data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum WireError {
    /// Buffer ended before a field could be read
    #[error("buffer too short reading {field}: need {needed} bytes, {remaining} remaining")]
    BufferTooShort {
        /// Field being decoded
        field: &'static str,
        /// Bytes the field needs
        needed: usize,
        /// Bytes left in the buffer
        remaining: usize,
    },

    /// Account discriminator does not match the expected account type
    #[error("account discriminator mismatch for {account}")]
    DiscriminatorMismatch {
        /// Expected account type
        account: &'static str,
    },

    /// String field is not valid UTF-8
    #[error("invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),

    /// Bool field holds something other than 0 or 1
    #[error("invalid bool value {value} in {field}")]
    InvalidBool {
        /// Field being decoded
        field: &'static str,
        /// Byte found
        value: u8,
    },

    /// A PDA seed exceeds 32 bytes
    #[error("seed {index} is {len} bytes; the maximum is 32")]
    SeedTooLong {
        /// Position of the seed
        index: usize,
        /// Its length
        len: usize,
    },

    /// More than 16 PDA seeds
    #[error("{0} seeds supplied; the maximum is 16")]
    TooManySeeds(usize),

    /// Every bump from 255 to 0 produced an on-curve point
    #[error("unable to find a viable program address bump")]
    NoViableBump,

    /// Transaction has no instructions or no fee payer
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    /// Signer required by the message was not supplied
    #[error("missing signer for {0}")]
    MissingSigner(String),
}

impl WireError {
    /// Whether this error came from decoding on-chain bytes.
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            Self::BufferTooShort { .. }
                | Self::DiscriminatorMismatch { .. }
                | Self::InvalidUtf8(_)
                | Self::InvalidBool { .. }
        )
    }
}
