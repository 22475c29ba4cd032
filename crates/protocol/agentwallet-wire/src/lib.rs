//! On-chain wire encoding for AgentWallet.
//!
//! Everything in this crate is pure: no I/O, no clocks, no randomness. It
//! produces the exact bytes the deployed agent wallet program and the
//! Solana runtime expect.
//!
//! - [`borsh`] - little-endian primitive encoding (`u64`, `i64`, strings, bools)
//! - [`discriminator`] - Anchor-style 8-byte instruction and account tags
//! - [`pda`] - program-derived address search
//! - [`program`] - agent wallet program ids, instruction builders, account decoding
//! - [`native`] - System Program and SPL Token instructions
//! - [`instruction`] - instructions and account metas
//! - [`transaction`] - legacy message compilation, signing and serialization
//!
//! # Wire Format
//!
//! Program instruction data is the discriminator followed by the Borsh
//! encoding of each argument in declaration order:
//!
//! ```text
//! [sha256("global:<name>")[0..8]]   # instruction discriminator
//! [arg0][arg1]...                   # u64/i64 LE, string = u32 LE len + UTF-8, bool = 1 byte
//! ```
//!
//! # Example
//!
//! ```
//! use agentwallet_crypto::Pubkey;
//! use agentwallet_wire::pda::agent_wallet_pda;
//!
//! let org = Pubkey::new([7u8; 32]);
//! let (address, bump) = agent_wallet_pda(&org, "agent-1").unwrap();
//! assert_eq!(agent_wallet_pda(&org, "agent-1").unwrap(), (address, bump));
//! assert!(!address.is_on_curve());
//! ```

pub mod borsh;
pub mod discriminator;
mod error;
pub mod instruction;
pub mod native;
pub mod pda;
pub mod program;
pub mod transaction;

pub use discriminator::{account_discriminator, instruction_discriminator};
pub use error::{WireError, WireResult};
pub use instruction::{AccountMeta, Instruction};
pub use pda::derive_pda;
pub use program::AgentWalletState;
pub use transaction::{Message, Transaction};
