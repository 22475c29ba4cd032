//! System Program and SPL Token instructions.

use agentwallet_crypto::Pubkey;

use crate::borsh::BorshWriter;
use crate::instruction::{AccountMeta, Instruction};
use crate::program::{SYSTEM_PROGRAM_ID, TOKEN_PROGRAM_ID};

/// System Program instruction index of `Transfer` (u32 LE).
const SYSTEM_TRANSFER_INDEX: u32 = 2;

/// SPL Token instruction tag of `Transfer` (u8).
const TOKEN_TRANSFER_TAG: u8 = 3;

/// Move `lamports` from `from` (signer) to `to`.
pub fn system_transfer(from: &Pubkey, to: &Pubkey, lamports: u64) -> Instruction {
    Instruction::new(
        SYSTEM_PROGRAM_ID,
        vec![AccountMeta::writable(*from, true), AccountMeta::writable(*to, false)],
        BorshWriter::new()
            .u32(SYSTEM_TRANSFER_INDEX)
            .u64(lamports)
            .into_bytes(),
    )
}

/// Move `amount` raw token units between token accounts. `owner` signs for
/// `source`.
pub fn token_transfer(source: &Pubkey, destination: &Pubkey, owner: &Pubkey, amount: u64) -> Instruction {
    Instruction::new(
        TOKEN_PROGRAM_ID,
        vec![
            AccountMeta::writable(*source, false),
            AccountMeta::writable(*destination, false),
            AccountMeta::readonly(*owner, true),
        ],
        BorshWriter::new()
            .u8(TOKEN_TRANSFER_TAG)
            .u64(amount)
            .into_bytes(),
    )
}
