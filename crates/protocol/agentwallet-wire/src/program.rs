//! The agent wallet program: ids, instruction builders and account layouts.
//!
//! Instruction account order is fixed by the deployed program:
//!
//! | Instruction           | Accounts                                                                 |
//! |-----------------------|--------------------------------------------------------------------------|
//! | `create_agent_wallet` | authority (s, w), org (r), agent wallet (w), system program             |
//! | `transfer_with_limit` | authority (s, w), agent wallet (w), platform config (r), fee wallet (w), recipient (w), system program |
//! | `update_limits`       | authority (s, r), agent wallet (w)                                       |

use agentwallet_crypto::Pubkey;

use crate::borsh::{BorshReader, BorshWriter};
use crate::discriminator::instruction_discriminator;
use crate::error::{WireError, WireResult};
use crate::instruction::{AccountMeta, Instruction};
use crate::pda::{agent_wallet_pda, platform_config_pda};

// =============================================================================
// Program IDs
// =============================================================================

/// Agent wallet program (`CEQLGCWkpUjbsh5kZujTaCkFB59EKxmnhsqydDzpt6r6`).
pub const PROGRAM_ID: Pubkey = Pubkey::new([
    166, 223, 125, 7, 236, 167, 211, 144, 84, 16, 87, 70, 35, 14, 44, 203, 243, 19, 198, 125, 189,
    52, 159, 28, 73, 112, 98, 34, 114, 142, 14, 91,
]);

/// System Program (`11111111111111111111111111111111`).
pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey::new([0u8; 32]);

/// SPL Token program (`TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA`).
pub const TOKEN_PROGRAM_ID: Pubkey = Pubkey::new([
    6, 221, 246, 225, 215, 101, 161, 147, 217, 203, 225, 70, 206, 235, 121, 172, 28, 180, 133, 237,
    95, 91, 55, 145, 58, 140, 245, 133, 126, 255, 0, 169,
]);

/// Associated Token Account program (`ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL`).
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey = Pubkey::new([
    140, 151, 37, 143, 78, 36, 137, 241, 187, 61, 16, 41, 20, 142, 13, 131, 11, 90, 19, 153, 218,
    255, 16, 132, 4, 142, 123, 216, 219, 233, 248, 89,
]);

/// Mainnet USDC mint (`EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v`).
pub const USDC_MINT: Pubkey = Pubkey::new([
    198, 250, 122, 243, 190, 219, 173, 58, 61, 101, 243, 106, 171, 201, 116, 49, 177, 187, 228,
    194, 210, 246, 224, 228, 124, 166, 2, 3, 69, 47, 93, 97,
]);

/// Seconds per UTC day; the program's daily window is `unix_timestamp / 86400`.
pub const SECONDS_PER_DAY: i64 = 86_400;

// =============================================================================
// Instruction Builders
// =============================================================================

/// Build `create_agent_wallet`. Returns the instruction with the derived
/// agent wallet address and bump.
pub fn create_agent_wallet(
    authority: &Pubkey,
    org: &Pubkey,
    agent_id_seed: &str,
    spending_limit_per_tx: u64,
    daily_limit: u64,
) -> WireResult<(Instruction, Pubkey, u8)> {
    let (pda, bump) = agent_wallet_pda(org, agent_id_seed)?;
    let data = BorshWriter::with_prefix(&instruction_discriminator("create_agent_wallet"))
        .string(agent_id_seed)
        .u64(spending_limit_per_tx)
        .u64(daily_limit)
        .into_bytes();
    let accounts = vec![
        AccountMeta::writable(*authority, true),
        AccountMeta::readonly(*org, false),
        AccountMeta::writable(pda, false),
        AccountMeta::readonly(SYSTEM_PROGRAM_ID, false),
    ];
    Ok((Instruction::new(PROGRAM_ID, accounts, data), pda, bump))
}

/// Build `transfer_with_limit`. With no platform fee wallet configured the
/// system program stands in for the fee account.
pub fn transfer_with_limit(
    authority: &Pubkey,
    agent_wallet: &Pubkey,
    fee_wallet: Option<&Pubkey>,
    recipient: &Pubkey,
    amount: u64,
) -> WireResult<Instruction> {
    let (platform_config, _) = platform_config_pda()?;
    let data = BorshWriter::with_prefix(&instruction_discriminator("transfer_with_limit"))
        .u64(amount)
        .into_bytes();
    let accounts = vec![
        AccountMeta::writable(*authority, true),
        AccountMeta::writable(*agent_wallet, false),
        AccountMeta::readonly(platform_config, false),
        AccountMeta::writable(*fee_wallet.unwrap_or(&SYSTEM_PROGRAM_ID), false),
        AccountMeta::writable(*recipient, false),
        AccountMeta::readonly(SYSTEM_PROGRAM_ID, false),
    ];
    Ok(Instruction::new(PROGRAM_ID, accounts, data))
}

/// Build `update_limits`.
pub fn update_limits(
    authority: &Pubkey,
    agent_wallet: &Pubkey,
    spending_limit_per_tx: u64,
    daily_limit: u64,
    is_active: bool,
) -> Instruction {
    let data = BorshWriter::with_prefix(&instruction_discriminator("update_limits"))
        .u64(spending_limit_per_tx)
        .u64(daily_limit)
        .bool(is_active)
        .into_bytes();
    let accounts = vec![
        AccountMeta::readonly(*authority, true),
        AccountMeta::writable(*agent_wallet, false),
    ];
    Instruction::new(PROGRAM_ID, accounts, data)
}

// =============================================================================
// Account Layouts
// =============================================================================

/// Decoded `AgentWallet` program account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentWalletState {
    pub authority: Pubkey,
    pub org: Pubkey,
    pub agent_id: String,
    pub spending_limit_per_tx: u64,
    pub daily_limit: u64,
    pub daily_spent: u64,
    pub last_reset_day: i64,
    pub is_active: bool,
    pub bump: u8,
}

impl AgentWalletState {
    /// Discriminator + authority + org + empty string + 4 x u64/i64 + bool + bump.
    pub const MIN_LEN: usize = 8 + 32 + 32 + 4 + 8 * 4 + 1 + 1;

    /// Decode raw account data. The leading 8-byte discriminator is skipped.
    pub fn decode(data: &[u8]) -> WireResult<Self> {
        let mut r = BorshReader::new(data);
        if data.len() < Self::MIN_LEN {
            return Err(WireError::BufferTooShort {
                field: "AgentWallet",
                needed: Self::MIN_LEN,
                remaining: data.len(),
            });
        }
        r.skip("discriminator", 8)?;
        Ok(Self {
            authority: r.pubkey("authority")?,
            org: r.pubkey("org")?,
            agent_id: r.string("agent_id")?,
            spending_limit_per_tx: r.u64("spending_limit_per_tx")?,
            daily_limit: r.u64("daily_limit")?,
            daily_spent: r.u64("daily_spent")?,
            last_reset_day: r.i64("last_reset_day")?,
            is_active: r.bool("is_active")?,
            bump: r.u8("bump")?,
        })
    }

    /// Spend the program will count against today's limit at `unix_timestamp`.
    /// The counter resets when the UTC day number changes.
    pub fn spent_today(&self, unix_timestamp: i64) -> u64 {
        if unix_timestamp.div_euclid(SECONDS_PER_DAY) != self.last_reset_day {
            0
        } else {
            self.daily_spent
        }
    }

    /// Largest amount a single transfer may move right now.
    pub fn available_now(&self, unix_timestamp: i64) -> u64 {
        if !self.is_active {
            return 0;
        }
        let daily_left = self.daily_limit.saturating_sub(self.spent_today(unix_timestamp));
        daily_left.min(self.spending_limit_per_tx)
    }
}

/// Decoded `PlatformConfig` program account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformConfigState {
    pub authority: Pubkey,
    pub fee_wallet: Pubkey,
    pub fee_bps: u16,
    pub bump: u8,
}

impl PlatformConfigState {
    pub fn decode(data: &[u8]) -> WireResult<Self> {
        let mut r = BorshReader::new(data);
        r.skip("discriminator", 8)?;
        Ok(Self {
            authority: r.pubkey("authority")?,
            fee_wallet: r.pubkey("fee_wallet")?,
            fee_bps: r.u16("fee_bps")?,
            bump: r.u8("bump")?,
        })
    }
}

// =============================================================================
// Program Errors
// =============================================================================

/// Custom errors raised by the program, numbered from 6000.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ProgramError {
    SpendingLimitExceeded = 6000,
    DailyLimitExceeded = 6001,
    WalletInactive = 6002,
    EscrowAlreadyFunded = 6003,
    EscrowNotFunded = 6004,
    EscrowExpired = 6005,
    UnauthorizedArbiter = 6006,
    InvalidEscrowState = 6007,
    ArithmeticOverflow = 6008,
    InvalidFeeCalculation = 6009,
}

impl ProgramError {
    pub fn from_code(code: u32) -> Option<Self> {
        use ProgramError::*;
        Some(match code {
            6000 => SpendingLimitExceeded,
            6001 => DailyLimitExceeded,
            6002 => WalletInactive,
            6003 => EscrowAlreadyFunded,
            6004 => EscrowNotFunded,
            6005 => EscrowExpired,
            6006 => UnauthorizedArbiter,
            6007 => InvalidEscrowState,
            6008 => ArithmeticOverflow,
            6009 => InvalidFeeCalculation,
            _ => return None,
        })
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::SpendingLimitExceeded => "Transaction amount exceeds the per-transaction spending limit",
            Self::DailyLimitExceeded => "Transaction would exceed the daily spending limit",
            Self::WalletInactive => "Agent wallet is inactive and cannot process transactions",
            Self::EscrowAlreadyFunded => "Escrow account has already been funded",
            Self::EscrowNotFunded => "Escrow account has not been funded yet",
            Self::EscrowExpired => "Escrow has expired and can only be refunded",
            Self::UnauthorizedArbiter => "Only the designated arbiter can perform this action",
            Self::InvalidEscrowState => "Escrow is in an invalid state for this operation",
            Self::ArithmeticOverflow => "Arithmetic overflow occurred",
            Self::InvalidFeeCalculation => "Fee calculation resulted in an invalid amount",
        }
    }

    /// Render an on-chain error string, replacing a `Custom(N)` code with
    /// the program's message when `N` is one of ours.
    pub fn describe(raw_error: &str) -> String {
        let code = raw_error
            .split("Custom")
            .nth(1)
            .map(|rest| rest.trim_start_matches(&[':', '(', ' ', '"'][..]))
            .and_then(|rest| {
                let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
                digits.parse::<u32>().ok()
            });
        match code.and_then(Self::from_code) {
            Some(err) => format!("{} ({})", err.message(), raw_error),
            None => raw_error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account_discriminator;

    #[test]
    fn test_program_id_strings() {
        assert_eq!(PROGRAM_ID.to_string(), "CEQLGCWkpUjbsh5kZujTaCkFB59EKxmnhsqydDzpt6r6");
        assert_eq!(SYSTEM_PROGRAM_ID.to_string(), "11111111111111111111111111111111");
        assert_eq!(TOKEN_PROGRAM_ID.to_string(), "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
        assert_eq!(
            ASSOCIATED_TOKEN_PROGRAM_ID.to_string(),
            "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL"
        );
        assert_eq!(USDC_MINT.to_string(), "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");
    }

    #[test]
    fn test_create_agent_wallet_bytes() {
        let authority = Pubkey::new([1; 32]);
        let org = Pubkey::new([7; 32]);
        let (ix, pda, bump) = create_agent_wallet(&authority, &org, "agent-1", 1_000, 5_000).unwrap();

        assert_eq!(bump, 252);
        let mut expected = vec![243, 173, 1, 184, 209, 14, 51, 108];
        expected.extend_from_slice(&[7, 0, 0, 0]);
        expected.extend_from_slice(b"agent-1");
        expected.extend_from_slice(&1_000u64.to_le_bytes());
        expected.extend_from_slice(&5_000u64.to_le_bytes());
        assert_eq!(ix.data, expected);

        assert_eq!(ix.program_id, PROGRAM_ID);
        assert_eq!(ix.accounts[0], AccountMeta::writable(authority, true));
        assert_eq!(ix.accounts[1], AccountMeta::readonly(org, false));
        assert_eq!(ix.accounts[2], AccountMeta::writable(pda, false));
        assert_eq!(ix.accounts[3], AccountMeta::readonly(SYSTEM_PROGRAM_ID, false));
    }

    #[test]
    fn test_transfer_with_limit_accounts() {
        let authority = Pubkey::new([1; 32]);
        let pda = Pubkey::new([2; 32]);
        let recipient = Pubkey::new([3; 32]);
        let fee = Pubkey::new([4; 32]);

        let ix = transfer_with_limit(&authority, &pda, Some(&fee), &recipient, 777).unwrap();
        assert_eq!(&ix.data[..8], &[215, 112, 13, 204, 112, 220, 22, 219]);
        assert_eq!(&ix.data[8..], &777u64.to_le_bytes());
        assert_eq!(ix.accounts.len(), 6);
        assert_eq!(ix.accounts[2].pubkey, platform_config_pda().unwrap().0);
        assert!(!ix.accounts[2].is_writable);
        assert_eq!(ix.accounts[3], AccountMeta::writable(fee, false));
        assert_eq!(ix.accounts[4], AccountMeta::writable(recipient, false));

        let no_fee = transfer_with_limit(&authority, &pda, None, &recipient, 777).unwrap();
        assert_eq!(no_fee.accounts[3].pubkey, SYSTEM_PROGRAM_ID);
    }

    #[test]
    fn test_update_limits_bytes() {
        let ix = update_limits(&Pubkey::new([1; 32]), &Pubkey::new([2; 32]), 10, 20, false);
        assert_eq!(ix.data.len(), 8 + 8 + 8 + 1);
        assert_eq!(&ix.data[..8], &[89, 37, 137, 60, 75, 70, 48, 194]);
        assert_eq!(ix.data[24], 0);
        assert!(ix.accounts[0].is_signer && !ix.accounts[0].is_writable);
    }

    fn encoded_state(agent_id: &str, last_reset_day: i64) -> Vec<u8> {
        BorshWriter::with_prefix(&account_discriminator("AgentWallet"))
            .pubkey(&Pubkey::new([1; 32]))
            .pubkey(&Pubkey::new([7; 32]))
            .string(agent_id)
            .u64(1_000)
            .u64(10_000)
            .u64(2_500)
            .i64(last_reset_day)
            .bool(true)
            .u8(252)
            .into_bytes()
    }

    #[test]
    fn test_decode_agent_wallet() {
        let state = AgentWalletState::decode(&encoded_state("agent-1", 19_800)).unwrap();
        assert_eq!(state.authority, Pubkey::new([1; 32]));
        assert_eq!(state.org, Pubkey::new([7; 32]));
        assert_eq!(state.agent_id, "agent-1");
        assert_eq!(state.daily_spent, 2_500);
        assert_eq!(state.last_reset_day, 19_800);
        assert!(state.is_active);
        assert_eq!(state.bump, 252);
    }

    #[test]
    fn test_decode_short_buffer() {
        let bytes = encoded_state("agent-1", 0);
        let err = AgentWalletState::decode(&bytes[..50]).unwrap_err();
        assert!(err.is_decode());

        // Long enough for the fixed part, but the trailing flags are cut off.
        let mut truncated = bytes.clone();
        truncated.truncate(bytes.len() - 2);
        assert!(AgentWalletState::decode(&truncated).unwrap_err().is_decode());
    }

    #[test]
    fn test_daily_reset() {
        let state = AgentWalletState::decode(&encoded_state("a", 19_800)).unwrap();
        let same_day = 19_800 * SECONDS_PER_DAY + 3_600;
        assert_eq!(state.spent_today(same_day), 2_500);
        assert_eq!(state.available_now(same_day), 1_000);
        let next_day = 19_801 * SECONDS_PER_DAY;
        assert_eq!(state.spent_today(next_day), 0);
    }

    #[test]
    fn test_describe_program_error() {
        let raw = r#"{"InstructionError":[0,{"Custom":6001}]}"#;
        let described = ProgramError::describe(raw);
        assert!(described.starts_with("Transaction would exceed the daily spending limit"));
        assert_eq!(ProgramError::describe("BlockhashNotFound"), "BlockhashNotFound");
    }
}
