//! Program-derived address search.
//!
//! A PDA is an address with no private key: a SHA-256 output that does not
//! decode to a point on the ed25519 curve.
//!
//! ```text
//! for bump in 255..=0:
//!     candidate = sha256(seed_0 || ... || seed_n || [bump] || program_id || "ProgramDerivedAddress")
//!     if candidate is off-curve: return (candidate, bump)
//! ```

use agentwallet_crypto::{sha256v, Pubkey};

use crate::error::{WireError, WireResult};
use crate::program::{ASSOCIATED_TOKEN_PROGRAM_ID, PROGRAM_ID, TOKEN_PROGRAM_ID};

/// Maximum length of one seed.
pub const MAX_SEED_LEN: usize = 32;

/// Maximum number of seeds, counting the bump.
pub const MAX_SEEDS: usize = 16;

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Seed prefix of agent wallet accounts.
pub const AGENT_WALLET_SEED: &[u8] = b"agent_wallet";

/// Seed of the singleton platform configuration account.
pub const PLATFORM_CONFIG_SEED: &[u8] = b"platform_config";

fn check_seeds(seeds: &[&[u8]]) -> WireResult<()> {
    if seeds.len() >= MAX_SEEDS {
        return Err(WireError::TooManySeeds(seeds.len()));
    }
    for (index, seed) in seeds.iter().enumerate() {
        if seed.len() > MAX_SEED_LEN {
            return Err(WireError::SeedTooLong {
                index,
                len: seed.len(),
            });
        }
    }
    Ok(())
}

/// Hash one candidate for `bump`. Returns `None` if it lands on the curve.
pub fn create_program_address(seeds: &[&[u8]], bump: u8, program_id: &Pubkey) -> WireResult<Option<Pubkey>> {
    check_seeds(seeds)?;
    let bump_seed = [bump];
    let mut parts: Vec<&[u8]> = Vec::with_capacity(seeds.len() + 3);
    parts.extend_from_slice(seeds);
    parts.push(&bump_seed);
    parts.push(program_id.as_bytes());
    parts.push(PDA_MARKER);

    let candidate = Pubkey::new(sha256v(&parts).0);
    Ok((!candidate.is_on_curve()).then_some(candidate))
}

/// Find the canonical (highest-bump) off-curve address for `seeds`.
pub fn derive_pda(seeds: &[&[u8]], program_id: &Pubkey) -> WireResult<(Pubkey, u8)> {
    for bump in (0..=u8::MAX).rev() {
        if let Some(address) = create_program_address(seeds, bump, program_id)? {
            return Ok((address, bump));
        }
    }
    Err(WireError::NoViableBump)
}

/// Address of the agent wallet account for `org` and `agent_id_seed`.
pub fn agent_wallet_pda(org: &Pubkey, agent_id_seed: &str) -> WireResult<(Pubkey, u8)> {
    derive_pda(
        &[AGENT_WALLET_SEED, org.as_bytes(), agent_id_seed.as_bytes()],
        &PROGRAM_ID,
    )
}

/// Address of the platform configuration account.
pub fn platform_config_pda() -> WireResult<(Pubkey, u8)> {
    derive_pda(&[PLATFORM_CONFIG_SEED], &PROGRAM_ID)
}

/// Associated token account of `owner` for `mint`.
pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey) -> WireResult<Pubkey> {
    let (address, _) = derive_pda(
        &[owner.as_bytes(), TOKEN_PROGRAM_ID.as_bytes(), mint.as_bytes()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )?;
    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::USDC_MINT;

    const ORG: Pubkey = Pubkey::new([7u8; 32]);

    #[test]
    fn test_agent_wallet_golden_vector() {
        // The first three bumps (255, 254, 253) land on the curve for this input.
        let (address, bump) = agent_wallet_pda(&ORG, "agent-1").unwrap();
        assert_eq!(address.to_string(), "GhckcPFojMxjHvp3LDTPu41ALZYcfiiduEau2WpbkrfL");
        assert_eq!(bump, 252);
        for skipped in 253..=255u8 {
            let seeds: [&[u8]; 3] = [AGENT_WALLET_SEED, ORG.as_bytes(), b"agent-1"];
            assert_eq!(create_program_address(&seeds, skipped, &PROGRAM_ID).unwrap(), None);
        }
    }

    #[test]
    fn test_deterministic_and_seed_sensitive() {
        let first = agent_wallet_pda(&ORG, "agent-1").unwrap();
        let second = agent_wallet_pda(&ORG, "agent-1").unwrap();
        assert_eq!(first, second);

        let other = agent_wallet_pda(&ORG, "agent-2").unwrap();
        assert_eq!(other.0.to_string(), "wnx9LYmp4QhBW5e5rw5emMmHyFAruzGQpz5RC1VgN7X");
        assert_eq!(other.1, 254);
        assert_ne!(first.0, other.0);
        assert!(!other.0.is_on_curve());
    }

    #[test]
    fn test_platform_config_pda() {
        let (address, bump) = platform_config_pda().unwrap();
        assert_eq!(address.to_string(), "9hFr15AFaQPDqsotRWtK9VyFmxuWmZnrjxViGZyNRZR5");
        assert_eq!(bump, 255);
    }

    #[test]
    fn test_associated_token_address() {
        let ata = associated_token_address(&ORG, &USDC_MINT).unwrap();
        assert_eq!(ata.to_string(), "7EJSueeCjseYzghxU2XhcGEUn7RJDh43Z2dL6dvGy9mw");
    }

    #[test]
    fn test_seed_limits() {
        let long = [0u8; 33];
        let err = derive_pda(&[&long], &PROGRAM_ID).unwrap_err();
        assert_eq!(err, WireError::SeedTooLong { index: 0, len: 33 });

        let seeds: Vec<&[u8]> = vec![b"s"; 16];
        assert_eq!(derive_pda(&seeds, &PROGRAM_ID).unwrap_err(), WireError::TooManySeeds(16));
    }
}
