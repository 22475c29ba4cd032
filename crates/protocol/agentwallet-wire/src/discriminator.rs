//! Anchor-style discriminators.
//!
//! ```text
//! instruction: sha256("global:" + name)[0..8]
//! account:     sha256("account:" + TypeName)[0..8]
//! ```

use agentwallet_crypto::sha256v;

/// Tag prefixed to instruction data for the handler named `name`.
pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    first_eight(&sha256v(&[b"global:", name.as_bytes()]).0)
}

/// Tag at the start of account data for the account type `type_name`.
pub fn account_discriminator(type_name: &str) -> [u8; 8] {
    first_eight(&sha256v(&[b"account:", type_name.as_bytes()]).0)
}

fn first_eight(hash: &[u8; 32]) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(&hash[..8]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_instruction_discriminators() {
        assert_eq!(
            instruction_discriminator("create_agent_wallet"),
            [243, 173, 1, 184, 209, 14, 51, 108]
        );
        assert_eq!(
            instruction_discriminator("transfer_with_limit"),
            [215, 112, 13, 204, 112, 220, 22, 219]
        );
        assert_eq!(
            instruction_discriminator("update_limits"),
            [89, 37, 137, 60, 75, 70, 48, 194]
        );
    }

    #[test]
    fn test_account_discriminator() {
        assert_eq!(
            account_discriminator("AgentWallet"),
            [127, 35, 180, 143, 201, 1, 100, 50]
        );
        assert_ne!(account_discriminator("AgentWallet"), instruction_discriminator("AgentWallet"));
    }
}
