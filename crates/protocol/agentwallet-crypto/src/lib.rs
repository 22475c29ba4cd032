//! Cryptographic primitives for AgentWallet.
//!
//! This crate provides the key material and hashing used across the
//! workspace:
//!
//! - **Public keys**: 32-byte ed25519 points, rendered as base58 addresses
//! - **Keypairs**: ed25519 signing keys that zeroize on drop
//! - **Signatures**: 64-byte ed25519 signatures, rendered as base58
//! - **Hashing**: SHA-256 helpers used for PDA derivation and discriminators
//! - **Key vault**: AES-256-GCM encryption of signing keys at rest
//!
//! # Example
//!
//! ```
//! use agentwallet_crypto::{Keypair, Pubkey};
//!
//! let keypair = Keypair::generate();
//! let address: Pubkey = keypair.pubkey();
//! let parsed: Pubkey = address.to_string().parse().unwrap();
//! assert_eq!(address, parsed);
//!
//! let signature = keypair.sign(b"message");
//! assert!(address.verify(b"message", &signature));
//! ```

mod error;
mod hash;
mod keypair;
mod serde_impl;
mod vault;

pub use error::CryptoError;
pub use hash::{sha256, sha256v};
pub use keypair::Keypair;
pub use vault::KeyVault;

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{Signature as DalekSignature, Verifier, VerifyingKey};

/// A 32-byte ed25519 public key or program-derived address.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pubkey(pub [u8; 32]);

impl Pubkey {
    /// Create a Pubkey from raw bytes.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse from a byte slice, checking the length.
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: 32,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }

    /// Whether these bytes decompress to a point on the ed25519 curve.
    ///
    /// Program-derived addresses are required to be off-curve so that no
    /// private key can exist for them.
    pub fn is_on_curve(&self) -> bool {
        VerifyingKey::from_bytes(&self.0).is_ok()
    }

    /// Verify an ed25519 signature over `message` made by this key.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(&self.0) else {
            return false;
        };
        let sig = DalekSignature::from_bytes(&signature.0);
        key.verify(message, &sig).is_ok()
    }

    /// A shortened form for log lines: first and last four characters.
    pub fn short(&self) -> String {
        truncate_b58(&self.to_string())
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(&self.0).into_string())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({})", self)
    }
}

impl FromStr for Pubkey {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.len() > 44 {
            return Err(CryptoError::InvalidBase58(format!(
                "public key must be 1-44 base58 characters, got {}",
                s.len()
            )));
        }
        let decoded = bs58::decode(s)
            .into_vec()
            .map_err(|e| CryptoError::InvalidBase58(e.to_string()))?;
        Self::try_from_slice(&decoded)
    }
}

impl AsRef<[u8]> for Pubkey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A 64-byte ed25519 signature. Also serves as a transaction id.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    /// Create a Signature from raw bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes of the signature.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    pub fn short(&self) -> String {
        truncate_b58(&self.to_string())
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self([0u8; 64])
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(&self.0).into_string())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self.short())
    }
}

impl FromStr for Signature {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decoded = bs58::decode(s)
            .into_vec()
            .map_err(|e| CryptoError::InvalidBase58(e.to_string()))?;
        let arr: [u8; 64] = decoded
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: 64,
                actual: decoded.len(),
            })?;
        Ok(Self(arr))
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A 32-byte SHA-256 digest. Recent blockhashes use this type too.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Hash(pub [u8; 32]);

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(&self.0).into_string())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self)
    }
}

impl FromStr for Hash {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decoded = bs58::decode(s)
            .into_vec()
            .map_err(|e| CryptoError::InvalidBase58(e.to_string()))?;
        let arr: [u8; 32] = decoded
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: 32,
                actual: decoded.len(),
            })?;
        Ok(Self(arr))
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn truncate_b58(full: &str) -> String {
    if full.len() <= 12 {
        return full.to_string();
    }
    format!("{}..{}", &full[..4], &full[full.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_program_is_all_zero() {
        let system: Pubkey = "11111111111111111111111111111111".parse().unwrap();
        assert_eq!(system, Pubkey::default());
        assert_eq!(system.to_string(), "11111111111111111111111111111111");
    }

    #[test]
    fn test_pubkey_rejects_wrong_length() {
        let err = "3yZe7d".parse::<Pubkey>().unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKeyLength { expected: 32, .. }));
    }

    #[test]
    fn test_pubkey_rejects_bad_alphabet() {
        // '0' and 'O' are not in the base58 alphabet
        assert!("0OOOOOOOOOOOOOOOOOOOOOOOOOOOOOOO".parse::<Pubkey>().is_err());
        assert!("".parse::<Pubkey>().is_err());
    }

    #[test]
    fn test_generated_key_is_on_curve() {
        let keypair = Keypair::generate();
        assert!(keypair.pubkey().is_on_curve());
    }

    #[test]
    fn test_signature_parse_display() {
        let keypair = Keypair::generate();
        let sig = keypair.sign(b"abc");
        let parsed: Signature = sig.to_string().parse().unwrap();
        assert_eq!(sig, parsed);
        assert!(sig.short().contains(".."));
    }

    #[test]
    fn test_verify_rejects_other_message() {
        let keypair = Keypair::generate();
        let sig = keypair.sign(b"pay 10");
        assert!(keypair.pubkey().verify(b"pay 10", &sig));
        assert!(!keypair.pubkey().verify(b"pay 11", &sig));
    }
}
