//! Ed25519 keypairs.

use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;
use crate::{Pubkey, Signature};

/// An ed25519 signing keypair.
///
/// Only the 32-byte secret seed is held; the public half is recomputed on
/// demand. The seed is cleared from memory when the keypair is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Keypair {
    secret: [u8; 32],
}

impl Keypair {
    /// Generate a new keypair from the operating system RNG.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self {
            secret: signing_key.to_bytes(),
        }
    }

    /// Build from a 32-byte secret seed.
    pub fn from_secret(secret: [u8; 32]) -> Self {
        Self { secret }
    }

    /// Build from a 64-byte `secret || public` blob, the layout used by
    /// Solana CLI keypair files. The public half must match the secret.
    pub fn from_keypair_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != 64 {
            return Err(CryptoError::InvalidKeyLength {
                expected: 64,
                actual: bytes.len(),
            });
        }
        let mut secret = [0u8; 32];
        secret.copy_from_slice(&bytes[..32]);
        let keypair = Self { secret };
        if keypair.pubkey().0[..] != bytes[32..] {
            return Err(CryptoError::KeyMismatch);
        }
        Ok(keypair)
    }

    /// Raw secret seed. Callers must not persist this unencrypted.
    pub fn secret_bytes(&self) -> &[u8; 32] {
        &self.secret
    }

    /// The 64-byte `secret || public` encoding.
    pub fn to_keypair_bytes(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.secret);
        out[32..].copy_from_slice(&self.pubkey().0);
        out
    }

    pub fn pubkey(&self) -> Pubkey {
        Pubkey(self.signing_key().verifying_key().to_bytes())
    }

    /// Sign raw message bytes (no pre-hashing).
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key().sign(message).to_bytes())
    }

    fn signing_key(&self) -> SigningKey {
        SigningKey::from_bytes(&self.secret)
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Keypair({}, [REDACTED])", self.pubkey())
    }
}
