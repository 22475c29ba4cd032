//! Encryption of wallet signing keys at rest.
//!
//! Secret seeds are sealed with AES-256-GCM under a single master key. The
//! stored form is `base64(nonce || ciphertext)`, so one string column is
//! enough to persist a wallet key.
//!
//! The master key is either supplied directly (32 raw bytes, or base64 of
//! them from configuration) or derived from a passphrase with Argon2id.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::Argon2;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;
use crate::Keypair;

/// Nonce length for AES-GCM.
const NONCE_LEN: usize = 12;

/// Minimum salt length accepted by Argon2.
const MIN_SALT_LEN: usize = 8;

/// Seals and opens wallet signing keys.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyVault {
    key: [u8; 32],
}

impl KeyVault {
    /// Create a vault from a raw 32-byte master key.
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Create a vault from a base64-encoded 32-byte master key.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let mut bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| CryptoError::encryption(format!("Invalid master key encoding: {}", e)))?;
        if bytes.len() != 32 {
            let actual = bytes.len();
            bytes.zeroize();
            return Err(CryptoError::InvalidKeyLength {
                expected: 32,
                actual,
            });
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(Self { key })
    }

    /// Derive the master key from a passphrase using Argon2id.
    pub fn from_passphrase(passphrase: &str, salt: &[u8]) -> Result<Self, CryptoError> {
        if salt.len() < MIN_SALT_LEN {
            return Err(CryptoError::encryption(format!(
                "Salt must be at least {} bytes",
                MIN_SALT_LEN
            )));
        }
        let mut key = [0u8; 32];
        Argon2::default()
            .hash_password_into(passphrase.as_bytes(), salt, &mut key)
            .map_err(|e| CryptoError::encryption(format!("Key derivation failed: {}", e)))?;
        Ok(Self { key })
    }

    /// Generate a random master key, returned base64-encoded for config files.
    pub fn generate_master_key() -> String {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        let encoded = BASE64.encode(key);
        key.zeroize();
        encoded
    }

    /// Encrypt a keypair's secret seed.
    pub fn seal(&self, keypair: &Keypair) -> Result<String, CryptoError> {
        let cipher = self.cipher()?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, keypair.secret_bytes().as_ref())
            .map_err(|e| CryptoError::encryption(format!("Encryption failed: {}", e)))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(blob))
    }

    /// Decrypt a sealed secret back into a keypair.
    pub fn open(&self, sealed: &str) -> Result<Keypair, CryptoError> {
        let blob = BASE64
            .decode(sealed)
            .map_err(|e| CryptoError::encryption(format!("Invalid sealed key encoding: {}", e)))?;
        if blob.len() <= NONCE_LEN {
            return Err(CryptoError::encryption("Sealed key too short"));
        }
        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);

        let mut plaintext = self
            .cipher()?
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CryptoError::encryption("Decryption failed (wrong master key?)"))?;

        if plaintext.len() != 32 {
            let actual = plaintext.len();
            plaintext.zeroize();
            return Err(CryptoError::InvalidKeyLength {
                expected: 32,
                actual,
            });
        }
        let mut secret = [0u8; 32];
        secret.copy_from_slice(&plaintext);
        plaintext.zeroize();
        let keypair = Keypair::from_secret(secret);
        secret.zeroize();
        Ok(keypair)
    }

    fn cipher(&self) -> Result<Aes256Gcm, CryptoError> {
        Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| CryptoError::encryption(format!("Cipher init failed: {}", e)))
    }
}

impl std::fmt::Debug for KeyVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyVault([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_and_open() {
        let vault = KeyVault::new([9u8; 32]);
        let keypair = Keypair::generate();
        let sealed = vault.seal(&keypair).unwrap();
        let opened = vault.open(&sealed).unwrap();
        assert_eq!(opened.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_nonce_is_fresh_per_seal() {
        let vault = KeyVault::new([1u8; 32]);
        let keypair = Keypair::generate();
        assert_ne!(vault.seal(&keypair).unwrap(), vault.seal(&keypair).unwrap());
    }

    #[test]
    fn test_wrong_master_key_fails() {
        let keypair = Keypair::generate();
        let sealed = KeyVault::new([1u8; 32]).seal(&keypair).unwrap();
        let err = KeyVault::new([2u8; 32]).open(&sealed).unwrap_err();
        assert!(matches!(err, CryptoError::Encryption(_)));
    }

    #[test]
    fn test_truncated_blob_fails() {
        let vault = KeyVault::new([1u8; 32]);
        let short = BASE64.encode([0u8; 8]);
        assert!(vault.open(&short).is_err());
        assert!(vault.open("!!!").is_err());
    }

    #[test]
    fn test_from_base64() {
        let encoded = KeyVault::generate_master_key();
        let vault = KeyVault::from_base64(&encoded).unwrap();
        let keypair = Keypair::generate();
        let sealed = vault.seal(&keypair).unwrap();
        assert_eq!(vault.open(&sealed).unwrap().pubkey(), keypair.pubkey());

        let err = KeyVault::from_base64(&BASE64.encode([0u8; 16])).unwrap_err();
        assert_eq!(
            err,
            CryptoError::InvalidKeyLength {
                expected: 32,
                actual: 16
            }
        );
    }

    #[test]
    fn test_passphrase_requires_salt() {
        assert!(KeyVault::from_passphrase("hunter2", b"short").is_err());
    }

    #[test]
    fn test_passphrase_derivation_is_stable() {
        let a = KeyVault::from_passphrase("correct horse", b"agentwallet-salt").unwrap();
        let b = KeyVault::from_passphrase("correct horse", b"agentwallet-salt").unwrap();
        let keypair = Keypair::generate();
        let sealed = a.seal(&keypair).unwrap();
        assert_eq!(b.open(&sealed).unwrap().pubkey(), keypair.pubkey());
    }
}
