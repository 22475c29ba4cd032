//! SHA-256 helpers.

use sha2::{Digest, Sha256};

use crate::Hash;

/// Hash a single byte slice.
pub fn sha256(data: &[u8]) -> Hash {
    Hash(Sha256::digest(data).into())
}

/// Hash the concatenation of several byte slices without allocating.
///
/// ```
/// use agentwallet_crypto::{sha256, sha256v};
///
/// assert_eq!(sha256v(&[b"global:", b"update_limits"]), sha256(b"global:update_limits"));
/// ```
pub fn sha256v(parts: &[&[u8]]) -> Hash {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    Hash(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        // sha256("abc")
        let hash = sha256(b"abc");
        assert_eq!(hash.0[0], 0xba);
        assert_eq!(hash.0[1], 0x78);
        assert_eq!(hash.0[31], 0xad);
    }

    #[test]
    fn test_sha256v_empty_parts() {
        assert_eq!(sha256v(&[]), sha256(b""));
        assert_eq!(sha256v(&[b"", b"abc", b""]), sha256(b"abc"));
    }
}
