//! SHA-512-half hashing for content addressing.
//!
//! Every identity in the system — tree node hashes, transaction hashes,
//! ledger hashes, account-state indexes — is the first 256 bits of a
//! SHA-512 digest.

use meridian_types::Hash256;
use sha2::{Digest, Sha512};

/// Compute the 256-bit SHA-512-half hash of arbitrary data.
pub fn sha512_half(data: &[u8]) -> Hash256 {
    let mut hasher = Sha512::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result[..32]);
    Hash256::new(output)
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn sha512_half_multi(parts: &[&[u8]]) -> Hash256 {
    let mut hasher = Sha512::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result[..32]);
    Hash256::new(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha512_half_deterministic() {
        let h1 = sha512_half(b"hello meridian");
        let h2 = sha512_half(b"hello meridian");
        assert_eq!(h1, h2);
    }

    #[test]
    fn sha512_half_different_inputs() {
        assert_ne!(sha512_half(b"hello"), sha512_half(b"world"));
    }

    #[test]
    fn sha512_half_empty_not_zero() {
        assert!(!sha512_half(b"").is_zero());
    }

    #[test]
    fn multi_equivalent_to_concatenation() {
        let single = sha512_half(b"helloworld");
        let multi = sha512_half_multi(&[b"hello", b"world"]);
        assert_eq!(single, multi);
    }
}
