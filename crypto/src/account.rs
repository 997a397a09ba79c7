//! Account-id derivation.

use crate::hash::sha512_half;
use meridian_types::{AccountId, PublicKey};

/// Derive the 20-byte account id for a public key.
///
/// SHA-512-half of the key bytes, truncated to 160 bits. Stable across
/// versions: this mapping defines where an account's state lives in the
/// account-state tree, so it can never change.
pub fn derive_account_id(public_key: &PublicKey) -> AccountId {
    let digest = sha512_half(public_key.as_bytes());
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest.as_bytes()[..20]);
    AccountId::new(out)
}
