//! Index derivation: where entries live in the account-state tree.
//!
//! Pure functions from identifiers to 256-bit tree keys. These mappings
//! are part of the persistent format — they decide where every entry is
//! stored — so they must stay stable across versions. Each entry family
//! gets its own namespace byte so indexes can never collide across
//! families.

use meridian_crypto::{sha512_half, sha512_half_multi};
use meridian_types::{AccountId, Hash256};

const ACCOUNT_ROOT_SPACE: u8 = b'a';
const NICKNAME_SPACE: u8 = b'n';
const RIPPLE_STATE_SPACE: u8 = b'r';

/// Tree key of an account's root entry.
pub fn account_root_index(account: &AccountId) -> Hash256 {
    sha512_half_multi(&[&[ACCOUNT_ROOT_SPACE], account.as_bytes()])
}

/// Tree key of a nickname entry, from the nickname string.
pub fn nickname_index(nickname: &str) -> Hash256 {
    nickname_index_from_hash(&sha512_half(nickname.as_bytes()))
}

/// Tree key of a nickname entry, from the nickname's hash.
pub fn nickname_index_from_hash(nickname_hash: &Hash256) -> Hash256 {
    sha512_half_multi(&[&[NICKNAME_SPACE], nickname_hash.as_bytes()])
}

/// Tree key of the credit-line entry between `account` and `counterparty`
/// for one currency.
pub fn ripple_index(account: &AccountId, counterparty: &AccountId, currency: &Hash256) -> Hash256 {
    sha512_half_multi(&[
        &[RIPPLE_STATE_SPACE],
        account.as_bytes(),
        counterparty.as_bytes(),
        currency.as_bytes(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_index_is_stable_and_distinct() {
        let a = AccountId::new([1; 20]);
        let b = AccountId::new([2; 20]);
        assert_eq!(account_root_index(&a), account_root_index(&a));
        assert_ne!(account_root_index(&a), account_root_index(&b));
    }

    #[test]
    fn namespaces_do_not_collide() {
        // An account id and a nickname hash with identical leading bytes
        // must still land on different keys.
        let account = AccountId::new([7; 20]);
        let nickname_hash = sha512_half(b"alice");
        assert_ne!(
            account_root_index(&account),
            nickname_index_from_hash(&nickname_hash)
        );
    }

    #[test]
    fn nickname_index_matches_hash_form() {
        assert_eq!(
            nickname_index("alice"),
            nickname_index_from_hash(&sha512_half(b"alice"))
        );
    }

    #[test]
    fn ripple_index_is_direction_sensitive() {
        let a = AccountId::new([1; 20]);
        let b = AccountId::new([2; 20]);
        let currency = sha512_half(b"XME");
        assert_ne!(
            ripple_index(&a, &b, &currency),
            ripple_index(&b, &a, &currency)
        );
    }
}
