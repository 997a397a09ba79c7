//! Diagnostic JSON projection of a ledger.
//!
//! Read-only observability surface: header fields, lifecycle flags, and
//! summary counts. Never used for hashing or persistence.

use crate::ledger::Ledger;
use serde_json::{json, Value};

impl Ledger {
    /// A JSON snapshot of the ledger header and summary counts. Counts are
    /// `null` while the corresponding tree is not fully local.
    pub fn to_json(&self) -> Value {
        json!({
            "hash": self.identity_hash().map(|hash| hash.to_string()),
            "parent_hash": self.parent_hash().to_string(),
            "transaction_root": self.transaction_root().to_string(),
            "account_state_root": self.account_state_root().to_string(),
            "fee_held": self.fee_held().drops(),
            "timestamp": self.timestamp().as_secs(),
            "sequence": self.sequence(),
            "closed": self.is_closed(),
            "accepted": self.is_accepted(),
            "immutable": self.is_immutable(),
            "acquiring": self.is_acquiring(),
            "transaction_count": self.transaction_map().leaf_count().ok(),
            "account_count": self.account_state_map().leaf_count().ok(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_crypto::keypair_from_seed;
    use meridian_types::{Amount, Hash256, Timestamp};

    #[test]
    fn json_reflects_header_and_counts() {
        let keys = keypair_from_seed(&[42u8; 32]);
        let mut ledger = Ledger::genesis(&keys.public, Amount::new(1_000));
        ledger.close(Timestamp::new(123)).unwrap();

        let value = ledger.to_json();
        assert_eq!(value["sequence"], 0);
        assert_eq!(value["timestamp"], 123);
        assert_eq!(value["closed"], true);
        assert_eq!(value["accepted"], false);
        assert_eq!(value["transaction_count"], 0);
        assert_eq!(value["account_count"], 1);
        assert_eq!(
            value["hash"],
            ledger.identity_hash().unwrap().to_string()
        );
    }

    #[test]
    fn shell_ledger_counts_are_null() {
        let shell = Ledger::from_header(
            Hash256::new([1; 32]),
            Hash256::new([2; 32]),
            Hash256::new([3; 32]),
            Amount::ZERO,
            Timestamp::new(9),
            4,
        );
        let value = shell.to_json();
        assert!(value["transaction_count"].is_null());
        assert!(value["account_count"].is_null());
        assert_eq!(value["sequence"], 4);
    }
}
