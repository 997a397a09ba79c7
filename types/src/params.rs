//! Ledger parameters.

use crate::amount::Amount;
use serde::{Deserialize, Serialize};

/// Tunable constants carried by every ledger.
///
/// These are fixed at construction and inherited by successor ledgers; the
/// core does not prescribe how a network agrees on them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerParams {
    /// Minimum fee a transaction must offer to be applied.
    pub min_tx_fee: Amount,

    /// Balance granted to the master account by the bootstrap ledger.
    pub genesis_balance: Amount,
}

impl LedgerParams {
    pub fn defaults() -> Self {
        Self {
            min_tx_fee: Amount::new(10),
            // 100 billion drops, the full initial supply.
            genesis_balance: Amount::new(100_000_000_000),
        }
    }
}

impl Default for LedgerParams {
    fn default() -> Self {
        Self::defaults()
    }
}
