//! Persistence glue: accepted ledgers in and out of a [`LedgerStore`].
//!
//! Ledgers cross the storage boundary only in their canonical raw
//! encoding, so anything a store hands back round-trips losslessly.

use crate::error::LedgerError;
use crate::ledger::Ledger;
use meridian_store::LedgerStore;
use meridian_types::{Hash256, LedgerSeq};

/// Persist a fully accepted ledger. Persisting anything else is a caller
/// bug and is refused.
pub fn save_accepted_ledger<S: LedgerStore>(store: &S, ledger: &Ledger) -> Result<(), LedgerError> {
    if !ledger.is_accepted() {
        return Err(LedgerError::NotAccepted);
    }
    let hash = ledger.identity_hash().ok_or(LedgerError::NotClosed)?;
    store.save_accepted(ledger.sequence(), hash, &ledger.to_raw_bytes())?;
    Ok(())
}

/// Load the ledger at a chain position, as a shell to be re-synced.
pub fn load_by_index<S: LedgerStore>(store: &S, seq: LedgerSeq) -> Result<Ledger, LedgerError> {
    Ledger::from_raw(&store.load_by_index(seq)?)
}

/// Load the ledger with a given identity hash, as a shell to be re-synced.
pub fn load_by_hash<S: LedgerStore>(store: &S, hash: &Hash256) -> Result<Ledger, LedgerError> {
    Ledger::from_raw(&store.load_by_hash(hash)?)
}
