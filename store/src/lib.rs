//! Storage contract for accepted ledgers.
//!
//! The core does not prescribe a storage medium; it requires exactly three
//! operations over the canonical raw ledger encoding, and that loaded
//! ledgers round-trip through that encoding losslessly. Durable backends
//! implement [`LedgerStore`]; the rest of the workspace depends only on the
//! trait. [`MemoryStore`] is the in-memory backend used by tests.

pub mod error;
pub mod memory;

pub use error::StoreError;
pub use memory::MemoryStore;

use meridian_types::{Hash256, LedgerSeq};

/// Persistence contract for fully accepted ledgers.
pub trait LedgerStore {
    /// Persist an accepted ledger's raw encoding under both its chain
    /// position and its identity hash.
    fn save_accepted(&self, seq: LedgerSeq, hash: Hash256, raw: &[u8]) -> Result<(), StoreError>;

    /// Load the raw encoding of the ledger at a chain position.
    fn load_by_index(&self, seq: LedgerSeq) -> Result<Vec<u8>, StoreError>;

    /// Load the raw encoding of the ledger with a given identity hash.
    fn load_by_hash(&self, hash: &Hash256) -> Result<Vec<u8>, StoreError>;
}
