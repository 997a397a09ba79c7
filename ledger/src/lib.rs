//! Versioned ledger snapshots.
//!
//! A [`Ledger`] is one hash-chained snapshot of global account state plus
//! the transactions applied to produce it. It owns two
//! [`meridian_tree::HashTree`]s — the transaction map and the account-state
//! map — shared copy-on-write with its predecessor, and moves through the
//! lifecycle open → closed → accepted. Accepted ledgers are immutable and
//! safe to share across threads (`Arc<Ledger>`); an open ledger under
//! construction is mutated exclusively through `&mut self`, with
//! [`SharedLedger`] for cross-thread construction.

pub mod apply;
pub mod entry;
pub mod error;
pub mod index;
pub mod json;
pub mod ledger;
pub mod persist;
pub mod rebase;

pub use apply::TxOutcome;
pub use entry::{AccountState, EntryLookup, EntryWrite, LedgerEntry, LookupMode};
pub use error::LedgerError;
pub use index::{account_root_index, nickname_index, nickname_index_from_hash, ripple_index};
pub use ledger::Ledger;
pub use persist::{load_by_hash, load_by_index, save_accepted_ledger};

use std::sync::{Arc, Mutex};

/// An open ledger shared between worker threads during construction.
/// All mutation happens under the one exclusive lock.
pub type SharedLedger = Arc<Mutex<Ledger>>;
