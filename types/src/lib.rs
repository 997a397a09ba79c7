//! Fundamental types for the meridian ledger core.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: the uniform 256-bit identifier, account ids, drop amounts,
//! timestamps, key material, and ledger parameters.

pub mod account;
pub mod amount;
pub mod hash;
pub mod keys;
pub mod params;
pub mod time;

pub use account::AccountId;
pub use amount::Amount;
pub use hash::Hash256;
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use params::LedgerParams;
pub use time::Timestamp;

/// Position of a ledger in the hash chain (strictly increasing, genesis = 0).
pub type LedgerSeq = u32;

/// Per-account transaction counter (strictly increasing, fresh account = 0).
pub type TxSeq = u32;
