//! Radix-16 content-addressed hash tree — "the map".
//!
//! Both of a ledger's maps (transactions, account state) are instances of
//! [`HashTree`]: a 16-way radix tree over 256-bit keys where every node
//! stores the canonical hash of its contents. Inner nodes hash their 16
//! child hashes; leaves hash their item id and payload. The tree supports:
//!
//! - insertion, removal, and non-blocking fetch of leaves
//! - O(1) cloning with copy-on-write structural sharing (`Arc` per node,
//!   only the mutated root-to-leaf path is rebuilt)
//! - lock-step structural diff between two trees, skipping any subtree
//!   whose hashes already match — the synchronization primitive
//! - partial materialization: a tree built from a bare root hash holds
//!   placeholder children that an external fetcher resolves one node at a
//!   time via the wire encoding
//!
//! Node fetches never block: a descent that reaches a placeholder returns
//! [`Fetch::Pending`] with the hash the caller must acquire out-of-band.

pub mod diff;
pub mod error;
pub mod node;
pub mod tree;

pub use diff::DiffKind;
pub use error::TreeError;
pub use node::{Child, LeafKind, Node, NodeBody, MAX_DEPTH};
pub use tree::{Fetch, HashTree, InsertOutcome, LeafView, RemoveOutcome, SupplyOutcome, SyncStatus, TreeKind};
