//! Cryptographic primitives for the meridian ledger core.
//!
//! - **SHA-512-half** (the first 256 bits of SHA-512) for all content
//!   addressing: tree nodes, transactions, ledger identity
//! - **Ed25519** for signing and signature verification
//! - Account-id derivation from a public key
//!
//! The rest of the workspace treats these as black boxes; nothing above this
//! crate names a digest or curve.

pub mod account;
pub mod hash;
pub mod keys;
pub mod sign;

pub use account::derive_account_id;
pub use hash::{sha512_half, sha512_half_multi};
pub use keys::{generate_keypair, keypair_from_private, keypair_from_seed, public_from_private};
pub use sign::{sign_message, verify_signature};
