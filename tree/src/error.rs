use meridian_types::Hash256;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("slot for {id} holds a leaf of a different kind")]
    WrongType { id: Hash256 },

    #[error("leaf kind is not valid for this map")]
    KindMismatch,

    #[error("tree is sealed; no further mutation is permitted")]
    Sealed,

    #[error("node {0} is not locally present; fetch it first")]
    Incomplete(Hash256),

    #[error("supplied node hashes to {actual}, expected {expected}")]
    HashMismatch { expected: Hash256, actual: Hash256 },

    #[error("malformed node encoding: {0}")]
    Malformed(String),

    #[error("key exhausted all 64 nibbles without resolving")]
    DepthExceeded,
}
