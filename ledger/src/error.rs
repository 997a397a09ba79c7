use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger is already closed")]
    AlreadyClosed,

    #[error("ledger is closed; structural mutation is no longer permitted")]
    NotOpen,

    #[error("ledger must be closed first")]
    NotClosed,

    #[error("ledger is immutable; the operation was refused")]
    Immutable,

    #[error("only accepted ledgers may be persisted")]
    NotAccepted,

    #[error("ledgers are not hash-chain adjacent")]
    NotCompatible,

    #[error("bad ledger encoding: {0}")]
    BadEncoding(String),

    #[error("balance arithmetic overflowed; ledger state is corrupt")]
    AmountOverflow,

    #[error("could not re-base: {applied} of {pending} transactions re-applied (limit {limit})")]
    RebaseFailed {
        applied: usize,
        pending: usize,
        limit: usize,
    },

    #[error("tree error: {0}")]
    Tree(#[from] meridian_tree::TreeError),

    #[error("storage error: {0}")]
    Storage(#[from] meridian_store::StoreError),
}
