use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransactionError {
    #[error("encoding shorter than the canonical layout")]
    Truncated,

    #[error("{0} bytes past the end of the canonical layout")]
    TrailingBytes(usize),

    #[error("unknown payload tag {0}")]
    UnknownPayloadTag(u8),

    #[error("payment amount must not be zero")]
    ZeroAmount,

    #[error("payment source and destination must differ")]
    SelfPayment,

    #[error("sequence numbers start at 1")]
    ZeroSequence,
}
