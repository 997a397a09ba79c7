use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("ledger not found: {0}")]
    NotFound(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}
