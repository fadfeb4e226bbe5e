use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Rejected input; the store is left untouched.
    #[error("{0}")]
    InputValidation(String),

    /// The stored document could not be decoded.
    #[error("stored ledger is unreadable: {0}")]
    PersistenceRead(String),

    /// The remote snapshot could not be fetched or decoded.
    #[error("remote snapshot unavailable: {0}")]
    SyncTransport(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl LedgerError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        LedgerError::InputValidation(msg.into())
    }
}
