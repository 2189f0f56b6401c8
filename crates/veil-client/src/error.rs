use thiserror::Error;

use veil_types::ValidationError;

/// Failures talking to the owner/message store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Link id already taken")]
    Conflict,

    #[error("Record not found")]
    NotFound,

    #[error("Unreadable store response: {0}")]
    Corrupt(String),
}

/// Everything a client operation can fail with. None of these are fatal;
/// each maps to an inline message or a redirect.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("No wallet connectors available. Please install a wallet.")]
    WalletUnavailable,

    #[error("Failed to connect wallet: {0}")]
    WalletConnect(String),

    #[error("Link creation already in progress")]
    SubmissionInFlight,

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The link id does not resolve to an owner. Callers redirect to the entry page.
    #[error("No inbox for link {0}")]
    NotFound(String),
}
