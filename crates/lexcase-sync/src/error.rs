use thiserror::Error;

use lexcase_shared::SharedError;
use lexcase_store::StoreError;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Local store error: {0}")]
    Store(#[from] StoreError),

    #[error("Lock poisoned")]
    LockPoisoned,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rejected by backend: {0}")]
    Rejected(String),

    #[error("File relay error: {0}")]
    Relay(String),

    #[error("Malformed backend response: {0}")]
    Decode(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not signed in")]
    NotSignedIn,

    #[error(transparent)]
    Shared(#[from] SharedError),
}

pub type Result<T> = std::result::Result<T, SyncError>;
