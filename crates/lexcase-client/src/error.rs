use thiserror::Error;

use lexcase_shared::{CaseId, SharedError};
use lexcase_store::StoreError;
use lexcase_sync::SyncError;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Shared(#[from] SharedError),

    #[error("Case not found: {0}")]
    NotFound(CaseId),

    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("Lock poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;
