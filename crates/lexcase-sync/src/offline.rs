//! Backend used when no remote endpoint is configured.
//!
//! Nobody can sign in, so pull and push are always no-ops and the app works
//! purely on the local table.

use async_trait::async_trait;
use tokio::sync::watch;

use lexcase_shared::{Account, CaseId, CaseRecord};

use crate::error::{Result, SyncError};
use crate::remote::{IdentityProvider, RemoteDirectory};

pub struct OfflineBackend {
    current: watch::Sender<Option<Account>>,
}

impl OfflineBackend {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self { current }
    }
}

impl Default for OfflineBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn unconfigured() -> SyncError {
    SyncError::Rejected("no backend configured (set LEXCASE_API_URL)".into())
}

#[async_trait]
impl IdentityProvider for OfflineBackend {
    async fn sign_up(&self, _name: &str, _email: &str, _password: &str) -> Result<Account> {
        Err(unconfigured())
    }

    async fn sign_in(&self, _email: &str, _password: &str) -> Result<Account> {
        Err(unconfigured())
    }

    async fn sign_out(&self) -> Result<()> {
        Ok(())
    }

    // A remembered session is meaningless without a backend.
    fn resume(&self, account: Account) {
        tracing::debug!(email = %account.email, "ignoring saved session while offline");
    }

    fn current_account(&self) -> Option<Account> {
        self.current.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Account>> {
        self.current.subscribe()
    }
}

#[async_trait]
impl RemoteDirectory for OfflineBackend {
    async fn list_cases(&self, _account: &Account) -> Result<Vec<CaseRecord>> {
        Err(SyncError::NotSignedIn)
    }

    async fn upsert_case(&self, _: &Account, _: &CaseId, _: &CaseRecord, _: bool) -> Result<()> {
        Err(SyncError::NotSignedIn)
    }

    async fn delete_case(&self, _account: &Account, _id: &CaseId) -> Result<()> {
        Err(SyncError::NotSignedIn)
    }
}
