//! Contracts of the external services the engine talks to.
//!
//! None of these services is implemented here; [`crate::script`] and
//! [`crate::relay`] are HTTP clients for concrete deployments.

use async_trait::async_trait;
use tokio::sync::watch;

use lexcase_shared::constants::RELAY_PATH_ROOT;
use lexcase_shared::{Account, CaseId, CaseRecord, DataUrl};

use crate::error::Result;

/// Account sign-up / sign-in.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register a new account. Providers differ on whether this also signs
    /// the account in; check [`IdentityProvider::current_account`] afterwards.
    async fn sign_up(&self, name: &str, email: &str, password: &str) -> Result<Account>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Account>;

    async fn sign_out(&self) -> Result<()>;

    /// Re-establish a session remembered from an earlier run.
    fn resume(&self, account: Account);

    fn current_account(&self) -> Option<Account>;

    /// Receiver that observes every sign-in / sign-out transition.
    fn subscribe(&self) -> watch::Receiver<Option<Account>>;
}

/// Per-account collection of case documents addressed by case id.
#[async_trait]
pub trait RemoteDirectory: Send + Sync {
    async fn list_cases(&self, account: &Account) -> Result<Vec<CaseRecord>>;

    /// Write `record` under `id`. With `merge` the fields are merged onto an
    /// existing document instead of replacing it.
    async fn upsert_case(
        &self,
        account: &Account,
        id: &CaseId,
        record: &CaseRecord,
        merge: bool,
    ) -> Result<()>;

    async fn delete_case(&self, account: &Account, id: &CaseId) -> Result<()>;
}

/// Blob upload service returning retrievable references.
#[async_trait]
pub trait FileRelay: Send + Sync {
    async fn upload(&self, path: &RelayPath, data: &DataUrl) -> Result<String>;
}

/// Where an attachment is stored in the relay:
/// `cases/{account}/{case_id}/{file_name}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelayPath {
    pub account: String,
    pub case_id: CaseId,
    pub file_name: String,
}

impl RelayPath {
    pub fn new(account: &Account, case_id: &CaseId, file_name: &str) -> Self {
        Self {
            account: account.email.clone(),
            case_id: case_id.clone(),
            file_name: file_name.to_string(),
        }
    }
}

impl std::fmt::Display for RelayPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{RELAY_PATH_ROOT}/{}/{}/{}",
            self.account, self.case_id, self.file_name
        )
    }
}
