//! Application state shared by every command.
//!
//! The [`AppState`] owns the local store, the sync engine and a snapshot of
//! the case table. Every command that changes cases finishes with
//! [`AppState::refresh`], so readers of the snapshot never see stale data
//! after a mutation returns.

use std::sync::{Arc, Mutex, RwLock};

use lexcase_shared::{Account, CaseRecord};
use lexcase_store::Database;
use lexcase_sync::{FileRelay, IdentityProvider, RemoteDirectory, SharedDatabase, SyncEngine};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

pub struct AppState {
    pub config: ClientConfig,

    /// Handle to the local case database, shared with the engine.
    pub database: SharedDatabase,

    /// Pull, push and hearing advance.
    pub engine: Arc<SyncEngine>,

    /// Case table as of the last refresh.
    cases: RwLock<Vec<CaseRecord>>,

    /// Account the last auth change was handled for, so repeated
    /// notifications for the same account do not pull again.
    last_account: Mutex<Option<String>>,
}

impl AppState {
    pub fn new(
        config: ClientConfig,
        database: Database,
        identity: Arc<dyn IdentityProvider>,
        remote: Arc<dyn RemoteDirectory>,
        relay: Arc<dyn FileRelay>,
    ) -> Self {
        let database: SharedDatabase = Arc::new(Mutex::new(database));
        let engine = SyncEngine::new(database.clone(), identity, remote, relay);
        Self {
            config,
            database,
            engine: Arc::new(engine),
            cases: RwLock::new(Vec::new()),
            last_account: Mutex::new(None),
        }
    }

    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        self.engine.identity()
    }

    pub fn current_account(&self) -> Option<Account> {
        self.identity().current_account()
    }

    /// Run `f` against the local store.
    pub fn with_db<T>(&self, f: impl FnOnce(&Database) -> lexcase_store::Result<T>) -> Result<T> {
        let db = self.database.lock().map_err(|_| ClientError::LockPoisoned)?;
        Ok(f(&*db)?)
    }

    /// Reload the case snapshot from the local store.
    pub fn refresh(&self) -> Result<usize> {
        let records = self.with_db(|db| db.list_cases())?;
        let count = records.len();
        *self.cases.write().map_err(|_| ClientError::LockPoisoned)? = records;
        tracing::debug!(count, "case snapshot refreshed");
        Ok(count)
    }

    /// Snapshot of the case table as of the last refresh.
    pub fn cases(&self) -> Vec<CaseRecord> {
        self.cases.read().map(|c| c.clone()).unwrap_or_default()
    }

    /// Record `account` as the one auth changes were last handled for.
    /// Returns `false` when it was already recorded.
    pub(crate) fn note_account(&self, account: Option<&Account>) -> Result<bool> {
        let mut last = self
            .last_account
            .lock()
            .map_err(|_| ClientError::LockPoisoned)?;
        let email = account.map(|a| a.email.clone());
        if *last == email {
            return Ok(false);
        }
        *last = email;
        Ok(true)
    }
}
