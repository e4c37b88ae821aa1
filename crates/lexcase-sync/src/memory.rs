//! In-memory stand-ins for the external services, for tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;

use lexcase_shared::{Account, CaseId, CaseRecord, DataUrl};

use crate::error::{Result, SyncError};
use crate::remote::{FileRelay, IdentityProvider, RelayPath, RemoteDirectory};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Password check against a local user table. Sign-up signs the new
/// account in.
pub struct MemoryIdentity {
    users: Mutex<HashMap<String, (String, String)>>,
    current: watch::Sender<Option<Account>>,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            users: Mutex::new(HashMap::new()),
            current,
        }
    }

    /// Provider with `email` already signed in.
    pub fn signed_in(email: &str) -> Self {
        let identity = Self::new();
        identity.current.send_replace(Some(Account::new(email)));
        identity
    }
}

impl Default for MemoryIdentity {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn sign_up(&self, name: &str, email: &str, password: &str) -> Result<Account> {
        {
            let mut users = self.users.lock().map_err(|_| SyncError::LockPoisoned)?;
            if users.contains_key(email) {
                return Err(SyncError::Rejected(format!("{email} is already registered")));
            }
            users.insert(email.to_string(), (password.to_string(), name.to_string()));
        }
        let account = Account {
            display_name: Some(name.to_string()),
            ..Account::new(email)
        };
        self.current.send_replace(Some(account.clone()));
        Ok(account)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Account> {
        let name = {
            let users = self.users.lock().map_err(|_| SyncError::LockPoisoned)?;
            match users.get(email) {
                Some((stored, name)) if stored == password => name.clone(),
                _ => return Err(SyncError::Rejected("invalid email or password".into())),
            }
        };
        let account = Account {
            display_name: Some(name),
            ..Account::new(email)
        };
        self.current.send_replace(Some(account.clone()));
        Ok(account)
    }

    async fn sign_out(&self) -> Result<()> {
        self.current.send_replace(None);
        Ok(())
    }

    fn resume(&self, account: Account) {
        self.current.send_replace(Some(account));
    }

    fn current_account(&self) -> Option<Account> {
        self.current.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Account>> {
        self.current.subscribe()
    }
}

// ---------------------------------------------------------------------------
// Remote directory
// ---------------------------------------------------------------------------

/// Documents kept as JSON objects so merge writes behave like a document
/// store: keys the writer does not send survive.
#[derive(Default)]
pub struct MemoryDirectory {
    docs: Mutex<HashMap<String, BTreeMap<CaseId, Value>>>,
    failing: Mutex<HashSet<CaseId>>,
    list_calls: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, account: &str, record: &CaseRecord) {
        let doc = serde_json::to_value(record).unwrap_or(Value::Null);
        self.insert_raw(account, record.id.clone(), doc);
    }

    pub fn insert_raw(&self, account: &str, id: CaseId, doc: Value) {
        if let Ok(mut docs) = self.docs.lock() {
            docs.entry(account.to_string()).or_default().insert(id, doc);
        }
    }

    pub fn raw(&self, account: &str, id: &CaseId) -> Option<Value> {
        let docs = self.docs.lock().ok()?;
        docs.get(account)?.get(id).cloned()
    }

    pub fn get(&self, account: &str, id: &CaseId) -> Option<CaseRecord> {
        serde_json::from_value(self.raw(account, id)?).ok()
    }

    pub fn len(&self, account: &str) -> usize {
        self.docs
            .lock()
            .map(|docs| docs.get(account).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, account: &str) -> bool {
        self.len(account) == 0
    }

    /// Make every write of `id` fail.
    pub fn fail_writes_for(&self, id: &CaseId) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(id.clone());
        }
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteDirectory for MemoryDirectory {
    async fn list_cases(&self, account: &Account) -> Result<Vec<CaseRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        // Give concurrent callers a chance to queue up behind this pass.
        tokio::task::yield_now().await;

        let docs = self.docs.lock().map_err(|_| SyncError::LockPoisoned)?;
        let Some(cases) = docs.get(&account.email) else {
            return Ok(Vec::new());
        };

        let mut records = Vec::with_capacity(cases.len());
        for (id, doc) in cases {
            match serde_json::from_value::<CaseRecord>(doc.clone()) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(id = %id, error = %e, "skipping undecodable remote case"),
            }
        }
        Ok(records)
    }

    async fn upsert_case(
        &self,
        account: &Account,
        id: &CaseId,
        record: &CaseRecord,
        merge: bool,
    ) -> Result<()> {
        if self
            .failing
            .lock()
            .map_err(|_| SyncError::LockPoisoned)?
            .contains(id)
        {
            return Err(SyncError::Rejected(format!("write of {id} refused")));
        }

        let incoming = serde_json::to_value(record)?;
        let mut docs = self.docs.lock().map_err(|_| SyncError::LockPoisoned)?;
        let slot = docs
            .entry(account.email.clone())
            .or_default()
            .entry(id.clone())
            .or_insert(Value::Null);

        if merge && slot.is_object() {
            if let (Some(existing), Value::Object(fields)) = (slot.as_object_mut(), incoming) {
                existing.extend(fields);
            }
        } else {
            *slot = incoming;
        }

        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_case(&self, account: &Account, id: &CaseId) -> Result<()> {
        let mut docs = self.docs.lock().map_err(|_| SyncError::LockPoisoned)?;
        if let Some(cases) = docs.get_mut(&account.email) {
            cases.remove(id);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// File relay
// ---------------------------------------------------------------------------

/// Records upload paths and hands out `memory://` references.
#[derive(Default)]
pub struct MemoryRelay {
    uploads: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
}

impl MemoryRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every upload of a file called `name` fail.
    pub fn fail_uploads_named(&self, name: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(name.to_string());
        }
    }

    /// Paths uploaded so far, in order.
    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().map(|u| u.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl FileRelay for MemoryRelay {
    async fn upload(&self, path: &RelayPath, data: &DataUrl) -> Result<String> {
        if self
            .failing
            .lock()
            .map_err(|_| SyncError::LockPoisoned)?
            .contains(&path.file_name)
        {
            return Err(SyncError::Relay(format!("upload of {path} failed")));
        }
        data.decode()?;

        let path = path.to_string();
        self.uploads
            .lock()
            .map_err(|_| SyncError::LockPoisoned)?
            .push(path.clone());
        Ok(format!("memory://{path}"))
    }
}
