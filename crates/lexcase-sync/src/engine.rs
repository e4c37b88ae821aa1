//! The sync engine.
//!
//! Three entry points touch the local case table: pull
//! ([`SyncEngine::sync_from_cloud`]), push ([`SyncEngine::sync_to_cloud`])
//! and [`SyncEngine::advance_hearings`]. They all run behind one async lock,
//! so a pull never interleaves its read-then-replace with a push or an
//! advance.
//!
//! Pull and push are single-flight: a caller that asks for a pass while the
//! same kind of pass is queued or running waits, and if a pass that started
//! after its request completes for the same account, it gets that pass's
//! report instead of running another one.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use lexcase_shared::constants::MAX_ATTACHMENT_SIZE;
use lexcase_shared::{hearing, Account, Attachment, CaseId, CasePatch, CaseRecord, DataUrl};
use lexcase_store::Database;

pub use lexcase_store::AdvanceReport;

use crate::error::{Result, SyncError};
use crate::remote::{FileRelay, IdentityProvider, RelayPath, RemoteDirectory};
use crate::SharedDatabase;

/// Outcome of a pull.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullReport {
    /// Remote records received.
    pub fetched: usize,
    /// Remote-only records now stored locally.
    pub added: usize,
    /// Local records replaced by the remote version.
    pub overwritten: usize,
    /// Local-only records kept as they were.
    pub preserved: usize,
    /// False when there was no signed-in account.
    pub ran: bool,
}

/// Outcome of a push.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushReport {
    pub cases_pushed: usize,
    pub cases_failed: usize,
    pub files_uploaded: usize,
    pub files_dropped: usize,
    /// False when there was no signed-in account.
    pub ran: bool,
}

// Last completed pass of one kind. `covered` is the highest request ticket
// issued before that pass started reading.
struct Flight<R> {
    covered: u64,
    account: Option<String>,
    report: Option<R>,
}

impl<R: Clone> Flight<R> {
    fn new() -> Self {
        Self {
            covered: 0,
            account: None,
            report: None,
        }
    }

    fn covering(&self, ticket: u64, account: &Account) -> Option<R> {
        if self.covered >= ticket && self.account.as_deref() == Some(account.email.as_str()) {
            self.report.clone()
        } else {
            None
        }
    }

    fn record(&mut self, covered: u64, account: &Account, report: R) {
        self.covered = covered;
        self.account = Some(account.email.clone());
        self.report = Some(report);
    }
}

struct Flights {
    pull: Flight<PullReport>,
    push: Flight<PushReport>,
}

pub struct SyncEngine {
    store: SharedDatabase,
    identity: Arc<dyn IdentityProvider>,
    remote: Arc<dyn RemoteDirectory>,
    relay: Arc<dyn FileRelay>,
    flights: AsyncMutex<Flights>,
    pull_tickets: AtomicU64,
    push_tickets: AtomicU64,
}

impl SyncEngine {
    pub fn new(
        store: SharedDatabase,
        identity: Arc<dyn IdentityProvider>,
        remote: Arc<dyn RemoteDirectory>,
        relay: Arc<dyn FileRelay>,
    ) -> Self {
        Self {
            store,
            identity,
            remote,
            relay,
            flights: AsyncMutex::new(Flights {
                pull: Flight::new(),
                push: Flight::new(),
            }),
            pull_tickets: AtomicU64::new(0),
            push_tickets: AtomicU64::new(0),
        }
    }

    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.identity
    }

    /// Run `f` against the local store. The lock is never held across an
    /// `.await`.
    pub fn with_store<T>(
        &self,
        f: impl FnOnce(&Database) -> lexcase_store::Result<T>,
    ) -> Result<T> {
        let db = self.store.lock().map_err(|_| SyncError::LockPoisoned)?;
        Ok(f(&*db)?)
    }

    // ------------------------------------------------------------------
    // Pull
    // ------------------------------------------------------------------

    /// Merge the remote directory into the local table. Remote records win
    /// over local ones with the same id; local-only records are kept.
    pub async fn sync_from_cloud(&self) -> Result<PullReport> {
        let Some(account) = self.identity.current_account() else {
            debug!("pull skipped: not signed in");
            return Ok(PullReport::default());
        };

        let ticket = self.pull_tickets.fetch_add(1, Ordering::SeqCst) + 1;
        let mut flights = self.flights.lock().await;
        if let Some(report) = flights.pull.covering(ticket, &account) {
            debug!(ticket, "pull satisfied by the pass that just ran");
            return Ok(report);
        }

        let covered = self.pull_tickets.load(Ordering::SeqCst);
        let report = self.pull_pass(&account).await?;
        flights.pull.record(covered, &account, report.clone());
        Ok(report)
    }

    async fn pull_pass(&self, account: &Account) -> Result<PullReport> {
        let remote = self.remote.list_cases(account).await.map_err(|e| {
            warn!(account = %account, error = %e, "pull failed to list remote cases");
            e
        })?;

        let mut report = PullReport {
            fetched: remote.len(),
            ran: true,
            ..Default::default()
        };

        // Read, merge and replace under one store lock.
        self.with_store(|db| {
            let local = db.list_cases()?;
            let local_count = local.len();
            let mut merged: BTreeMap<CaseId, CaseRecord> =
                local.into_iter().map(|c| (c.id.clone(), c)).collect();

            for mut record in remote {
                match merged.get(&record.id) {
                    Some(existing) => {
                        keep_pending_files(existing, &mut record);
                        report.overwritten += 1;
                    }
                    None => report.added += 1,
                }
                merged.insert(record.id.clone(), record);
            }
            report.preserved = local_count.saturating_sub(report.overwritten);

            let records: Vec<CaseRecord> = merged.into_values().collect();
            db.replace_all_cases(&records)
        })?;

        info!(
            account = %account,
            fetched = report.fetched,
            added = report.added,
            overwritten = report.overwritten,
            preserved = report.preserved,
            "pull complete"
        );
        Ok(report)
    }

    // ------------------------------------------------------------------
    // Push
    // ------------------------------------------------------------------

    /// Write every local case to the remote directory, relaying pending
    /// attachments first. Per-case and per-file failures are logged and
    /// skipped.
    pub async fn sync_to_cloud(&self) -> Result<PushReport> {
        let Some(account) = self.identity.current_account() else {
            debug!("push skipped: not signed in");
            return Ok(PushReport::default());
        };

        let ticket = self.push_tickets.fetch_add(1, Ordering::SeqCst) + 1;
        let mut flights = self.flights.lock().await;
        if let Some(report) = flights.push.covering(ticket, &account) {
            debug!(ticket, "push satisfied by the pass that just ran");
            return Ok(report);
        }

        let covered = self.push_tickets.load(Ordering::SeqCst);
        let report = self.push_pass(&account).await?;
        flights.push.record(covered, &account, report.clone());
        Ok(report)
    }

    async fn push_pass(&self, account: &Account) -> Result<PushReport> {
        let records = self.with_store(|db| db.list_cases())?;
        let mut report = PushReport {
            ran: true,
            ..Default::default()
        };

        for record in records {
            let relayed = self.relay_attachments(account, &record, &mut report).await;

            if !relayed.done.is_empty() {
                // Remember the references so the next push does not upload again.
                if let Err(e) = self.with_store(|db| store_relayed(db, &record.id, &relayed.done)) {
                    warn!(id = %record.id, error = %e, "failed to store relayed attachments locally");
                }
            }

            let outgoing = CaseRecord {
                files: relayed.outgoing,
                ..record
            };
            match self
                .remote
                .upsert_case(account, &outgoing.id, &outgoing, true)
                .await
            {
                Ok(()) => {
                    debug!(id = %outgoing.id, "case pushed");
                    report.cases_pushed += 1;
                }
                Err(e) => {
                    warn!(id = %outgoing.id, error = %e, "failed to push case");
                    report.cases_failed += 1;
                }
            }
        }

        info!(
            account = %account,
            pushed = report.cases_pushed,
            failed = report.cases_failed,
            uploaded = report.files_uploaded,
            dropped = report.files_dropped,
            "push complete"
        );
        Ok(report)
    }

    async fn relay_attachments(
        &self,
        account: &Account,
        record: &CaseRecord,
        report: &mut PushReport,
    ) -> Relayed {
        let mut relayed = Relayed {
            outgoing: Vec::with_capacity(record.files.len()),
            done: Vec::new(),
        };

        for attachment in &record.files {
            let Attachment::Pending { name, data } = attachment else {
                relayed.outgoing.push(attachment.clone());
                continue;
            };

            let path = RelayPath::new(account, &record.id, name);
            match self.upload(&path, data).await {
                Ok(url) => {
                    debug!(path = %path, "attachment relayed");
                    let done = Attachment::relayed(name.clone(), url);
                    relayed.outgoing.push(done.clone());
                    relayed.done.push((attachment.clone(), done));
                    report.files_uploaded += 1;
                }
                Err(e) => {
                    warn!(path = %path, error = %e, "attachment upload failed, dropping it from this push");
                    report.files_dropped += 1;
                }
            }
        }

        relayed
    }

    async fn upload(&self, path: &RelayPath, data: &DataUrl) -> Result<String> {
        let approx_size = data.as_str().len() / 4 * 3;
        if approx_size > MAX_ATTACHMENT_SIZE {
            return Err(SyncError::Relay(format!(
                "{path} is {approx_size} bytes (max {MAX_ATTACHMENT_SIZE})"
            )));
        }
        self.relay.upload(path, data).await
    }

    // ------------------------------------------------------------------
    // Hearings and deletion
    // ------------------------------------------------------------------

    /// Roll every lapsed hearing forward to `today` or later.
    pub async fn advance_hearings(&self, today: NaiveDate) -> Result<AdvanceReport> {
        let _flights = self.flights.lock().await;

        let records = self.with_store(|db| db.list_cases())?;
        let updates = hearing::advance(&records, today);
        let report = self.with_store(|db| Ok(db.apply_hearing_updates(&updates)))?;

        info!(
            today = %today,
            scanned = records.len(),
            applied = report.applied,
            failed = report.failed,
            "hearings advanced"
        );
        Ok(report)
    }

    /// Delete `id` from the remote directory. Returns `false` without doing
    /// anything when nobody is signed in.
    pub async fn delete_remote(&self, id: &CaseId) -> Result<bool> {
        let Some(account) = self.identity.current_account() else {
            return Ok(false);
        };
        let _flights = self.flights.lock().await;
        self.remote.delete_case(&account, id).await?;
        info!(account = %account, id = %id, "remote case deleted");
        Ok(true)
    }
}

struct Relayed {
    /// Attachments sent to the remote: relayed only, failures dropped.
    outgoing: Vec<Attachment>,
    /// Pending attachments that were uploaded, with their relayed form.
    done: Vec<(Attachment, Attachment)>,
}

/// Swap uploaded pending attachments for their relayed form in the case as
/// it is stored now. Anything attached or replaced since the push read the
/// case is left alone; failed uploads stay pending.
fn store_relayed(
    db: &Database,
    id: &CaseId,
    done: &[(Attachment, Attachment)],
) -> lexcase_store::Result<()> {
    let Some(current) = db.get_case(id)? else {
        return Ok(());
    };

    let files: Vec<Attachment> = current
        .files
        .into_iter()
        .map(|file| {
            done.iter()
                .find(|(pending, _)| *pending == file)
                .map_or(file, |(_, relayed)| relayed.clone())
        })
        .collect();

    db.put_case(&CasePatch::files(id.clone(), files))?;
    Ok(())
}

/// Carry local attachments that never reached the relay over to the remote
/// copy of the case, unless the remote already has a file of that name.
fn keep_pending_files(local: &CaseRecord, remote: &mut CaseRecord) {
    for file in &local.files {
        if file.is_pending() && !remote.files.iter().any(|f| f.name() == file.name()) {
            remote.files.push(file.clone());
        }
    }
}
