//! Manual sync.

use serde::Serialize;
use tracing::info;

use lexcase_sync::{PullReport, PushReport, SyncError};

use crate::error::Result;
use crate::state::AppState;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncSummary {
    pub pushed: usize,
    pub push_failed: usize,
    pub files_uploaded: usize,
    pub files_dropped: usize,
    pub fetched: usize,
    pub added: usize,
}

impl SyncSummary {
    fn new(push: &PushReport, pull: &PullReport) -> Self {
        Self {
            pushed: push.cases_pushed,
            push_failed: push.cases_failed,
            files_uploaded: push.files_uploaded,
            files_dropped: push.files_dropped,
            fetched: pull.fetched,
            added: pull.added,
        }
    }
}

/// Push local changes, then pull what other devices wrote.
pub async fn sync_now(state: &AppState) -> Result<SyncSummary> {
    let Some(account) = state.current_account() else {
        return Err(SyncError::NotSignedIn.into());
    };

    let push = state.engine.sync_to_cloud().await?;
    let pull = state.engine.sync_from_cloud().await?;
    state.refresh()?;

    let summary = SyncSummary::new(&push, &pull);
    info!(account = %account, ?summary, "sync finished");
    Ok(summary)
}

/// Pull only. Local-only cases are kept.
pub async fn pull_now(state: &AppState) -> Result<PullReport> {
    if state.current_account().is_none() {
        return Err(SyncError::NotSignedIn.into());
    }
    let report = state.engine.sync_from_cloud().await?;
    state.refresh()?;
    Ok(report)
}
