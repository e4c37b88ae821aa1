//! Case commands: create, edit, delete, read and attach files.
//!
//! Every mutation refreshes the case snapshot and, when someone is signed
//! in, pushes to the remote directory afterwards. A failed push is logged
//! and does not fail the command; the change stays local until the next
//! push.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use lexcase_shared::constants::{DEFAULT_MIME, MAX_ATTACHMENT_SIZE};
use lexcase_shared::hearing::default_next_date;
use lexcase_shared::{Attachment, CaseId, CasePatch, CaseRecord, DataUrl};

use crate::error::{ClientError, Result};
use crate::state::AppState;

/// Input for a new case. Blank fields are stored as empty strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseForm {
    pub case_number: String,
    pub case_title: String,
    pub client_name: String,
    pub contact: String,
    pub client_email: String,
    pub court_number: String,
    pub judge_name: String,
    pub remarks: String,
    pub current_date: Option<NaiveDate>,
    /// Defaults to the current hearing plus the cadence.
    pub next_date: Option<NaiveDate>,
    pub files: Vec<Attachment>,
}

impl CaseForm {
    fn into_record(self) -> CaseRecord {
        let next_date = self
            .next_date
            .or_else(|| self.current_date.map(default_next_date));
        CaseRecord {
            case_number: self.case_number.trim().to_string(),
            case_title: self.case_title.trim().to_string(),
            client_name: self.client_name.trim().to_string(),
            contact: self.contact.trim().to_string(),
            client_email: self.client_email.trim().to_string(),
            court_number: self.court_number.trim().to_string(),
            judge_name: self.judge_name.trim().to_string(),
            remarks: self.remarks.trim().to_string(),
            current_date: self.current_date,
            next_date,
            files: self.files,
            ..Default::default()
        }
    }
}

pub async fn add_case(state: &AppState, form: CaseForm) -> Result<CaseRecord> {
    let record = form.into_record();
    record.validate_dates()?;

    let id = state.with_db(|db| db.add_case(&record))?;
    info!(id = %id, title = %record.case_title, "case added");

    after_mutation(state).await?;
    get_case(state, &id)
}

/// Shallow-merge `patch` into an existing case.
///
/// A patch that moves the current hearing without naming the next one gets
/// the next hearing from the cadence, as does a case left with a current
/// hearing and no next one.
pub async fn update_case(state: &AppState, mut patch: CasePatch) -> Result<CaseRecord> {
    if let (Some(Some(current)), None) = (patch.current_date, patch.next_date) {
        patch.next_date = Some(Some(default_next_date(current)));
    }

    let mut merged = get_case(state, &patch.id)?;
    merged.apply(&patch);
    if let (Some(current), None) = (merged.current_date, merged.next_date) {
        let next = default_next_date(current);
        patch.next_date = Some(Some(next));
        merged.next_date = Some(next);
    }
    merged.validate_dates()?;

    let stored = state.with_db(|db| db.put_case(&patch))?;
    info!(id = %stored.id, "case updated");

    after_mutation(state).await?;
    get_case(state, &stored.id)
}

/// Delete a case locally and, when signed in, from the remote directory.
pub async fn delete_case(state: &AppState, id: &CaseId) -> Result<()> {
    if !state.with_db(|db| db.delete_case(id))? {
        return Err(ClientError::NotFound(id.clone()));
    }
    info!(id = %id, "case deleted");

    if let Err(e) = state.engine.delete_remote(id).await {
        warn!(id = %id, error = %e, "failed to delete remote copy");
    }
    state.refresh()?;
    Ok(())
}

pub fn get_case(state: &AppState, id: &CaseId) -> Result<CaseRecord> {
    state
        .with_db(|db| db.get_case(id))?
        .ok_or_else(|| ClientError::NotFound(id.clone()))
}

/// Cases from the snapshot, soonest hearing first; undated cases last.
pub fn list_cases(state: &AppState) -> Vec<CaseRecord> {
    let mut cases = state.cases();
    cases.sort_by(|a, b| match (a.current_date, b.current_date) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.id.cmp(&b.id)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.id.cmp(&b.id),
    });
    cases
}

/// Read files from disk and add them to a case as pending attachments.
/// They are relayed on the next push.
pub async fn attach_files(state: &AppState, id: &CaseId, paths: &[&Path]) -> Result<CaseRecord> {
    let mut files = get_case(state, id)?.files;

    for path in paths {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ClientError::Invalid(format!("not a file: {}", path.display())))?
            .to_string();

        let bytes = tokio::fs::read(path).await?;
        if bytes.len() > MAX_ATTACHMENT_SIZE {
            return Err(ClientError::Invalid(format!(
                "{name} is too large: {} bytes (max {MAX_ATTACHMENT_SIZE})",
                bytes.len()
            )));
        }

        let data = DataUrl::from_bytes(mime_for(path), &bytes);
        files.retain(|f| f.name() != name);
        files.push(Attachment::pending(name, data));
    }

    let stored = state.with_db(|db| db.put_case(&CasePatch::files(id.clone(), files)))?;
    info!(id = %id, count = paths.len(), "files attached");

    after_mutation(state).await?;
    get_case(state, &stored.id)
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("txt") => "text/plain",
        Some("doc") => "application/msword",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => DEFAULT_MIME,
    }
}

async fn after_mutation(state: &AppState) -> Result<()> {
    state.refresh()?;
    if state.current_account().is_none() {
        return Ok(());
    }

    match state.engine.sync_to_cloud().await {
        Ok(report) if report.cases_failed > 0 || report.files_dropped > 0 => {
            warn!(
                failed = report.cases_failed,
                dropped = report.files_dropped,
                "push after edit was incomplete"
            );
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e, "push after edit failed"),
    }
    // Relayed attachments were written back during the push.
    state.refresh()?;
    Ok(())
}
