//! The case record and its partial-update form.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::attachment::Attachment;
use crate::error::SharedError;
use crate::types::CaseId;

/// A lawyer's case as kept on the device and in the remote directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaseRecord {
    pub id: CaseId,
    #[serde(default)]
    pub case_number: String,
    #[serde(default)]
    pub case_title: String,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub client_email: String,
    #[serde(default)]
    pub court_number: String,
    #[serde(default)]
    pub judge_name: String,
    #[serde(default)]
    pub remarks: String,
    /// Next (most imminent) hearing.
    #[serde(default)]
    pub current_date: Option<NaiveDate>,
    /// Hearing after `current_date`.
    #[serde(default)]
    pub next_date: Option<NaiveDate>,
    #[serde(default)]
    pub files: Vec<Attachment>,
}

impl CaseRecord {
    /// Empty record with the given id.
    pub fn new(id: CaseId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Shallow-merge `patch` over this record. The id is never changed.
    pub fn apply(&mut self, patch: &CasePatch) {
        fn set(slot: &mut String, value: &Option<String>) {
            if let Some(v) = value {
                slot.clone_from(v);
            }
        }

        set(&mut self.case_number, &patch.case_number);
        set(&mut self.case_title, &patch.case_title);
        set(&mut self.client_name, &patch.client_name);
        set(&mut self.contact, &patch.contact);
        set(&mut self.client_email, &patch.client_email);
        set(&mut self.court_number, &patch.court_number);
        set(&mut self.judge_name, &patch.judge_name);
        set(&mut self.remarks, &patch.remarks);

        if let Some(date) = patch.current_date {
            self.current_date = date;
        }
        if let Some(date) = patch.next_date {
            self.next_date = date;
        }
        if let Some(files) = &patch.files {
            self.files.clone_from(files);
        }
    }

    /// `next_date` must not precede `current_date`.
    pub fn validate_dates(&self) -> Result<(), SharedError> {
        match (self.current_date, self.next_date) {
            (Some(current), Some(next)) if next < current => Err(SharedError::Validation(format!(
                "next hearing {next} is before current hearing {current}"
            ))),
            _ => Ok(()),
        }
    }

    pub fn pending_files(&self) -> usize {
        self.files.iter().filter(|f| f.is_pending()).count()
    }
}

/// Partial update of a [`CaseRecord`]. `None` leaves a field unchanged.
///
/// The date fields are doubly optional: `Some(None)` clears the date,
/// `None` keeps it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CasePatch {
    pub id: CaseId,
    pub case_number: Option<String>,
    pub case_title: Option<String>,
    pub client_name: Option<String>,
    pub contact: Option<String>,
    pub client_email: Option<String>,
    pub court_number: Option<String>,
    pub judge_name: Option<String>,
    pub remarks: Option<String>,
    pub current_date: Option<Option<NaiveDate>>,
    pub next_date: Option<Option<NaiveDate>>,
    pub files: Option<Vec<Attachment>>,
}

impl CasePatch {
    pub fn new(id: CaseId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Patch touching only the hearing dates.
    pub fn hearing(id: CaseId, current: NaiveDate, next: NaiveDate) -> Self {
        Self {
            id,
            current_date: Some(Some(current)),
            next_date: Some(Some(next)),
            ..Default::default()
        }
    }

    /// Patch touching only the attachment list.
    pub fn files(id: CaseId, files: Vec<Attachment>) -> Self {
        Self {
            id,
            files: Some(files),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::new(self.id.clone())
    }
}

/// Parse an ISO calendar date (`YYYY-MM-DD`). A time part, if present, is
/// ignored.
pub fn parse_date(value: &str) -> Result<NaiveDate, SharedError> {
    let day = value.trim().split(['T', ' ']).next().unwrap_or_default();
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|source| SharedError::InvalidDate {
        value: value.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn sample() -> CaseRecord {
        CaseRecord {
            case_title: "State v. Rao".into(),
            client_name: "R. Rao".into(),
            remarks: "bail hearing".into(),
            current_date: Some(date("2024-03-01")),
            next_date: Some(date("2024-03-31")),
            ..CaseRecord::new(CaseId::from("7"))
        }
    }

    #[test]
    fn apply_only_overwrites_present_fields() {
        let mut record = sample();
        let mut patch = CasePatch::new(CaseId::from("ignored"));
        patch.remarks = Some("arguments".into());

        record.apply(&patch);

        assert_eq!(record.id, CaseId::from("7"));
        assert_eq!(record.remarks, "arguments");
        assert_eq!(record.case_title, "State v. Rao");
        assert_eq!(record.current_date, Some(date("2024-03-01")));
    }

    #[test]
    fn apply_can_clear_a_date() {
        let mut record = sample();
        let mut patch = CasePatch::new(record.id.clone());
        patch.next_date = Some(None);

        record.apply(&patch);
        assert_eq!(record.next_date, None);
        assert_eq!(record.current_date, Some(date("2024-03-01")));
    }

    #[test]
    fn validate_dates_rejects_next_before_current() {
        let mut record = sample();
        assert!(record.validate_dates().is_ok());
        record.next_date = Some(date("2024-02-01"));
        assert!(record.validate_dates().is_err());
        record.current_date = None;
        assert!(record.validate_dates().is_ok());
    }

    #[test]
    fn parse_date_ignores_time_of_day() {
        assert_eq!(date("2024-06-01T15:30:00Z"), date("2024-06-01"));
        assert!(parse_date("01/06/2024").is_err());
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(CasePatch::new(CaseId::from("1")).is_empty());
        let patch = CasePatch::hearing(CaseId::from("1"), date("2024-01-01"), date("2024-01-31"));
        assert!(!patch.is_empty());
    }

    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let record: CaseRecord = serde_json::from_str(r#"{"id":"x1","case_title":"T"}"#).unwrap();
        assert_eq!(record.case_title, "T");
        assert!(record.files.is_empty());
        assert_eq!(record.current_date, None);
    }
}
