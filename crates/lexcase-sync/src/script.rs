//! Client for the spreadsheet script backend.
//!
//! Every call is a JSON `POST` to one script URL; the body shape selects
//! the operation:
//!
//! | operation | body |
//! |---|---|
//! | login  | `{email, password}` |
//! | signup | `{email, password, displayName}` |
//! | list   | `{ownerEmail, getCases: true}` |
//! | add    | `{caseData, ownerEmail, action: "add"}` |
//! | update | `{caseId, updatedData, ownerEmail, action: "update"}` |
//! | delete | `{caseId, ownerEmail, action: "delete"}` |
//!
//! Mutations answer `{success, message}`; listing answers a bare array of
//! cases. The script keeps sessions by email only, so the signed-in account
//! lives in a local `watch` channel.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use lexcase_shared::case::parse_date;
use lexcase_shared::{Account, Attachment, CaseId, CaseRecord};

use crate::error::{Result, SyncError};
use crate::remote::{IdentityProvider, RemoteDirectory};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Generic acknowledgement returned by login, signup and mutations.
#[derive(Debug, Clone, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

impl Ack {
    fn into_result(self, what: &str) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(SyncError::Rejected(
                self.message.unwrap_or_else(|| format!("{what} failed")),
            ))
        }
    }
}

/// A case as the spreadsheet stores it. Cells can come back as numbers
/// (phone numbers, numeric ids) or dates with a time part, so every field
/// is read leniently.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireCase {
    #[serde(default, deserialize_with = "cell_text")]
    pub id: String,
    #[serde(default, deserialize_with = "cell_text")]
    pub case_number: String,
    #[serde(default, deserialize_with = "cell_text")]
    pub case_title: String,
    #[serde(default, deserialize_with = "cell_text")]
    pub client_name: String,
    #[serde(default, deserialize_with = "cell_text")]
    pub mobile: String,
    #[serde(default, deserialize_with = "cell_text")]
    pub email: String,
    #[serde(default, deserialize_with = "cell_text")]
    pub court_number: String,
    #[serde(default, deserialize_with = "cell_text")]
    pub judge_name: String,
    #[serde(default, deserialize_with = "cell_text")]
    pub current_hearing: String,
    #[serde(default, deserialize_with = "cell_text")]
    pub next_hearing: String,
    #[serde(default, deserialize_with = "cell_text")]
    pub purpose: String,
    /// JSON-encoded `[{name, url}]`, or empty.
    #[serde(default, deserialize_with = "cell_text")]
    pub files: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct WireFile {
    name: String,
    url: String,
}

fn cell_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

fn optional_date(value: &str) -> Result<Option<chrono::NaiveDate>> {
    if value.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(parse_date(value)?))
    }
}

impl WireCase {
    /// Only relayed attachments are sent; the script cannot hold inline
    /// bytes.
    pub fn from_record(record: &CaseRecord) -> Result<Self> {
        let files: Vec<WireFile> = record
            .files
            .iter()
            .filter_map(|f| match f {
                Attachment::Relayed { name, url } => Some(WireFile {
                    name: name.clone(),
                    url: url.clone(),
                }),
                Attachment::Pending { .. } => None,
            })
            .collect();

        Ok(Self {
            id: record.id.to_string(),
            case_number: record.case_number.clone(),
            case_title: record.case_title.clone(),
            client_name: record.client_name.clone(),
            mobile: record.contact.clone(),
            email: record.client_email.clone(),
            court_number: record.court_number.clone(),
            judge_name: record.judge_name.clone(),
            current_hearing: record.current_date.map(|d| d.to_string()).unwrap_or_default(),
            next_hearing: record.next_date.map(|d| d.to_string()).unwrap_or_default(),
            purpose: record.remarks.clone(),
            files: if files.is_empty() {
                String::new()
            } else {
                serde_json::to_string(&files)?
            },
        })
    }

    pub fn into_record(self) -> Result<CaseRecord> {
        if self.id.trim().is_empty() {
            return Err(SyncError::Decode("case without id".into()));
        }

        let files = if self.files.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str::<Vec<WireFile>>(&self.files)?
                .into_iter()
                .map(|f| Attachment::relayed(f.name, f.url))
                .collect()
        };

        Ok(CaseRecord {
            current_date: optional_date(&self.current_hearing)?,
            next_date: optional_date(&self.next_hearing)?,
            id: CaseId(self.id),
            case_number: self.case_number,
            case_title: self.case_title,
            client_name: self.client_name,
            contact: self.mobile,
            client_email: self.email,
            court_number: self.court_number,
            judge_name: self.judge_name,
            remarks: self.purpose,
            files,
        })
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct ScriptBackend {
    client: reqwest::Client,
    url: String,
    current: watch::Sender<Option<Account>>,
}

impl ScriptBackend {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let (current, _) = watch::channel(None);
        Ok(Self {
            client,
            url: url.into(),
            current,
        })
    }

    async fn post(&self, body: &Value) -> Result<Value> {
        let resp = self
            .client
            .post(&self.url)
            .json(body)
            .send()
            .await?
            .error_for_status()?;

        Ok(resp.json().await?)
    }

    async fn post_ack(&self, body: &Value, what: &str) -> Result<Ack> {
        let value = self.post(body).await?;
        let ack: Ack = serde_json::from_value(value)
            .map_err(|e| SyncError::Decode(format!("{what} response: {e}")))?;
        ack.into_result(what)
    }
}

#[async_trait]
impl IdentityProvider for ScriptBackend {
    /// The script only registers the account; the caller still has to log in.
    async fn sign_up(&self, name: &str, email: &str, password: &str) -> Result<Account> {
        self.post_ack(
            &json!({ "email": email, "password": password, "displayName": name }),
            "signup",
        )
        .await?;

        info!(email, "account registered");
        Ok(Account {
            display_name: Some(name.to_string()),
            ..Account::new(email)
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Account> {
        let ack = self
            .post_ack(&json!({ "email": email, "password": password }), "login")
            .await?;

        let account = Account {
            email: ack.email.unwrap_or_else(|| email.to_string()),
            display_name: None,
            token: ack.token,
        };
        info!(email = %account.email, "signed in");
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

#[async_trait]
impl RemoteDirectory for ScriptBackend {
    async fn list_cases(&self, account: &Account) -> Result<Vec<CaseRecord>> {
        let value = self
            .post(&json!({ "ownerEmail": account.email, "getCases": true }))
            .await?;
        decode_listing(value)
    }

    /// The script's `update` merges the sent fields into the stored row, so
    /// `merge` is always honoured. When the script answers that the row does
    /// not exist, it is created with `add`; any other refusal is returned.
    async fn upsert_case(
        &self,
        account: &Account,
        id: &CaseId,
        record: &CaseRecord,
        _merge: bool,
    ) -> Result<()> {
        let wire = WireCase::from_record(record)?;

        let update = json!({
            "caseId": id.as_str(),
            "updatedData": wire,
            "ownerEmail": account.email,
            "action": "update",
        });
        match self.post_ack(&update, "update").await {
            Ok(_) => return Ok(()),
            Err(SyncError::Rejected(reason)) if is_missing_row(&reason) => {
                debug!(id = %id, reason = %reason, "case unknown to the script, adding it");
            }
            Err(e) => {
                warn!(id = %id, error = %e, "update refused");
                return Err(e);
            }
        }

        let add = json!({
            "caseData": wire,
            "ownerEmail": account.email,
            "action": "add",
        });
        self.post_ack(&add, "add").await?;
        Ok(())
    }

    async fn delete_case(&self, account: &Account, id: &CaseId) -> Result<()> {
        self.post_ack(
            &json!({ "caseId": id.as_str(), "ownerEmail": account.email, "action": "delete" }),
            "delete",
        )
        .await?;
        Ok(())
    }
}

/// Whether an update refusal means the row does not exist yet.
fn is_missing_row(reason: &str) -> bool {
    let reason = reason.to_ascii_lowercase();
    ["not found", "no such", "does not exist", "doesn't exist"]
        .iter()
        .any(|marker| reason.contains(marker))
}

/// Decode a listing response; rows that fail to decode are logged and
/// skipped.
pub fn decode_listing(value: Value) -> Result<Vec<CaseRecord>> {
    let rows = match value {
        Value::Array(rows) => rows,
        other => {
            let ack: Ack = serde_json::from_value(other)
                .map_err(|e| SyncError::Decode(format!("listing response: {e}")))?;
            return Err(SyncError::Rejected(
                ack.message.unwrap_or_else(|| "listing failed".into()),
            ));
        }
    };

    let mut records = Vec::with_capacity(rows.len());
    for (index, row) in rows.into_iter().enumerate() {
        let decoded = serde_json::from_value::<WireCase>(row)
            .map_err(SyncError::from)
            .and_then(WireCase::into_record);
        match decoded {
            Ok(record) => records.push(record),
            Err(e) => warn!(index, error = %e, "skipping malformed remote case"),
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use lexcase_shared::DataUrl;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn spreadsheet_cells_are_read_leniently() {
        let rows = json!([{
            "id": 12,
            "case_number": "WP 101/2024",
            "case_title": "Kumar v. State",
            "client_name": "S. Kumar",
            "mobile": 9876543210u64,
            "email": null,
            "court_number": 4,
            "judge_name": "Justice Rao",
            "current_hearing": "2024-06-03T18:30:00.000Z",
            "next_hearing": "",
            "purpose": "evidence",
            "files": ""
        }]);

        let records = decode_listing(rows).unwrap();
        assert_eq!(records.len(), 1);
        let case = &records[0];
        assert_eq!(case.id, CaseId::from("12"));
        assert_eq!(case.contact, "9876543210");
        assert_eq!(case.client_email, "");
        assert_eq!(case.court_number, "4");
        assert_eq!(case.remarks, "evidence");
        assert_eq!(case.current_date, Some(date("2024-06-03")));
        assert_eq!(case.next_date, None);
        assert!(case.files.is_empty());
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let rows = json!([
            { "id": "a", "current_hearing": "not a date" },
            { "case_title": "no id" },
            { "id": "b", "files": "[{\"name\":\"x.pdf\",\"url\":\"https://f/x\"}]" }
        ]);

        let records = decode_listing(rows).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].files, vec![Attachment::relayed("x.pdf", "https://f/x")]);
    }

    #[test]
    fn non_array_listing_is_a_rejection() {
        let err = decode_listing(json!({ "success": false, "message": "unknown owner" })).unwrap_err();
        assert!(matches!(err, SyncError::Rejected(m) if m == "unknown owner"));
    }

    #[test]
    fn outgoing_case_uses_spreadsheet_columns() {
        let record = CaseRecord {
            case_title: "Kumar v. State".into(),
            contact: "98765".into(),
            client_email: "kumar@example.com".into(),
            remarks: "arguments".into(),
            current_date: Some(date("2024-06-03")),
            next_date: Some(date("2024-07-03")),
            files: vec![
                Attachment::relayed("a.pdf", "https://f/a"),
                Attachment::pending("b.pdf", DataUrl::from_bytes("application/pdf", b"b")),
            ],
            ..CaseRecord::new(CaseId::from("c1"))
        };

        let wire = serde_json::to_value(WireCase::from_record(&record).unwrap()).unwrap();
        assert_eq!(wire["id"], "c1");
        assert_eq!(wire["mobile"], "98765");
        assert_eq!(wire["email"], "kumar@example.com");
        assert_eq!(wire["purpose"], "arguments");
        assert_eq!(wire["current_hearing"], "2024-06-03");
        assert_eq!(wire["next_hearing"], "2024-07-03");
        assert_eq!(wire["files"], r#"[{"name":"a.pdf","url":"https://f/a"}]"#);
    }

    #[test]
    fn wire_conversion_keeps_relayed_cases_intact() {
        let record = CaseRecord {
            case_number: "OS 7/2023".into(),
            judge_name: "Justice Menon".into(),
            current_date: Some(date("2024-01-10")),
            files: vec![Attachment::relayed("plaint.pdf", "https://f/plaint")],
            ..CaseRecord::new(CaseId::from("x9"))
        };
        let back = WireCase::from_record(&record).unwrap().into_record().unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn failed_ack_carries_the_backend_message() {
        let ack = Ack {
            success: false,
            message: Some("Invalid password".into()),
            email: None,
            token: None,
        };
        let err = ack.into_result("login").unwrap_err();
        assert_eq!(err.to_string(), "Rejected by backend: Invalid password");
    }

    #[test]
    fn only_missing_rows_fall_back_to_add() {
        assert!(is_missing_row("Case not found"));
        assert!(is_missing_row("No such case: c1"));
        assert!(!is_missing_row("Not authorized for this case"));
        assert!(!is_missing_row("update failed"));
    }

    fn backend_for(server: &MockServer) -> ScriptBackend {
        ScriptBackend::new(format!("{}/exec", server.uri()), Duration::from_secs(5)).unwrap()
    }

    fn update_call() -> wiremock::MockBuilder {
        Mock::given(method("POST"))
            .and(path("/exec"))
            .and(body_partial_json(json!({ "action": "update", "caseId": "c1" })))
    }

    fn add_call() -> wiremock::MockBuilder {
        Mock::given(method("POST"))
            .and(path("/exec"))
            .and(body_partial_json(json!({ "action": "add" })))
    }

    #[tokio::test]
    async fn upsert_of_unknown_case_adds_it_with_its_id() {
        let server = MockServer::start().await;
        update_call()
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "success": false, "message": "Case not found" })),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/exec"))
            .and(body_partial_json(json!({
                "action": "add",
                "ownerEmail": "advocate@example.com",
                "caseData": { "id": "c1", "case_title": "Kumar v. State" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let record = CaseRecord {
            case_title: "Kumar v. State".into(),
            ..CaseRecord::new(CaseId::from("c1"))
        };
        backend
            .upsert_case(&Account::new("advocate@example.com"), &record.id, &record, true)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn upsert_of_known_case_only_updates() {
        let server = MockServer::start().await;
        update_call()
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .expect(1)
            .mount(&server)
            .await;
        add_call()
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .expect(0)
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let record = CaseRecord::new(CaseId::from("c1"));
        backend
            .upsert_case(&Account::new("advocate@example.com"), &record.id, &record, true)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn http_errors_and_other_refusals_do_not_add() {
        let server = MockServer::start().await;
        add_call()
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .expect(0)
            .mount(&server)
            .await;
        let backend = backend_for(&server);
        let account = Account::new("advocate@example.com");
        let record = CaseRecord::new(CaseId::from("c1"));

        let refused = update_call()
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "success": false, "message": "Not your case" })),
            )
            .mount_as_scoped(&server)
            .await;
        let err = backend.upsert_case(&account, &record.id, &record, true).await.unwrap_err();
        assert!(matches!(err, SyncError::Rejected(m) if m == "Not your case"));
        drop(refused);

        let _failing = update_call()
            .respond_with(ResponseTemplate::new(500))
            .mount_as_scoped(&server)
            .await;
        let err = backend.upsert_case(&account, &record.id, &record, true).await.unwrap_err();
        assert!(matches!(err, SyncError::Http(_)));
    }

    #[tokio::test]
    async fn sign_out_and_resume_drive_the_account_channel() {
        let backend = ScriptBackend::new("http://127.0.0.1:9/exec", Duration::from_secs(1)).unwrap();
        let mut rx = backend.subscribe();
        assert!(backend.current_account().is_none());

        backend.resume(Account::new("advocate@example.com"));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().as_ref().unwrap().email, "advocate@example.com");

        backend.sign_out().await.unwrap();
        assert!(backend.current_account().is_none());
    }
}
