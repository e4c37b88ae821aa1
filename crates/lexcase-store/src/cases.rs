//! Operations on the `cases` table.

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use lexcase_shared::{Attachment, CaseId, CasePatch, CaseRecord};

use crate::database::Database;
use crate::error::Result;

const SELECT_COLUMNS: &str = "SELECT id, case_number, case_title, client_name, contact, client_email,
        court_number, judge_name, remarks, current_hearing, next_hearing, files
 FROM cases";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert `record` under a freshly generated id and return that id.
    /// Whatever id the caller put on the record is ignored.
    pub fn add_case(&self, record: &CaseRecord) -> Result<CaseId> {
        let id = CaseId::new();
        let stored = CaseRecord {
            id: id.clone(),
            ..record.clone()
        };
        upsert(self.conn(), &stored)?;
        tracing::debug!(id = %id, "case added");
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Upsert
    // ------------------------------------------------------------------

    /// Shallow-merge `patch` into the stored case with the same id, creating
    /// it if absent. Returns the record as stored.
    pub fn put_case(&self, patch: &CasePatch) -> Result<CaseRecord> {
        let tx = self.conn().unchecked_transaction()?;

        let mut record = select_one(&tx, &patch.id)?.unwrap_or_else(|| CaseRecord::new(patch.id.clone()));
        record.apply(patch);
        upsert(&tx, &record)?;

        tx.commit()?;
        Ok(record)
    }

    /// Store `record` as a whole, replacing any existing case with its id.
    pub fn put_case_record(&self, record: &CaseRecord) -> Result<()> {
        upsert(self.conn(), record)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_case(&self, id: &CaseId) -> Result<Option<CaseRecord>> {
        select_one(self.conn(), id)
    }

    /// Every stored case, in id order.
    pub fn list_cases(&self) -> Result<Vec<CaseRecord>> {
        let mut stmt = self.conn().prepare(&format!("{SELECT_COLUMNS} ORDER BY id ASC"))?;
        let rows = stmt.query_map([], row_to_case)?;

        let mut cases = Vec::new();
        for row in rows {
            cases.push(row?);
        }
        Ok(cases)
    }

    pub fn count_cases(&self) -> Result<usize> {
        let n: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM cases", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    pub fn delete_case(&self, id: &CaseId) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM cases WHERE id = ?1", params![id.as_str()])?;
        Ok(affected > 0)
    }

    /// Remove every case. Returns how many were removed.
    pub fn clear_cases(&self) -> Result<usize> {
        Ok(self.conn().execute("DELETE FROM cases", [])?)
    }

    /// Replace the whole table with `records` in one transaction.
    pub fn replace_all_cases(&self, records: &[CaseRecord]) -> Result<()> {
        let tx = self.conn().unchecked_transaction()?;
        tx.execute("DELETE FROM cases", [])?;
        for record in records {
            upsert(&tx, record)?;
        }
        tx.commit()?;

        tracing::debug!(count = records.len(), "case table replaced");
        Ok(())
    }
}

fn upsert(conn: &Connection, record: &CaseRecord) -> Result<()> {
    let files = serde_json::to_string(&record.files)?;
    conn.execute(
        "INSERT OR REPLACE INTO cases (id, case_number, case_title, client_name, contact,
             client_email, court_number, judge_name, remarks, current_hearing, next_hearing,
             files, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            record.id.as_str(),
            record.case_number,
            record.case_title,
            record.client_name,
            record.contact,
            record.client_email,
            record.court_number,
            record.judge_name,
            record.remarks,
            record.current_date.map(|d| d.to_string()),
            record.next_date.map(|d| d.to_string()),
            files,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn select_one(conn: &Connection, id: &CaseId) -> Result<Option<CaseRecord>> {
    Ok(conn
        .query_row(
            &format!("{SELECT_COLUMNS} WHERE id = ?1"),
            params![id.as_str()],
            row_to_case,
        )
        .optional()?)
}

fn row_to_case(row: &rusqlite::Row<'_>) -> rusqlite::Result<CaseRecord> {
    let id: String = row.get(0)?;
    let current: Option<String> = row.get(9)?;
    let next: Option<String> = row.get(10)?;
    let files_json: String = row.get(11)?;

    let files: Vec<Attachment> = serde_json::from_str(&files_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(11, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(CaseRecord {
        id: CaseId(id),
        case_number: row.get(1)?,
        case_title: row.get(2)?,
        client_name: row.get(3)?,
        contact: row.get(4)?,
        client_email: row.get(5)?,
        court_number: row.get(6)?,
        judge_name: row.get(7)?,
        remarks: row.get(8)?,
        current_date: parse_column_date(9, current)?,
        next_date: parse_column_date(10, next)?,
        files,
    })
}

fn parse_column_date(idx: usize, value: Option<String>) -> rusqlite::Result<Option<NaiveDate>> {
    value
        .filter(|s| !s.is_empty())
        .map(|s| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexcase_shared::DataUrl;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample(title: &str) -> CaseRecord {
        CaseRecord {
            case_title: title.into(),
            client_name: "A. Client".into(),
            current_date: Some(date("2024-06-01")),
            next_date: Some(date("2024-07-01")),
            files: vec![
                Attachment::relayed("vakalat.pdf", "https://files/vakalat"),
                Attachment::pending("notes.txt", DataUrl::from_bytes("text/plain", b"notes")),
            ],
            ..CaseRecord::new(CaseId::from("caller-id"))
        }
    }

    #[test]
    fn add_assigns_fresh_id() {
        let db = Database::open_in_memory().unwrap();
        let first = db.add_case(&sample("One")).unwrap();
        let second = db.add_case(&sample("Two")).unwrap();

        assert_ne!(first, second);
        assert_ne!(first, CaseId::from("caller-id"));

        let stored = db.get_case(&first).unwrap().unwrap();
        assert_eq!(stored.id, first);
        assert_eq!(stored.case_title, "One");
        assert_eq!(stored.files, sample("One").files);
        assert_eq!(stored.next_date, Some(date("2024-07-01")));
    }

    #[test]
    fn put_merges_over_existing_case() {
        let db = Database::open_in_memory().unwrap();
        let id = db.add_case(&sample("Original")).unwrap();

        let mut patch = CasePatch::new(id.clone());
        patch.judge_name = Some("Justice Iyer".into());
        let merged = db.put_case(&patch).unwrap();

        assert_eq!(merged.judge_name, "Justice Iyer");
        assert_eq!(merged.case_title, "Original");
        assert_eq!(db.get_case(&id).unwrap().unwrap(), merged);
    }

    #[test]
    fn put_creates_unknown_id() {
        let db = Database::open_in_memory().unwrap();
        let patch = CasePatch::hearing(CaseId::from("remote-9"), date("2024-01-01"), date("2024-01-31"));

        db.put_case(&patch).unwrap();

        let stored = db.get_case(&CaseId::from("remote-9")).unwrap().unwrap();
        assert_eq!(stored.current_date, Some(date("2024-01-01")));
        assert_eq!(stored.case_title, "");
    }

    #[test]
    fn put_record_replaces_whole_case() {
        let db = Database::open_in_memory().unwrap();
        let id = db.add_case(&sample("Original")).unwrap();

        let replacement = CaseRecord {
            case_title: "Replaced".into(),
            ..CaseRecord::new(id.clone())
        };
        db.put_case_record(&replacement).unwrap();

        let stored = db.get_case(&id).unwrap().unwrap();
        assert_eq!(stored, replacement);
        assert!(stored.files.is_empty());
    }

    #[test]
    fn get_missing_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_case(&CaseId::from("nope")).unwrap().is_none());
    }

    #[test]
    fn delete_and_clear() {
        let db = Database::open_in_memory().unwrap();
        let a = db.add_case(&sample("A")).unwrap();
        db.add_case(&sample("B")).unwrap();
        db.add_case(&sample("C")).unwrap();

        assert!(db.delete_case(&a).unwrap());
        assert!(!db.delete_case(&a).unwrap());
        assert_eq!(db.count_cases().unwrap(), 2);

        assert_eq!(db.clear_cases().unwrap(), 2);
        assert!(db.list_cases().unwrap().is_empty());
    }

    #[test]
    fn replace_all_swaps_table_contents() {
        let db = Database::open_in_memory().unwrap();
        db.add_case(&sample("Old")).unwrap();

        let fresh = vec![
            CaseRecord {
                case_title: "X".into(),
                ..CaseRecord::new(CaseId::from("x"))
            },
            CaseRecord {
                case_title: "Y".into(),
                ..CaseRecord::new(CaseId::from("y"))
            },
        ];
        db.replace_all_cases(&fresh).unwrap();

        assert_eq!(db.list_cases().unwrap(), fresh);
    }

    #[test]
    fn cases_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cases.db");

        let id = {
            let db = Database::open_at(&path).unwrap();
            db.add_case(&sample("Persistent")).unwrap()
        };

        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.get_case(&id).unwrap().unwrap().case_title, "Persistent");
    }
}
