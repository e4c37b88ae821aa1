//! v001 -- Initial schema creation.
//!
//! Creates the `cases` table.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS cases (
    id           TEXT PRIMARY KEY NOT NULL,   -- opaque; UUID v4 when created locally
    case_number  TEXT NOT NULL DEFAULT '',
    case_title   TEXT NOT NULL DEFAULT '',
    client_name  TEXT NOT NULL DEFAULT '',
    contact      TEXT NOT NULL DEFAULT '',
    client_email TEXT NOT NULL DEFAULT '',
    court_number TEXT NOT NULL DEFAULT '',
    judge_name   TEXT NOT NULL DEFAULT '',
    remarks      TEXT NOT NULL DEFAULT '',
    current_hearing TEXT,                     -- ISO-8601 calendar date
    next_hearing TEXT,                        -- ISO-8601 calendar date
    files        TEXT NOT NULL DEFAULT '[]',  -- JSON array of attachments
    updated_at   TEXT NOT NULL                -- RFC-3339
);

CREATE INDEX IF NOT EXISTS idx_cases_current_hearing ON cases(current_hearing);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
