//! v002 -- Signed-in session.
//!
//! Single-row table remembering which account is signed in on this device.

use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS session (
    id           INTEGER PRIMARY KEY CHECK (id = 1),
    email        TEXT NOT NULL,
    display_name TEXT,
    token        TEXT,
    signed_in_at TEXT NOT NULL
);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
