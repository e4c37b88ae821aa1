//! The signed-in account remembered on this device.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use lexcase_shared::Account;

use crate::database::Database;
use crate::error::Result;

impl Database {
    pub fn save_session(&self, account: &Account) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO session (id, email, display_name, token, signed_in_at)
             VALUES (1, ?1, ?2, ?3, ?4)",
            params![
                account.email,
                account.display_name,
                account.token,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn load_session(&self) -> Result<Option<Account>> {
        let account = self
            .conn()
            .query_row(
                "SELECT email, display_name, token FROM session WHERE id = 1",
                [],
                |row| {
                    Ok(Account {
                        email: row.get(0)?,
                        display_name: row.get(1)?,
                        token: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(account)
    }

    pub fn clear_session(&self) -> Result<()> {
        self.conn().execute("DELETE FROM session", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_round_trip() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.load_session().unwrap().is_none());

        let account = Account {
            email: "advocate@example.com".into(),
            display_name: Some("Advocate".into()),
            token: Some("t0k".into()),
        };
        db.save_session(&account).unwrap();
        assert_eq!(db.load_session().unwrap(), Some(account));

        db.save_session(&Account::new("other@example.com")).unwrap();
        assert_eq!(db.load_session().unwrap().unwrap().email, "other@example.com");

        db.clear_session().unwrap();
        assert!(db.load_session().unwrap().is_none());
    }
}
