//! Startup and sign-in/sign-out reactions.

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use lexcase_shared::Account;
use lexcase_sync::{AdvanceReport, PullReport};

use crate::error::Result;
use crate::state::AppState;

/// Bring the app up for `today`: resume the remembered session, pull if that
/// leaves someone signed in, then roll lapsed hearings forward.
///
/// The advance runs after the pull so remote copies cannot put lapsed dates
/// back into the local table.
pub async fn startup(state: &AppState, today: NaiveDate) -> Result<AdvanceReport> {
    if state.current_account().is_none() {
        if let Some(account) = state.with_db(|db| db.load_session())? {
            info!(account = %account, "resuming saved session");
            state.identity().resume(account);
        }
    }

    on_auth_change(state, state.current_account()).await?;

    let report = state.engine.advance_hearings(today).await?;
    state.refresh()?;
    Ok(report)
}

/// React to the signed-in account changing. A new account is remembered and
/// pulled; signing out forgets the session. Repeated notifications for the
/// same account are ignored.
pub async fn on_auth_change(
    state: &AppState,
    account: Option<Account>,
) -> Result<Option<PullReport>> {
    if !state.note_account(account.as_ref())? {
        return Ok(None);
    }

    let Some(account) = account else {
        state.with_db(|db| db.clear_session())?;
        info!("signed out, session cleared");
        state.refresh()?;
        return Ok(None);
    };

    state.with_db(|db| db.save_session(&account))?;
    info!(account = %account, "signed in");

    let report = match state.engine.sync_from_cloud().await {
        Ok(report) => Some(report),
        Err(e) => {
            warn!(account = %account, error = %e, "pull after sign-in failed");
            None
        }
    };
    state.refresh()?;
    Ok(report)
}

/// Follow the identity provider's account channel for the lifetime of the
/// returned task.
pub fn watch_auth(state: Arc<AppState>) -> JoinHandle<()> {
    let mut rx = state.identity().subscribe();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let account = rx.borrow_and_update().clone();
            if let Err(e) = on_auth_change(&state, account).await {
                warn!(error = %e, "failed to handle auth change");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::fixture;
    use lexcase_shared::{CaseId, CaseRecord};
    use lexcase_sync::memory::MemoryIdentity;
    use lexcase_sync::IdentityProvider;

    const EMAIL: &str = "advocate@example.com";

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn startup_advances_and_refreshes() {
        let f = fixture(MemoryIdentity::new());
        let record = CaseRecord {
            current_date: Some(date("2020-01-01")),
            next_date: Some(date("2020-02-01")),
            ..CaseRecord::new(CaseId::from("c1"))
        };
        f.state.with_db(|db| db.put_case_record(&record)).unwrap();

        let report = startup(&f.state, date("2024-06-01")).await.unwrap();
        assert_eq!(report.applied, 1);

        let cases = f.state.cases();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].current_date, Some(date("2024-06-09")));
        assert_eq!(cases[0].next_date, Some(date("2024-07-09")));
    }

    #[tokio::test]
    async fn startup_resumes_saved_session_and_pulls() {
        let f = fixture(MemoryIdentity::new());
        f.state
            .with_db(|db| db.save_session(&Account::new(EMAIL)))
            .unwrap();
        f.remote
            .insert(EMAIL, &CaseRecord::new(CaseId::from("remote-1")));

        startup(&f.state, date("2024-06-01")).await.unwrap();

        assert_eq!(f.identity.current_account().unwrap().email, EMAIL);
        assert_eq!(f.state.cases().len(), 1);
        assert_eq!(f.remote.list_calls(), 1);
    }

    #[tokio::test]
    async fn auth_change_pulls_once_per_account() {
        let f = fixture(MemoryIdentity::signed_in(EMAIL));
        f.remote.insert(EMAIL, &CaseRecord::new(CaseId::from("r")));
        let account = f.state.current_account();

        let first = on_auth_change(&f.state, account.clone()).await.unwrap();
        assert_eq!(first.unwrap().added, 1);
        assert!(on_auth_change(&f.state, account).await.unwrap().is_none());
        assert_eq!(f.remote.list_calls(), 1);

        let saved = f.state.with_db(|db| db.load_session()).unwrap();
        assert_eq!(saved.unwrap().email, EMAIL);
    }

    #[tokio::test]
    async fn sign_out_clears_session() {
        let f = fixture(MemoryIdentity::signed_in(EMAIL));
        on_auth_change(&f.state, f.state.current_account()).await.unwrap();

        f.identity.sign_out().await.unwrap();
        on_auth_change(&f.state, None).await.unwrap();

        assert!(f.state.with_db(|db| db.load_session()).unwrap().is_none());
    }

    #[tokio::test]
    async fn watch_auth_follows_sign_in() {
        let f = fixture(MemoryIdentity::new());
        f.remote.insert(EMAIL, &CaseRecord::new(CaseId::from("r")));
        let handle = watch_auth(f.state.clone());

        f.identity.resume(Account::new(EMAIL));
        for _ in 0..100 {
            if !f.state.cases().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        handle.abort();

        assert_eq!(f.state.cases().len(), 1);
    }
}
