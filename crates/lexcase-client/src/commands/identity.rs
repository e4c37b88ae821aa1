use tracing::info;

use lexcase_shared::Account;

use crate::error::{ClientError, Result};
use crate::lifecycle::on_auth_change;
use crate::state::AppState;

fn required<'a>(value: &'a str, what: &str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ClientError::Invalid(format!("{what} is required")));
    }
    Ok(value)
}

pub async fn sign_in(state: &AppState, email: &str, password: &str) -> Result<Account> {
    let email = required(email, "email")?;
    let password = required(password, "password")?;

    let account = state.identity().sign_in(email, password).await?;
    on_auth_change(state, Some(account.clone())).await?;
    Ok(account)
}

/// Register a new account. Providers that sign the new account in straight
/// away get the same treatment as [`sign_in`].
pub async fn sign_up(state: &AppState, name: &str, email: &str, password: &str) -> Result<Account> {
    let name = required(name, "name")?;
    let email = required(email, "email")?;
    let password = required(password, "password")?;

    let account = state.identity().sign_up(name, email, password).await?;
    info!(account = %account, "account registered");

    if let Some(current) = state.current_account() {
        on_auth_change(state, Some(current)).await?;
    }
    Ok(account)
}

pub async fn sign_out(state: &AppState) -> Result<()> {
    state.identity().sign_out().await?;
    on_auth_change(state, None).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::fixture;
    use lexcase_shared::{CaseId, CaseRecord};
    use lexcase_sync::memory::MemoryIdentity;
    use lexcase_sync::IdentityProvider;

    const EMAIL: &str = "advocate@example.com";

    #[tokio::test]
    async fn sign_up_then_in_pulls_cases() {
        let f = fixture(MemoryIdentity::new());
        f.remote.insert(EMAIL, &CaseRecord::new(CaseId::from("r")));

        sign_up(&f.state, "A. Advocate", EMAIL, "pw").await.unwrap();
        assert_eq!(f.state.cases().len(), 1);

        sign_out(&f.state).await.unwrap();
        assert!(f.state.current_account().is_none());
        assert!(f.state.with_db(|db| db.load_session()).unwrap().is_none());

        let account = sign_in(&f.state, EMAIL, "pw").await.unwrap();
        assert_eq!(account.display_name.as_deref(), Some("A. Advocate"));
        assert!(f.state.with_db(|db| db.load_session()).unwrap().is_some());
    }

    #[tokio::test]
    async fn sign_in_rejects_blank_and_wrong_credentials() {
        let f = fixture(MemoryIdentity::new());
        assert!(matches!(
            sign_in(&f.state, " ", "pw").await,
            Err(ClientError::Invalid(_))
        ));
        assert!(matches!(
            sign_in(&f.state, EMAIL, "nope").await,
            Err(ClientError::Sync(_))
        ));
        assert!(f.identity.current_account().is_none());
    }
}
