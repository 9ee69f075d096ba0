//! Account listing and creation.

use crate::{
    error::AppError,
    gateway::Gateway,
    models::{
        account::{Account, NewAccount},
        session::Session,
    },
};

pub async fn list_accounts<G: Gateway>(
    gateway: &G,
    session: &Session,
) -> Result<Vec<Account>, AppError> {
    Ok(gateway.get_accounts(session.owner_id).await?)
}

/// Register a new account with its opening balance.
///
/// # Errors
///
/// - `Validation`: empty account name
pub async fn create_account<G: Gateway>(
    gateway: &G,
    session: &Session,
    account: NewAccount,
) -> Result<Account, AppError> {
    if account.name.is_empty() {
        return Err(AppError::Validation("Account name is required".to_string()));
    }

    let account = gateway.create_account(session.owner_id, account).await?;
    tracing::info!(account_id = %account.id, kind = ?account.kind, "Account created");

    Ok(account)
}
