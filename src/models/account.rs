//! Account data models and API request/response types.
//!
//! This module defines:
//! - `Account`: Database entity representing a bank account, wallet, savings or card
//! - `CreateAccountRequest`: Request body for creating accounts
//! - `AccountResponse`: Response body returned to clients

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::currency;

/// The closed set of account types an owner can register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    #[default]
    Bank,
    Wallet,
    Savings,
    Card,
}

/// Represents an account record from the database.
///
/// # Database Table
///
/// Maps to the `bank_accounts` table. Each account:
/// - Belongs to one owner (via `owner_id`)
/// - Has a signed balance stored as `NUMERIC(14, 2)`
///
/// # Balance
///
/// The balance has no sign invariant: card accounts and other debts may go
/// negative. It is only changed by settling transactions (database trigger)
/// or by posting a transfer.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct Account {
    /// Unique identifier for this account
    pub id: Uuid,

    /// Owner this account belongs to
    ///
    /// Every query filters by `owner_id` so one owner never sees another's accounts.
    pub owner_id: Uuid,

    /// Display name, e.g. "Main account"
    pub name: String,

    /// Institution name, e.g. "Nubank"
    pub bank_name: String,

    /// Current balance
    pub balance: Decimal,

    /// Account type tag
    pub kind: AccountKind,

    /// Timestamp when account was created
    pub created_at: DateTime<Utc>,
}

/// Request body for creating a new account.
///
/// # JSON Example
///
/// ```json
/// {
///   "name": "Main account",
///   "bank_name": "Nubank",
///   "balance": "1.500,00",
///   "kind": "bank"
/// }
/// ```
///
/// The opening balance is entered the way users type it and goes through
/// [`currency::parse`], so a malformed value opens the account at zero.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub name: String,

    pub bank_name: String,

    /// Opening balance in pt-BR notation (defaults to zero)
    #[serde(default)]
    pub balance: String,

    #[serde(default)]
    pub kind: AccountKind,
}

/// Values needed to insert an account row.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub bank_name: String,
    pub balance: Decimal,
    pub kind: AccountKind,
}

impl From<CreateAccountRequest> for NewAccount {
    fn from(request: CreateAccountRequest) -> Self {
        Self {
            name: request.name.trim().to_string(),
            bank_name: request.bank_name.trim().to_string(),
            balance: currency::parse(&request.balance),
            kind: request.kind,
        }
    }
}

/// Response body for account endpoints.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": "550e8400-e29b-41d4-a716-446655440000",
///   "name": "Main account",
///   "bank_name": "Nubank",
///   "balance": "1500.00",
///   "balance_display": "R$ 1.500,00",
///   "kind": "bank",
///   "created_at": "2025-12-20T10:00:00Z"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub name: String,
    pub bank_name: String,
    pub balance: Decimal,
    pub balance_display: String,
    pub kind: AccountKind,
    pub created_at: DateTime<Utc>,
}

/// Convert database Account to API AccountResponse.
///
/// Drops the internal `owner_id` and adds the formatted balance.
impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            balance_display: currency::format(account.balance),
            name: account.name,
            bank_name: account.bank_name,
            balance: account.balance,
            kind: account.kind,
            created_at: account.created_at,
        }
    }
}
