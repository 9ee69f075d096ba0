//! Transaction data models and API request/response types.
//!
//! This module defines:
//! - `Transaction`: Database entity representing a ledger entry
//! - `NewTransaction` / `TransactionPatch`: values written through the gateway
//! - Request types for creating, editing and querying entries
//! - `TransactionResponse`: Response body returned to clients

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::currency;

/// Direction of money relative to the owning account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "flow", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Flow {
    /// Money entering the account (income, receivable)
    Inflow,
    /// Money leaving the account (expense, payable)
    Outflow,
}

impl Flow {
    /// Sign applied to an amount of this flow when it hits a balance.
    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            Flow::Inflow => amount,
            Flow::Outflow => -amount,
        }
    }
}

/// Whether a transaction has been reflected in its account's balance.
///
/// The only supported transition is `Pending` → `Settled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "settlement_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SettlementStatus {
    Pending,
    Settled,
}

/// Represents a transaction record from the database.
///
/// # Database Table
///
/// Maps to the `transactions` table, left-joined with `categories` for the
/// display name used by reports.
///
/// # Invariants
///
/// - `amount` is always positive; the direction lives in `flow`
/// - a settled transaction always has an `account_id`
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct Transaction {
    pub id: Uuid,

    pub owner_id: Uuid,

    /// Free text, e.g. "Rent (2/12)"
    pub description: String,

    /// Positive amount
    pub amount: Decimal,

    /// Calendar date, no time component
    pub date: NaiveDate,

    pub flow: Flow,

    pub status: SettlementStatus,

    pub category_id: Option<Uuid>,

    /// Name of the referenced category, if any
    pub category_name: Option<String>,

    pub account_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
}

/// Values needed to insert a transaction row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub owner_id: Uuid,
    pub description: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub flow: Flow,
    pub status: SettlementStatus,
    pub category_id: Option<Uuid>,
    pub account_id: Option<Uuid>,
}

/// Partial update of a transaction. `None` leaves the column untouched.
///
/// Only the settle operation sets `status`, and only to `Settled`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionPatch {
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub date: Option<NaiveDate>,
    /// `Some(None)` clears the category
    pub category_id: Option<Option<Uuid>>,
    pub account_id: Option<Uuid>,
    pub status: Option<SettlementStatus>,
}

/// Request to create an entry (receivable or payable).
///
/// # JSON Example
///
/// ```json
/// {
///   "description": "New laptop",
///   "amount": "3.600,00",
///   "date": "2024-01-31",
///   "flow": "outflow",
///   "category_id": "550e8400-e29b-41d4-a716-446655440000",
///   "account_id": "660e8400-e29b-41d4-a716-446655440001",
///   "installments": 12
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEntryRequest {
    pub description: String,

    /// Total amount in pt-BR notation
    pub amount: String,

    pub date: NaiveDate,

    pub flow: Flow,

    pub category_id: Option<Uuid>,

    pub account_id: Option<Uuid>,

    /// Number of monthly installments (defaults to a single entry)
    #[serde(default)]
    pub installments: Option<u32>,
}

/// Request to edit an existing entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEntryRequest {
    pub description: Option<String>,

    /// New amount in pt-BR notation
    pub amount: Option<String>,

    pub date: Option<NaiveDate>,

    /// Absent keeps the category, `null` clears it
    #[serde(default, deserialize_with = "present")]
    pub category_id: Option<Option<Uuid>>,

    pub account_id: Option<Uuid>,
}

/// Wraps any value that is present in the body, `null` included, so an absent
/// field (`None`) can be told apart from an explicit `null` (`Some(None)`).
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Request body for `POST /api/v1/transactions/{id}/settle`.
///
/// `account_id` is needed only when the entry has no account yet.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettleRequest {
    pub account_id: Option<Uuid>,
}

/// Ids of the transactions created by one entry, in installment order.
#[derive(Debug, Serialize)]
pub struct CreatedEntriesResponse {
    pub ids: Vec<Uuid>,
}

/// Query string for listing transactions.
///
/// `GET /api/v1/transactions?start=2024-01-01&end=2024-01-31&status=pending&q=rent`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub status: Option<SettlementStatus>,
    pub flow: Option<Flow>,
    pub q: Option<String>,
}

/// Response returned for transaction operations.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: Uuid,
    pub description: String,
    pub amount: Decimal,
    pub amount_display: String,
    pub date: NaiveDate,
    pub flow: Flow,
    pub status: SettlementStatus,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub account_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionResponse {
    fn from(transaction: Transaction) -> Self {
        Self {
            id: transaction.id,
            amount_display: currency::format(transaction.amount),
            description: transaction.description,
            amount: transaction.amount,
            date: transaction.date,
            flow: transaction.flow,
            status: transaction.status,
            category_id: transaction.category_id,
            category_name: transaction.category_name,
            account_id: transaction.account_id,
            created_at: transaction.created_at,
        }
    }
}
