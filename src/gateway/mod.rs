//! Data access gateway.
//!
//! Every read and write the services perform goes through the [`Gateway`]
//! trait. The production implementation is [`postgres::PgGateway`]; tests run
//! the same services against an in-memory implementation.
//!
//! Methods return `Send` futures so services stay generic over the gateway
//! while still being usable from axum handlers.

use std::future::Future;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{
    account::{Account, NewAccount},
    category::Category,
    session::{Session, Theme},
    task::{Task, TaskPriority},
    transaction::{Flow, NewTransaction, SettlementStatus, Transaction, TransactionPatch},
};

#[cfg(test)]
pub mod memory;
pub mod postgres;

/// Failure reported by the storage backend.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Query or connection failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The row addressed by id does not exist (or belongs to another owner).
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    /// The backend rejected the write for a reason other than a missing row.
    #[error("write rejected: {0}")]
    Rejected(String),
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Filter for [`Gateway::query_transactions`]. Unset fields match everything.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionFilter {
    pub owner_id: Uuid,
    pub date_range: Option<DateRange>,
    pub account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub status: Option<SettlementStatus>,
    pub flow: Option<Flow>,
    /// Case-insensitive substring of the description
    pub search_text: Option<String>,
}

impl TransactionFilter {
    pub fn owner(owner_id: Uuid) -> Self {
        Self {
            owner_id,
            date_range: None,
            account_id: None,
            category_id: None,
            status: None,
            flow: None,
            search_text: None,
        }
    }

    /// Whether a transaction passes this filter.
    ///
    /// Mirrors the SQL `WHERE` clause of the Postgres gateway.
    pub fn matches(&self, transaction: &Transaction) -> bool {
        transaction.owner_id == self.owner_id
            && self
                .date_range
                .is_none_or(|range| range.contains(transaction.date))
            && self
                .account_id
                .is_none_or(|id| transaction.account_id == Some(id))
            && self
                .category_id
                .is_none_or(|id| transaction.category_id == Some(id))
            && self.status.is_none_or(|status| transaction.status == status)
            && self.flow.is_none_or(|flow| transaction.flow == flow)
            && self.search_text.as_deref().is_none_or(|needle| {
                transaction
                    .description
                    .to_lowercase()
                    .contains(&needle.to_lowercase())
            })
    }
}

/// Filter for [`Gateway::get_categories`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryFilter {
    pub owner_id: Uuid,
    pub flow: Option<Flow>,
}

/// Filter for [`Gateway::query_tasks`]. Completed tasks are always excluded.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskFilter {
    pub owner_id: Uuid,
    pub search_text: Option<String>,
    pub priority: Option<TaskPriority>,
    pub date: Option<NaiveDate>,
}

/// The four writes of a transfer, in posting order.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferPosting {
    pub debit: NewTransaction,
    pub credit: NewTransaction,
    pub origin_id: Uuid,
    pub destination_id: Uuid,
    pub amount: Decimal,
}

/// Ids of the two transactions a transfer created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostedLegs {
    pub debit_id: Uuid,
    pub credit_id: Uuid,
}

/// Persistence interface consumed by the services.
pub trait Gateway: Clone + Send + Sync + 'static {
    /// Round-trip to the backend, used by the health check.
    fn ping(&self) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Look up the owner an API key hash belongs to. Inactive owners are not found.
    fn find_session(
        &self,
        key_hash: &str,
    ) -> impl Future<Output = Result<Option<Session>, GatewayError>> + Send;

    fn set_theme(
        &self,
        owner_id: Uuid,
        theme: Theme,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// All accounts of an owner, ordered by name.
    fn get_accounts(
        &self,
        owner_id: Uuid,
    ) -> impl Future<Output = Result<Vec<Account>, GatewayError>> + Send;

    fn create_account(
        &self,
        owner_id: Uuid,
        account: NewAccount,
    ) -> impl Future<Output = Result<Account, GatewayError>> + Send;

    /// Overwrite an account balance.
    fn update_account_balance(
        &self,
        account_id: Uuid,
        balance: Decimal,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    fn insert_transaction(
        &self,
        transaction: NewTransaction,
    ) -> impl Future<Output = Result<Uuid, GatewayError>> + Send;

    /// Insert several transactions as one write; either all rows land or none.
    fn insert_transactions(
        &self,
        transactions: Vec<NewTransaction>,
    ) -> impl Future<Output = Result<Vec<Uuid>, GatewayError>> + Send;

    fn update_transaction(
        &self,
        transaction_id: Uuid,
        patch: TransactionPatch,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    fn delete_transaction(
        &self,
        transaction_id: Uuid,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// A single transaction of an owner.
    fn get_transaction(
        &self,
        owner_id: Uuid,
        transaction_id: Uuid,
    ) -> impl Future<Output = Result<Option<Transaction>, GatewayError>> + Send;

    /// Matching transactions, newest date first.
    fn query_transactions(
        &self,
        filter: TransactionFilter,
    ) -> impl Future<Output = Result<Vec<Transaction>, GatewayError>> + Send;

    /// Matching categories, ordered by name.
    fn get_categories(
        &self,
        filter: CategoryFilter,
    ) -> impl Future<Output = Result<Vec<Category>, GatewayError>> + Send;

    /// Insert the category, or update it when a row with its id exists.
    fn upsert_category(
        &self,
        category: Category,
    ) -> impl Future<Output = Result<Uuid, GatewayError>> + Send;

    fn delete_category(
        &self,
        category_id: Uuid,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Open tasks matching the filter, ordered by date and time.
    fn query_tasks(
        &self,
        filter: TaskFilter,
    ) -> impl Future<Output = Result<Vec<Task>, GatewayError>> + Send;

    /// A single task of an owner, completed or not.
    fn get_task(
        &self,
        owner_id: Uuid,
        task_id: Uuid,
    ) -> impl Future<Output = Result<Option<Task>, GatewayError>> + Send;

    fn upsert_task(&self, task: Task) -> impl Future<Output = Result<Uuid, GatewayError>> + Send;

    fn delete_task(&self, task_id: Uuid) -> impl Future<Output = Result<(), GatewayError>> + Send;
}

/// Backends that can apply a whole transfer inside one storage transaction.
pub trait AtomicTransfer: Gateway {
    /// Apply both inserts and both balance changes, or nothing.
    ///
    /// Balances move relative to their locked current value rather than to the
    /// value the caller validated against. Fails with
    /// [`GatewayError::Rejected`] when the locked origin balance no longer
    /// covers the amount.
    fn post_transfer_atomically(
        &self,
        posting: &TransferPosting,
    ) -> impl Future<Output = Result<PostedLegs, GatewayError>> + Send;
}
