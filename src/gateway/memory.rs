//! In-memory gateway for tests.
//!
//! Emulates the database triggers (settle applies, delete reverses) and can be
//! told to fail the n-th write so partial transfer postings can be exercised.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    gateway::{
        AtomicTransfer, CategoryFilter, Gateway, GatewayError, PostedLegs, TaskFilter,
        TransactionFilter, TransferPosting,
    },
    models::{
        account::{Account, AccountKind, NewAccount},
        category::{Category, DEFAULT_COLOR},
        session::{Session, Theme},
        task::{Task, TaskStatus},
        transaction::{Flow, NewTransaction, SettlementStatus, Transaction, TransactionPatch},
    },
    notify::{ChangeFeed, Table},
};

#[derive(Debug, Default)]
struct State {
    sessions: Vec<(String, Session)>,
    accounts: Vec<Account>,
    transactions: Vec<Transaction>,
    categories: Vec<Category>,
    tasks: Vec<Task>,
    writes: usize,
    fail_at_write: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryGateway {
    state: Arc<Mutex<State>>,
    feed: Option<ChangeFeed>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a change event after every successful write.
    pub fn with_feed(mut self, feed: ChangeFeed) -> Self {
        self.feed = Some(feed);
        self
    }

    /// Make the n-th write (1-based, counted from now) fail.
    ///
    /// Counted writes: `update_account_balance`, `insert_transaction`,
    /// `insert_transactions`, `update_transaction`, `delete_transaction`.
    pub fn fail_at_write(&self, n: usize) {
        let mut state = self.lock();
        state.fail_at_write = Some(state.writes + n);
    }

    pub fn add_owner(&self, api_key_hash: &str, display_name: &str) -> Session {
        let session = Session {
            owner_id: Uuid::new_v4(),
            display_name: display_name.to_string(),
            theme: Theme::Light,
        };
        self.lock()
            .sessions
            .push((api_key_hash.to_string(), session.clone()));
        session
    }

    pub fn add_account(&self, owner_id: Uuid, name: &str, balance: Decimal) -> Account {
        let account = Account {
            id: Uuid::new_v4(),
            owner_id,
            name: name.to_string(),
            bank_name: "Test Bank".to_string(),
            balance,
            kind: AccountKind::Bank,
            created_at: Utc::now(),
        };
        self.lock().accounts.push(account.clone());
        account
    }

    pub fn add_category(&self, owner_id: Uuid, name: &str, flow: Flow) -> Category {
        let category = Category {
            id: Uuid::new_v4(),
            owner_id,
            name: name.to_string(),
            color: DEFAULT_COLOR.to_string(),
            flow,
        };
        self.lock().categories.push(category.clone());
        category
    }

    pub fn account(&self, account_id: Uuid) -> Option<Account> {
        self.lock()
            .accounts
            .iter()
            .find(|a| a.id == account_id)
            .cloned()
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        let state = self.lock();
        state
            .transactions
            .iter()
            .map(|t| with_category_name(&state, t.clone()))
            .collect()
    }

    pub fn categories(&self) -> Vec<Category> {
        self.lock().categories.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("memory gateway state poisoned")
    }

    fn publish(&self, table: Table) {
        if let Some(feed) = &self.feed {
            feed.publish(table);
        }
    }

    /// Count a write and fail it if it is the scheduled one.
    fn begin_write(state: &mut State) -> Result<(), GatewayError> {
        state.writes += 1;
        if state.fail_at_write == Some(state.writes) {
            return Err(GatewayError::Rejected(format!(
                "injected failure at write {}",
                state.writes
            )));
        }
        Ok(())
    }
}

fn with_category_name(state: &State, mut transaction: Transaction) -> Transaction {
    transaction.category_name = transaction.category_id.and_then(|id| {
        state
            .categories
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.clone())
    });
    transaction
}

fn adjust_balance(state: &mut State, account_id: Option<Uuid>, delta: Decimal) {
    if let Some(account) = account_id.and_then(|id| state.accounts.iter_mut().find(|a| a.id == id))
    {
        account.balance += delta;
    }
}

fn materialize(transaction: NewTransaction) -> Transaction {
    Transaction {
        id: Uuid::new_v4(),
        owner_id: transaction.owner_id,
        description: transaction.description,
        amount: transaction.amount,
        date: transaction.date,
        flow: transaction.flow,
        status: transaction.status,
        category_id: transaction.category_id,
        category_name: None,
        account_id: transaction.account_id,
        created_at: Utc::now(),
    }
}

fn check_amount(transaction: &NewTransaction) -> Result<(), GatewayError> {
    if transaction.amount <= Decimal::ZERO {
        return Err(GatewayError::Rejected("amount must be positive".to_string()));
    }
    Ok(())
}

impl Gateway for MemoryGateway {
    async fn ping(&self) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn find_session(&self, key_hash: &str) -> Result<Option<Session>, GatewayError> {
        Ok(self
            .lock()
            .sessions
            .iter()
            .find(|(hash, _)| hash == key_hash)
            .map(|(_, session)| session.clone()))
    }

    async fn set_theme(&self, owner_id: Uuid, theme: Theme) -> Result<(), GatewayError> {
        let mut state = self.lock();
        let session = state
            .sessions
            .iter_mut()
            .map(|(_, session)| session)
            .find(|session| session.owner_id == owner_id)
            .ok_or(GatewayError::NotFound {
                entity: "owner",
                id: owner_id,
            })?;
        session.theme = theme;
        Ok(())
    }

    async fn get_accounts(&self, owner_id: Uuid) -> Result<Vec<Account>, GatewayError> {
        let mut accounts: Vec<Account> = self
            .lock()
            .accounts
            .iter()
            .filter(|a| a.owner_id == owner_id)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(accounts)
    }

    async fn create_account(
        &self,
        owner_id: Uuid,
        account: NewAccount,
    ) -> Result<Account, GatewayError> {
        let account = Account {
            id: Uuid::new_v4(),
            owner_id,
            name: account.name,
            bank_name: account.bank_name,
            balance: account.balance,
            kind: account.kind,
            created_at: Utc::now(),
        };
        self.lock().accounts.push(account.clone());
        self.publish(Table::BankAccounts);
        Ok(account)
    }

    async fn update_account_balance(
        &self,
        account_id: Uuid,
        balance: Decimal,
    ) -> Result<(), GatewayError> {
        {
            let mut state = self.lock();
            Self::begin_write(&mut state)?;
            let account = state
                .accounts
                .iter_mut()
                .find(|a| a.id == account_id)
                .ok_or(GatewayError::NotFound {
                    entity: "account",
                    id: account_id,
                })?;
            account.balance = balance;
        }
        self.publish(Table::BankAccounts);
        Ok(())
    }

    async fn insert_transaction(&self, transaction: NewTransaction) -> Result<Uuid, GatewayError> {
        let id = {
            let mut state = self.lock();
            Self::begin_write(&mut state)?;
            check_amount(&transaction)?;
            let row = materialize(transaction);
            let id = row.id;
            state.transactions.push(row);
            id
        };
        self.publish(Table::Transactions);
        Ok(id)
    }

    async fn insert_transactions(
        &self,
        transactions: Vec<NewTransaction>,
    ) -> Result<Vec<Uuid>, GatewayError> {
        let ids = {
            let mut state = self.lock();
            Self::begin_write(&mut state)?;
            for transaction in &transactions {
                check_amount(transaction)?;
            }
            let rows: Vec<Transaction> = transactions.into_iter().map(materialize).collect();
            let ids = rows.iter().map(|t| t.id).collect();
            state.transactions.extend(rows);
            ids
        };
        self.publish(Table::Transactions);
        Ok(ids)
    }

    async fn update_transaction(
        &self,
        transaction_id: Uuid,
        patch: TransactionPatch,
    ) -> Result<(), GatewayError> {
        {
            let mut state = self.lock();
            Self::begin_write(&mut state)?;
            let transaction = state
                .transactions
                .iter_mut()
                .find(|t| t.id == transaction_id)
                .ok_or(GatewayError::NotFound {
                    entity: "transaction",
                    id: transaction_id,
                })?;

            let was_pending = transaction.status == SettlementStatus::Pending;
            if let Some(description) = patch.description {
                transaction.description = description;
            }
            if let Some(amount) = patch.amount {
                transaction.amount = amount;
            }
            if let Some(date) = patch.date {
                transaction.date = date;
            }
            if let Some(category_id) = patch.category_id {
                transaction.category_id = category_id;
            }
            if patch.account_id.is_some() {
                transaction.account_id = patch.account_id;
            }
            if let Some(status) = patch.status {
                transaction.status = status;
            }

            if was_pending && transaction.status == SettlementStatus::Settled {
                let (account_id, delta) = (
                    transaction.account_id,
                    transaction.flow.signed(transaction.amount),
                );
                adjust_balance(&mut state, account_id, delta);
            }
        }
        self.publish(Table::Transactions);
        Ok(())
    }

    async fn delete_transaction(&self, transaction_id: Uuid) -> Result<(), GatewayError> {
        {
            let mut state = self.lock();
            Self::begin_write(&mut state)?;
            let position = state
                .transactions
                .iter()
                .position(|t| t.id == transaction_id)
                .ok_or(GatewayError::NotFound {
                    entity: "transaction",
                    id: transaction_id,
                })?;
            let removed = state.transactions.remove(position);
            if removed.status == SettlementStatus::Settled {
                adjust_balance(
                    &mut state,
                    removed.account_id,
                    -removed.flow.signed(removed.amount),
                );
            }
        }
        self.publish(Table::Transactions);
        Ok(())
    }

    async fn get_transaction(
        &self,
        owner_id: Uuid,
        transaction_id: Uuid,
    ) -> Result<Option<Transaction>, GatewayError> {
        let state = self.lock();
        Ok(state
            .transactions
            .iter()
            .find(|t| t.id == transaction_id && t.owner_id == owner_id)
            .map(|t| with_category_name(&state, t.clone())))
    }

    async fn query_transactions(
        &self,
        filter: TransactionFilter,
    ) -> Result<Vec<Transaction>, GatewayError> {
        let state = self.lock();
        let mut transactions: Vec<Transaction> = state
            .transactions
            .iter()
            .filter(|t| filter.matches(t))
            .map(|t| with_category_name(&state, t.clone()))
            .collect();
        transactions.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(transactions)
    }

    async fn get_categories(&self, filter: CategoryFilter) -> Result<Vec<Category>, GatewayError> {
        let mut categories: Vec<Category> = self
            .lock()
            .categories
            .iter()
            .filter(|c| c.owner_id == filter.owner_id)
            .filter(|c| filter.flow.is_none_or(|flow| c.flow == flow))
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn upsert_category(&self, category: Category) -> Result<Uuid, GatewayError> {
        let id = category.id;
        {
            let mut state = self.lock();
            match state.categories.iter_mut().find(|c| c.id == id) {
                Some(existing) => *existing = category,
                None => state.categories.push(category),
            }
        }
        self.publish(Table::Categories);
        Ok(id)
    }

    async fn delete_category(&self, category_id: Uuid) -> Result<(), GatewayError> {
        {
            let mut state = self.lock();
            let before = state.categories.len();
            state.categories.retain(|c| c.id != category_id);
            if state.categories.len() == before {
                return Err(GatewayError::NotFound {
                    entity: "category",
                    id: category_id,
                });
            }
        }
        self.publish(Table::Categories);
        Ok(())
    }

    async fn query_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>, GatewayError> {
        let mut tasks: Vec<Task> = self
            .lock()
            .tasks
            .iter()
            .filter(|t| t.owner_id == filter.owner_id && t.status != TaskStatus::Completed)
            .filter(|t| {
                filter
                    .search_text
                    .as_deref()
                    .is_none_or(|needle| t.title.to_lowercase().contains(&needle.to_lowercase()))
            })
            .filter(|t| filter.priority.is_none_or(|p| t.priority == p))
            .filter(|t| filter.date.is_none_or(|d| t.date == d))
            .cloned()
            .collect();
        tasks.sort_by_key(|t| (t.date, t.time));
        Ok(tasks)
    }

    async fn get_task(&self, owner_id: Uuid, task_id: Uuid) -> Result<Option<Task>, GatewayError> {
        Ok(self
            .lock()
            .tasks
            .iter()
            .find(|t| t.id == task_id && t.owner_id == owner_id)
            .cloned())
    }

    async fn upsert_task(&self, task: Task) -> Result<Uuid, GatewayError> {
        let id = task.id;
        {
            let mut state = self.lock();
            match state.tasks.iter_mut().find(|t| t.id == id) {
                Some(existing) => *existing = task,
                None => state.tasks.push(task),
            }
        }
        self.publish(Table::Tasks);
        Ok(id)
    }

    async fn delete_task(&self, task_id: Uuid) -> Result<(), GatewayError> {
        {
            let mut state = self.lock();
            let before = state.tasks.len();
            state.tasks.retain(|t| t.id != task_id);
            if state.tasks.len() == before {
                return Err(GatewayError::NotFound {
                    entity: "task",
                    id: task_id,
                });
            }
        }
        self.publish(Table::Tasks);
        Ok(())
    }
}

impl AtomicTransfer for MemoryGateway {
    async fn post_transfer_atomically(
        &self,
        posting: &TransferPosting,
    ) -> Result<PostedLegs, GatewayError> {
        let legs = {
            let mut state = self.lock();
            Self::begin_write(&mut state)?;

            let origin_balance = state
                .accounts
                .iter()
                .find(|a| a.id == posting.origin_id)
                .map(|a| a.balance)
                .ok_or(GatewayError::NotFound {
                    entity: "account",
                    id: posting.origin_id,
                })?;
            if !state.accounts.iter().any(|a| a.id == posting.destination_id) {
                return Err(GatewayError::NotFound {
                    entity: "account",
                    id: posting.destination_id,
                });
            }
            if origin_balance < posting.amount {
                return Err(GatewayError::Rejected("insufficient funds".to_string()));
            }

            let debit = materialize(posting.debit.clone());
            let credit = materialize(posting.credit.clone());
            let legs = PostedLegs {
                debit_id: debit.id,
                credit_id: credit.id,
            };
            state.transactions.push(debit);
            state.transactions.push(credit);
            adjust_balance(&mut state, Some(posting.origin_id), -posting.amount);
            adjust_balance(&mut state, Some(posting.destination_id), posting.amount);
            legs
        };
        self.publish(Table::Transactions);
        self.publish(Table::BankAccounts);
        Ok(legs)
    }
}
