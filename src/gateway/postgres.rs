//! PostgreSQL implementation of the gateway.
//!
//! Queries are built at runtime with `sqlx::query_as` so the crate compiles
//! without a live database. Optional filters use the `($n IS NULL OR ...)`
//! pattern instead of string-built SQL.

use rust_decimal::Decimal;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::{
    db::DbPool,
    gateway::{
        AtomicTransfer, CategoryFilter, Gateway, GatewayError, PostedLegs, TaskFilter,
        TransactionFilter, TransferPosting,
    },
    models::{
        account::{Account, NewAccount},
        category::Category,
        session::{Session, Theme},
        task::Task,
        transaction::{NewTransaction, Transaction, TransactionPatch},
    },
};

const SELECT_TRANSACTION: &str = r#"
    SELECT t.id, t.owner_id, t.description, t.amount, t.date, t.flow, t.status,
           t.category_id, c.name AS category_name, t.account_id, t.created_at
    FROM transactions t
    LEFT JOIN categories c ON c.id = t.category_id
"#;

const SELECT_ACCOUNT: &str =
    "SELECT id, owner_id, name, bank_name, balance, kind, created_at FROM bank_accounts";

/// Gateway backed by a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PgGateway {
    pool: DbPool,
}

impl PgGateway {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Insert one transaction row on any executor (pool or open transaction).
async fn insert_one<'e, E>(executor: E, transaction: &NewTransaction) -> Result<Uuid, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_scalar(
        r#"
        INSERT INTO transactions (
            owner_id, description, amount, date, flow, status, category_id, account_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        "#,
    )
    .bind(transaction.owner_id)
    .bind(&transaction.description)
    .bind(transaction.amount)
    .bind(transaction.date)
    .bind(transaction.flow)
    .bind(transaction.status)
    .bind(transaction.category_id)
    .bind(transaction.account_id)
    .fetch_one(executor)
    .await
}

fn not_found(entity: &'static str, id: Uuid, rows_affected: u64) -> Result<(), GatewayError> {
    if rows_affected == 0 {
        Err(GatewayError::NotFound { entity, id })
    } else {
        Ok(())
    }
}

impl Gateway for PgGateway {
    async fn ping(&self) -> Result<(), GatewayError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_session(&self, key_hash: &str) -> Result<Option<Session>, GatewayError> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT id AS owner_id, display_name, theme
            FROM owners
            WHERE key_hash = $1 AND is_active = true
            "#,
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn set_theme(&self, owner_id: Uuid, theme: Theme) -> Result<(), GatewayError> {
        let result = sqlx::query("UPDATE owners SET theme = $2 WHERE id = $1")
            .bind(owner_id)
            .bind(theme)
            .execute(&self.pool)
            .await?;

        not_found("owner", owner_id, result.rows_affected())
    }

    async fn get_accounts(&self, owner_id: Uuid) -> Result<Vec<Account>, GatewayError> {
        let accounts = sqlx::query_as::<_, Account>(&format!(
            "{SELECT_ACCOUNT} WHERE owner_id = $1 ORDER BY name"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(accounts)
    }

    async fn create_account(
        &self,
        owner_id: Uuid,
        account: NewAccount,
    ) -> Result<Account, GatewayError> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO bank_accounts (owner_id, name, bank_name, balance, kind)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, owner_id, name, bank_name, balance, kind, created_at
            "#,
        )
        .bind(owner_id)
        .bind(account.name)
        .bind(account.bank_name)
        .bind(account.balance)
        .bind(account.kind)
        .fetch_one(&self.pool)
        .await?;

        Ok(account)
    }

    async fn update_account_balance(
        &self,
        account_id: Uuid,
        balance: Decimal,
    ) -> Result<(), GatewayError> {
        let result = sqlx::query("UPDATE bank_accounts SET balance = $2 WHERE id = $1")
            .bind(account_id)
            .bind(balance)
            .execute(&self.pool)
            .await?;

        not_found("account", account_id, result.rows_affected())
    }

    async fn insert_transaction(&self, transaction: NewTransaction) -> Result<Uuid, GatewayError> {
        Ok(insert_one(&self.pool, &transaction).await?)
    }

    async fn insert_transactions(
        &self,
        transactions: Vec<NewTransaction>,
    ) -> Result<Vec<Uuid>, GatewayError> {
        let mut tx = self.pool.begin().await?;

        let mut ids = Vec::with_capacity(transactions.len());
        for transaction in &transactions {
            ids.push(insert_one(&mut *tx, transaction).await?);
        }

        tx.commit().await?;

        Ok(ids)
    }

    async fn update_transaction(
        &self,
        transaction_id: Uuid,
        patch: TransactionPatch,
    ) -> Result<(), GatewayError> {
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET description = COALESCE($2, description),
                amount = COALESCE($3, amount),
                date = COALESCE($4, date),
                category_id = CASE WHEN $8 THEN $5 ELSE category_id END,
                account_id = COALESCE($6, account_id),
                status = COALESCE($7, status)
            WHERE id = $1
            "#,
        )
        .bind(transaction_id)
        .bind(patch.description)
        .bind(patch.amount)
        .bind(patch.date)
        .bind(patch.category_id.flatten())
        .bind(patch.account_id)
        .bind(patch.status)
        // A NULL $5 means "clear" only when the patch names the category.
        .bind(patch.category_id.is_some())
        .execute(&self.pool)
        .await?;

        not_found("transaction", transaction_id, result.rows_affected())
    }

    async fn delete_transaction(&self, transaction_id: Uuid) -> Result<(), GatewayError> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = $1")
            .bind(transaction_id)
            .execute(&self.pool)
            .await?;

        not_found("transaction", transaction_id, result.rows_affected())
    }

    async fn get_transaction(
        &self,
        owner_id: Uuid,
        transaction_id: Uuid,
    ) -> Result<Option<Transaction>, GatewayError> {
        let transaction = sqlx::query_as::<_, Transaction>(&format!(
            "{SELECT_TRANSACTION} WHERE t.id = $1 AND t.owner_id = $2"
        ))
        .bind(transaction_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    async fn query_transactions(
        &self,
        filter: TransactionFilter,
    ) -> Result<Vec<Transaction>, GatewayError> {
        let transactions = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            {SELECT_TRANSACTION}
            WHERE t.owner_id = $1
              AND ($2::date IS NULL OR t.date >= $2)
              AND ($3::date IS NULL OR t.date <= $3)
              AND ($4::uuid IS NULL OR t.account_id = $4)
              AND ($5::uuid IS NULL OR t.category_id = $5)
              AND ($6::settlement_status IS NULL OR t.status = $6)
              AND ($7::flow IS NULL OR t.flow = $7)
              AND ($8::text IS NULL OR t.description ILIKE '%' || $8 || '%')
            ORDER BY t.date DESC, t.created_at DESC
            "#
        ))
        .bind(filter.owner_id)
        .bind(filter.date_range.map(|range| range.start))
        .bind(filter.date_range.map(|range| range.end))
        .bind(filter.account_id)
        .bind(filter.category_id)
        .bind(filter.status)
        .bind(filter.flow)
        .bind(filter.search_text)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }

    async fn get_categories(&self, filter: CategoryFilter) -> Result<Vec<Category>, GatewayError> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, owner_id, name, color, flow
            FROM categories
            WHERE owner_id = $1 AND ($2::flow IS NULL OR flow = $2)
            ORDER BY name
            "#,
        )
        .bind(filter.owner_id)
        .bind(filter.flow)
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    async fn upsert_category(&self, category: Category) -> Result<Uuid, GatewayError> {
        let id = sqlx::query_scalar(
            r#"
            INSERT INTO categories (id, owner_id, name, color, flow)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name, color = EXCLUDED.color, flow = EXCLUDED.flow
            RETURNING id
            "#,
        )
        .bind(category.id)
        .bind(category.owner_id)
        .bind(category.name)
        .bind(category.color)
        .bind(category.flow)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn delete_category(&self, category_id: Uuid) -> Result<(), GatewayError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(category_id)
            .execute(&self.pool)
            .await?;

        not_found("category", category_id, result.rows_affected())
    }

    async fn query_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>, GatewayError> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, owner_id, title, description, date, time, priority, status
            FROM tasks
            WHERE owner_id = $1
              AND status <> 'completed'
              AND ($2::text IS NULL OR title ILIKE '%' || $2 || '%')
              AND ($3::task_priority IS NULL OR priority = $3)
              AND ($4::date IS NULL OR date = $4)
            ORDER BY date, time NULLS LAST
            "#,
        )
        .bind(filter.owner_id)
        .bind(filter.search_text)
        .bind(filter.priority)
        .bind(filter.date)
        .fetch_all(&self.pool)
        .await?;

        Ok(tasks)
    }

    async fn get_task(&self, owner_id: Uuid, task_id: Uuid) -> Result<Option<Task>, GatewayError> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, owner_id, title, description, date, time, priority, status
            FROM tasks
            WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(task_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    async fn upsert_task(&self, task: Task) -> Result<Uuid, GatewayError> {
        let id = sqlx::query_scalar(
            r#"
            INSERT INTO tasks (id, owner_id, title, description, date, time, priority, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE
            SET title = EXCLUDED.title,
                description = EXCLUDED.description,
                date = EXCLUDED.date,
                time = EXCLUDED.time,
                priority = EXCLUDED.priority,
                status = EXCLUDED.status
            RETURNING id
            "#,
        )
        .bind(task.id)
        .bind(task.owner_id)
        .bind(task.title)
        .bind(task.description)
        .bind(task.date)
        .bind(task.time)
        .bind(task.priority)
        .bind(task.status)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn delete_task(&self, task_id: Uuid) -> Result<(), GatewayError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(task_id)
            .execute(&self.pool)
            .await?;

        not_found("task", task_id, result.rows_affected())
    }
}

impl AtomicTransfer for PgGateway {
    async fn post_transfer_atomically(
        &self,
        posting: &TransferPosting,
    ) -> Result<PostedLegs, GatewayError> {
        let mut tx = self.pool.begin().await?;

        // Lock both rows in id order so two opposite transfers cannot deadlock.
        let locked: Vec<(Uuid, Decimal)> = sqlx::query_as(
            "SELECT id, balance FROM bank_accounts WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(vec![posting.origin_id, posting.destination_id])
        .fetch_all(&mut *tx)
        .await?;

        let origin_balance = locked
            .iter()
            .find(|(id, _)| *id == posting.origin_id)
            .map(|(_, balance)| *balance)
            .ok_or(GatewayError::NotFound {
                entity: "account",
                id: posting.origin_id,
            })?;

        if !locked.iter().any(|(id, _)| *id == posting.destination_id) {
            tx.rollback().await?;
            return Err(GatewayError::NotFound {
                entity: "account",
                id: posting.destination_id,
            });
        }

        if origin_balance < posting.amount {
            tx.rollback().await?;
            return Err(GatewayError::Rejected("insufficient funds".to_string()));
        }

        let debit_id = insert_one(&mut *tx, &posting.debit).await?;
        let credit_id = insert_one(&mut *tx, &posting.credit).await?;

        sqlx::query("UPDATE bank_accounts SET balance = balance - $1 WHERE id = $2")
            .bind(posting.amount)
            .bind(posting.origin_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE bank_accounts SET balance = balance + $1 WHERE id = $2")
            .bind(posting.amount)
            .bind(posting.destination_id)
            .execute(&mut *tx)
            .await?;

        // Commit all four writes at once; dropping `tx` on any error above rolls back.
        tx.commit().await?;

        Ok(PostedLegs {
            debit_id,
            credit_id,
        })
    }
}
