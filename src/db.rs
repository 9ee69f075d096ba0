//! Postgres pool and embedded migrations.
//!
//! The migration creates the ledger tables, the triggers that apply settled
//! amounts to account balances, and the `pg_notify` triggers behind the
//! change feed.

use std::time::Duration;

use sqlx::{Pool, Postgres, postgres::PgPoolOptions};

pub type DbPool = Pool<Postgres>;

/// Open the connection pool.
///
/// The change listener holds one extra dedicated connection outside the
/// `max_connections` limit.
///
/// # Errors
///
/// Fails when the URL is invalid or the server cannot be reached or
/// rejects the credentials.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

/// Apply pending migrations from `migrations/`.
///
/// Applied versions are recorded in `_sqlx_migrations`, so restarts are
/// no-ops.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    // Embedded at compile time
    sqlx::migrate!("./migrations").run(pool).await
}
