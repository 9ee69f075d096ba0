//! Change notification feed.
//!
//! Database triggers call `pg_notify('table_changes', <table name>)` after
//! every write statement. A background task forwards those notifications into
//! a broadcast channel; request handlers subscribe to the tables they care
//! about and tell clients to re-fetch. No business logic runs here.
//!
//! Events name a table only, not the owner whose rows changed: every
//! subscriber wakes on every owner's writes to its tables. The re-fetch that
//! follows is owner-scoped, so a foreign write costs one redundant query and
//! reveals nothing beyond the table name.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgListener;
use tokio::{sync::broadcast, task::JoinHandle};

use crate::db::DbPool;

/// Postgres notification channel used by the migration triggers.
pub const CHANNEL: &str = "table_changes";

/// Tables that publish change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    BankAccounts,
    Transactions,
    Categories,
    Tasks,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::BankAccounts => "bank_accounts",
            Table::Transactions => "transactions",
            Table::Categories => "categories",
            Table::Tasks => "tasks",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "bank_accounts" => Some(Table::BankAccounts),
            "transactions" => Some(Table::Transactions),
            "categories" => Some(Table::Categories),
            "tasks" => Some(Table::Tasks),
            _ => None,
        }
    }
}

/// A write happened on `table`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub table: Table,
}

/// Fan-out point for change events.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a change. Having no subscribers is not an error.
    pub fn publish(&self, table: Table) {
        tracing::trace!(table = table.name(), "Table changed");
        let _ = self.sender.send(ChangeEvent { table });
    }

    /// Subscribe to changes of `tables` (all tables when empty).
    pub fn subscribe(&self, tables: Vec<Table>) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            tables,
        }
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Handle delivering change events for a set of tables.
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<ChangeEvent>,
    tables: Vec<Table>,
}

impl Subscription {
    fn wants(&self, table: Table) -> bool {
        self.tables.is_empty() || self.tables.contains(&table)
    }

    /// Wait for the next relevant change. `None` once the feed is gone.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.wants(event.table) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Change subscription lagged behind");
                    // Missed events may include a relevant one; report a change so the caller re-fetches.
                    let table = self.tables.first().copied().unwrap_or(Table::Transactions);
                    return Some(ChangeEvent { table });
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Forward Postgres notifications on [`CHANNEL`] into `feed`.
///
/// `PgListener` reconnects on its own after a dropped connection; errors are
/// logged and the loop keeps going.
pub async fn spawn_pg_bridge(pool: &DbPool, feed: ChangeFeed) -> Result<JoinHandle<()>, sqlx::Error> {
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(CHANNEL).await?;

    Ok(tokio::spawn(async move {
        loop {
            match listener.recv().await {
                Ok(notification) => match Table::from_name(notification.payload()) {
                    Some(table) => feed.publish(table),
                    None => tracing::debug!(
                        payload = notification.payload(),
                        "Ignoring notification for unknown table"
                    ),
                },
                Err(e) => {
                    tracing::error!("Change listener error: {e}");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }))
}
