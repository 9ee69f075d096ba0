//! Change long-poll.
//!
//! Clients call this endpoint in a loop and re-fetch whatever table the
//! returned event names. The handler only waits on the change feed.

use std::time::Duration;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{error::AppError, gateway::Gateway, notify::Table, state::AppState};

#[derive(Debug, Default, Deserialize)]
pub struct ChangesQuery {
    /// Comma-separated table names; all tables when absent
    pub tables: Option<String>,
    pub timeout_secs: Option<u64>,
}

fn parse_tables(tables: Option<&str>) -> Result<Vec<Table>, AppError> {
    let Some(tables) = tables else {
        return Ok(Vec::new());
    };

    tables
        .split(',')
        .filter(|name| !name.trim().is_empty())
        .map(|name| {
            Table::from_name(name).ok_or_else(|| {
                AppError::InvalidRequest(format!("unknown table \"{}\"", name.trim()))
            })
        })
        .collect()
}

/// Wait for the next change.
///
/// # Endpoint
///
/// `GET /api/v1/changes/next?tables=bank_accounts,transactions&timeout_secs=25`
///
/// # Response
///
/// - **200 OK**: `{ "table": "transactions" }`
/// - **204 No Content**: nothing changed before the timeout
///
/// The timeout is capped by `CHANGE_POLL_MAX_SECS`.
pub async fn next_change<G: Gateway>(
    State(state): State<AppState<G>>,
    Query(query): Query<ChangesQuery>,
) -> Result<Response, AppError> {
    let tables = parse_tables(query.tables.as_deref())?;
    let timeout = query
        .timeout_secs
        .map(Duration::from_secs)
        .map_or(state.change_poll_max, |requested| {
            requested.min(state.change_poll_max)
        });

    let mut subscription = state.feed.subscribe(tables);

    match tokio::time::timeout(timeout, subscription.next()).await {
        Ok(Some(event)) => Ok(Json(event).into_response()),
        Ok(None) | Err(_) => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}
