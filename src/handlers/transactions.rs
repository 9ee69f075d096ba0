//! Transaction HTTP handlers.
//!
//! This module implements transaction-related API endpoints:
//! - GET /api/v1/transactions - Query entries
//! - POST /api/v1/transactions - Create a pending entry, optionally in installments
//! - POST /api/v1/transactions/settled - Create an entry paid or received now
//! - PATCH /api/v1/transactions/{id} - Edit an entry
//! - DELETE /api/v1/transactions/{id} - Delete an entry
//! - POST /api/v1/transactions/{id}/settle - Settle a pending entry

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    gateway::Gateway,
    models::{
        session::Session,
        transaction::{
            CreateEntryRequest, CreatedEntriesResponse, SettleRequest, TransactionQuery,
            TransactionResponse, UpdateEntryRequest,
        },
    },
    services::{installment_service, transaction_service},
    state::AppState,
};

/// Query the owner's entries, newest first.
///
/// # Endpoint
///
/// `GET /api/v1/transactions?start=2024-01-01&end=2024-01-31&status=pending&flow=outflow&q=rent`
///
/// Every parameter is optional.
pub async fn list_transactions<G: Gateway>(
    State(state): State<AppState<G>>,
    Extension(session): Extension<Session>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<Vec<TransactionResponse>>, AppError> {
    let transactions =
        transaction_service::list_transactions(&state.gateway, &session, query).await?;

    Ok(Json(transactions.into_iter().map(Into::into).collect()))
}

/// Create a receivable or payable.
///
/// # Endpoint
///
/// `POST /api/v1/transactions`
///
/// # Request Body
///
/// ```json
/// {
///   "description": "New laptop",
///   "amount": "3.600,00",
///   "date": "2024-01-31",
///   "flow": "outflow",
///   "installments": 3
/// }
/// ```
///
/// # Response (201)
///
/// With `installments > 1` one pending entry per month is created,
/// described as "New laptop (1/3)", "New laptop (2/3)", ...
///
/// ```json
/// { "ids": ["770e8400-...", "880e8400-...", "990e8400-..."] }
/// ```
pub async fn create_entry<G: Gateway>(
    State(state): State<AppState<G>>,
    Extension(session): Extension<Session>,
    Json(request): Json<CreateEntryRequest>,
) -> Result<(StatusCode, Json<CreatedEntriesResponse>), AppError> {
    let ids = installment_service::create_entry(&state.gateway, &session, request.into()).await?;

    Ok((StatusCode::CREATED, Json(CreatedEntriesResponse { ids })))
}

/// Create an entry and settle it immediately ("pay now" / "receive now").
///
/// # Endpoint
///
/// `POST /api/v1/transactions/settled`
///
/// Same body as [`create_entry`]; `account_id` is required.
pub async fn create_settled_entry<G: Gateway>(
    State(state): State<AppState<G>>,
    Extension(session): Extension<Session>,
    Json(request): Json<CreateEntryRequest>,
) -> Result<(StatusCode, Json<TransactionResponse>), AppError> {
    let transaction =
        installment_service::create_settled_entry(&state.gateway, &session, request.into())
            .await?;

    Ok((StatusCode::CREATED, Json(transaction.into())))
}

/// `PATCH /api/v1/transactions/{id}`
pub async fn update_transaction<G: Gateway>(
    State(state): State<AppState<G>>,
    Extension(session): Extension<Session>,
    Path(transaction_id): Path<Uuid>,
    Json(request): Json<UpdateEntryRequest>,
) -> Result<Json<TransactionResponse>, AppError> {
    let transaction =
        transaction_service::update_transaction(&state.gateway, &session, transaction_id, request)
            .await?;

    Ok(Json(transaction.into()))
}

/// `DELETE /api/v1/transactions/{id}`
pub async fn delete_transaction<G: Gateway>(
    State(state): State<AppState<G>>,
    Extension(session): Extension<Session>,
    Path(transaction_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    transaction_service::delete_transaction(&state.gateway, &session, transaction_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Settle a pending entry.
///
/// # Endpoint
///
/// `POST /api/v1/transactions/{id}/settle`
///
/// ```json
/// { "account_id": "550e8400-..." }
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: the settled entry
/// - **Error (409)**: `already_settled`
pub async fn settle_transaction<G: Gateway>(
    State(state): State<AppState<G>>,
    Extension(session): Extension<Session>,
    Path(transaction_id): Path<Uuid>,
    Json(request): Json<SettleRequest>,
) -> Result<Json<TransactionResponse>, AppError> {
    let transaction = transaction_service::settle_transaction(
        &state.gateway,
        &session,
        transaction_id,
        request.account_id,
    )
    .await?;

    Ok(Json(transaction.into()))
}
