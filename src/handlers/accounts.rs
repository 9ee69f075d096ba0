//! Account management HTTP handlers.
//!
//! This module implements the account-related API endpoints:
//! - POST /api/v1/accounts - Create new account
//! - GET /api/v1/accounts - List all accounts of the authenticated owner

use axum::{Extension, Json, extract::State, http::StatusCode};

use crate::{
    error::AppError,
    gateway::Gateway,
    models::{
        account::{AccountResponse, CreateAccountRequest},
        session::Session,
    },
    services::account_service,
    state::AppState,
};

/// Create a new account.
///
/// # Endpoint
///
/// `POST /api/v1/accounts`
///
/// # Request Body
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
/// # Response
///
/// - **Success (201 Created)**: Returns the created account
/// - **Error (400)**: Empty name
/// - **Error (401)**: Invalid API key
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
pub async fn create_account<G: Gateway>(
    State(state): State<AppState<G>>,
    Extension(session): Extension<Session>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), AppError> {
    let account = account_service::create_account(&state.gateway, &session, request.into()).await?;

    Ok((StatusCode::CREATED, Json(account.into())))
}

/// List all accounts of the authenticated owner, ordered by name.
///
/// # Endpoint
///
/// `GET /api/v1/accounts`
pub async fn list_accounts<G: Gateway>(
    State(state): State<AppState<G>>,
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<AccountResponse>>, AppError> {
    let accounts = account_service::list_accounts(&state.gateway, &session).await?;

    // Convert each Account to AccountResponse
    Ok(Json(accounts.into_iter().map(Into::into).collect()))
}
