//! Transfer HTTP handler.

use axum::{Extension, Json, extract::State};

use crate::{
    error::AppError,
    gateway::AtomicTransfer,
    models::{session::Session, transfer::TransferRequest},
    services::transfer_service::{self, TransferReceipt},
    state::AppState,
};

/// Move money between two accounts of the authenticated owner.
///
/// # Endpoint
///
/// `POST /api/v1/transfers`
///
/// # Request Body
///
/// ```json
/// {
///   "origin_id": "550e8400-...",
///   "destination_id": "660e8400-...",
///   "amount": "300,00",
///   "date": "2024-03-10",
///   "note": "Savings"
/// }
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: receipt with both transaction ids and refreshed accounts
/// - **Error (422)**: `invalid_accounts`, `invalid_amount` or `insufficient_funds`;
///   nothing was written
/// - **Error (500)**: `transfer_partially_applied`; the message names the step
///   that failed, and earlier steps stay applied
///
/// ```json
/// {
///   "state": "settled",
///   "debit_transaction_id": "770e8400-...",
///   "credit_transaction_id": "880e8400-...",
///   "amount": "300.00",
///   "amount_display": "R$ 300,00",
///   "date": "2024-03-10",
///   "origin": { "id": "550e8400-...", "balance": "700.00", "...": "..." },
///   "destination": { "id": "660e8400-...", "balance": "500.00", "...": "..." }
/// }
/// ```
pub async fn create_transfer<G: AtomicTransfer>(
    State(state): State<AppState<G>>,
    Extension(session): Extension<Session>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<TransferReceipt>, AppError> {
    let receipt = transfer_service::submit(
        &state.gateway,
        &session,
        request.into(),
        state.transfer_mode,
    )
    .await?;

    Ok(Json(receipt))
}
