//! Liveness and database check.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    error::AppError, gateway::Gateway, services::transfer_service::TransferMode,
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    /// How transfers are posted on this instance
    pub transfer_mode: TransferMode,
    pub timestamp: DateTime<Utc>,
}

/// `GET /health`, no authentication.
///
/// ```json
/// {
///   "status": "healthy",
///   "database": "connected",
///   "transfer_mode": "sequential",
///   "timestamp": "2024-03-10T12:00:00Z"
/// }
/// ```
///
/// An unreachable database surfaces as the usual 500 error body.
pub async fn health_check<G: Gateway>(
    State(state): State<AppState<G>>,
) -> Result<Json<HealthResponse>, AppError> {
    state.gateway.ping().await?;

    Ok(Json(HealthResponse {
        status: "healthy",
        database: "connected",
        transfer_mode: state.transfer_mode,
        timestamp: Utc::now(),
    }))
}
