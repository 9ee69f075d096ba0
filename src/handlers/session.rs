//! Session endpoints: who is calling and which theme they use.

use axum::{Extension, Json, extract::State};

use crate::{
    error::AppError,
    gateway::Gateway,
    models::session::{Session, ThemeRequest},
    state::AppState,
};

/// `GET /api/v1/session`
pub async fn get_session(Extension(session): Extension<Session>) -> Json<Session> {
    Json(session)
}

/// Change the display theme.
///
/// # Endpoint
///
/// `PUT /api/v1/session/theme`
///
/// ```json
/// { "theme": "dark" }
/// ```
pub async fn update_theme<G: Gateway>(
    State(state): State<AppState<G>>,
    Extension(session): Extension<Session>,
    Json(request): Json<ThemeRequest>,
) -> Result<Json<Session>, AppError> {
    state
        .gateway
        .set_theme(session.owner_id, request.theme)
        .await?;

    Ok(Json(Session {
        theme: request.theme,
        ..session
    }))
}
