//! API key authentication middleware.
//!
//! Only the SHA-256 hash of a key is stored, so lookups hash the presented
//! key first.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};

use crate::{error::AppError, gateway::Gateway, models::session::Session, state::AppState};

/// Hex-encoded SHA-256 of an API key, as stored in `owners.key_hash`.
pub fn hash_api_key(api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Resolve `Authorization: Bearer <key>` to the owner's [`Session`].
///
/// Handlers read the session with `Extension<Session>`. A missing header,
/// a non-Bearer scheme or an unknown or inactive key is rejected with 401
/// before the handler runs.
pub async fn auth_middleware<G: Gateway>(
    State(state): State<AppState<G>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let api_key = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or(AppError::InvalidApiKey)?;

    let session: Session = state
        .gateway
        .find_session(&hash_api_key(api_key))
        .await?
        .ok_or(AppError::InvalidApiKey)?;

    tracing::debug!(owner_id = %session.owner_id, "Request authenticated");
    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}
