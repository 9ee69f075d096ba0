//! Category HTTP handlers.

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
        category::{Category, CategoryQuery, CategoryRequest},
        session::Session,
    },
    services::category_service,
    state::AppState,
};

/// `GET /api/v1/categories?flow=outflow`
pub async fn list_categories<G: Gateway>(
    State(state): State<AppState<G>>,
    Extension(session): Extension<Session>,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<Vec<Category>>, AppError> {
    let categories =
        category_service::list_categories(&state.gateway, &session, query.flow).await?;

    Ok(Json(categories))
}

/// Create a category.
///
/// # Endpoint
///
/// `POST /api/v1/categories`
///
/// ```json
/// { "name": "Food", "color": "#ff5252", "flow": "outflow" }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**
/// - **Error (409)**: `duplicate_category` when the name exists in any letter case
pub async fn create_category<G: Gateway>(
    State(state): State<AppState<G>>,
    Extension(session): Extension<Session>,
    Json(request): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    let category = category_service::create_category(&state.gateway, &session, request).await?;

    Ok((StatusCode::CREATED, Json(category)))
}

/// `PUT /api/v1/categories/{id}`
pub async fn update_category<G: Gateway>(
    State(state): State<AppState<G>>,
    Extension(session): Extension<Session>,
    Path(category_id): Path<Uuid>,
    Json(request): Json<CategoryRequest>,
) -> Result<Json<Category>, AppError> {
    let category =
        category_service::update_category(&state.gateway, &session, category_id, request).await?;

    Ok(Json(category))
}

/// Delete a category.
///
/// # Endpoint
///
/// `DELETE /api/v1/categories/{id}`
///
/// # Response
///
/// - **Success (204 No Content)**
/// - **Error (409)**: `category_in_use`; the message says how many
///   transactions reference the category
pub async fn delete_category<G: Gateway>(
    State(state): State<AppState<G>>,
    Extension(session): Extension<Session>,
    Path(category_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    category_service::delete_category(&state.gateway, &session, category_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
