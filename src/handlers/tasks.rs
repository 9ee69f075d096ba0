//! Agenda HTTP handlers.

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
        task::{Task, TaskQuery, TaskRequest},
    },
    services::task_service,
    state::AppState,
};

/// Open tasks, ordered by date and time.
///
/// `GET /api/v1/tasks?q=rent&priority=high&date=2024-02-05`
pub async fn list_tasks<G: Gateway>(
    State(state): State<AppState<G>>,
    Extension(session): Extension<Session>,
    Query(query): Query<TaskQuery>,
) -> Result<Json<Vec<Task>>, AppError> {
    Ok(Json(
        task_service::list_tasks(&state.gateway, &session, query).await?,
    ))
}

/// `POST /api/v1/tasks`
pub async fn create_task<G: Gateway>(
    State(state): State<AppState<G>>,
    Extension(session): Extension<Session>,
    Json(request): Json<TaskRequest>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    let task = task_service::create_task(&state.gateway, &session, request).await?;

    Ok((StatusCode::CREATED, Json(task)))
}

/// `PUT /api/v1/tasks/{id}`
pub async fn update_task<G: Gateway>(
    State(state): State<AppState<G>>,
    Extension(session): Extension<Session>,
    Path(task_id): Path<Uuid>,
    Json(request): Json<TaskRequest>,
) -> Result<Json<Task>, AppError> {
    let task = task_service::update_task(&state.gateway, &session, task_id, request).await?;

    Ok(Json(task))
}

/// `POST /api/v1/tasks/{id}/complete`
pub async fn complete_task<G: Gateway>(
    State(state): State<AppState<G>>,
    Extension(session): Extension<Session>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<Task>, AppError> {
    let task = task_service::complete_task(&state.gateway, &session, task_id).await?;

    Ok(Json(task))
}

/// `DELETE /api/v1/tasks/{id}`
pub async fn delete_task<G: Gateway>(
    State(state): State<AppState<G>>,
    Extension(session): Extension<Session>,
    Path(task_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    task_service::delete_task(&state.gateway, &session, task_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
