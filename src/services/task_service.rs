//! Agenda tasks.
//!
//! Completed tasks drop out of the listing but are kept in storage.

use uuid::Uuid;

use crate::{
    error::AppError,
    gateway::{Gateway, TaskFilter},
    models::{
        session::Session,
        task::{Task, TaskQuery, TaskRequest, TaskStatus},
    },
};

pub async fn list_tasks<G: Gateway>(
    gateway: &G,
    session: &Session,
    query: TaskQuery,
) -> Result<Vec<Task>, AppError> {
    let filter = TaskFilter {
        owner_id: session.owner_id,
        search_text: query.q.filter(|q| !q.trim().is_empty()),
        priority: query.priority,
        date: query.date,
    };
    Ok(gateway.query_tasks(filter).await?)
}

fn validated_title(request: &TaskRequest) -> Result<String, AppError> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Task title is required".to_string()));
    }
    Ok(title.to_string())
}

async fn owned<G: Gateway>(
    gateway: &G,
    session: &Session,
    task_id: Uuid,
) -> Result<Task, AppError> {
    gateway
        .get_task(session.owner_id, task_id)
        .await?
        .ok_or(AppError::NotFound("task"))
}

pub async fn create_task<G: Gateway>(
    gateway: &G,
    session: &Session,
    request: TaskRequest,
) -> Result<Task, AppError> {
    let task = Task {
        id: Uuid::new_v4(),
        owner_id: session.owner_id,
        title: validated_title(&request)?,
        description: request.description,
        date: request.date,
        time: request.time,
        priority: request.priority,
        status: TaskStatus::Pending,
    };
    gateway.upsert_task(task.clone()).await?;

    Ok(task)
}

/// Replace the editable fields of a task; its status is kept.
pub async fn update_task<G: Gateway>(
    gateway: &G,
    session: &Session,
    task_id: Uuid,
    request: TaskRequest,
) -> Result<Task, AppError> {
    let current = owned(gateway, session, task_id).await?;

    let task = Task {
        title: validated_title(&request)?,
        description: request.description,
        date: request.date,
        time: request.time,
        priority: request.priority,
        ..current
    };
    gateway.upsert_task(task.clone()).await?;

    Ok(task)
}

pub async fn complete_task<G: Gateway>(
    gateway: &G,
    session: &Session,
    task_id: Uuid,
) -> Result<Task, AppError> {
    let task = Task {
        status: TaskStatus::Completed,
        ..owned(gateway, session, task_id).await?
    };
    gateway.upsert_task(task.clone()).await?;

    Ok(task)
}

pub async fn delete_task<G: Gateway>(
    gateway: &G,
    session: &Session,
    task_id: Uuid,
) -> Result<(), AppError> {
    owned(gateway, session, task_id).await?;
    gateway.delete_task(task_id).await?;

    Ok(())
}
