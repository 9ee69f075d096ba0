//! Agenda task models.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

/// Represents a task record from the database.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct Task {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
}

/// Request body for creating or editing a task.
///
/// ```json
/// { "title": "Pay rent", "date": "2024-02-05", "time": "09:00:00", "priority": "high" }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct TaskRequest {
    pub title: String,

    #[serde(default)]
    pub description: String,

    pub date: NaiveDate,

    pub time: Option<NaiveTime>,

    #[serde(default)]
    pub priority: TaskPriority,
}

/// Query string for the agenda listing.
///
/// Completed tasks are never listed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskQuery {
    pub q: Option<String>,
    pub priority: Option<TaskPriority>,
    pub date: Option<NaiveDate>,
}
