/*
 * Responsibility
 * - todo list query / form bodies and JSON responses
 * - the owner id is never part of a request DTO
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::repos::task_repo::{TaskCounts, TaskFilter, TaskRow};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub filter: TaskFilter,
}

#[derive(Debug, Deserialize)]
pub struct TaskForm {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<TaskRow> for TaskResponse {
    fn from(row: TaskRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            completed: row.completed,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub user: String,
    pub filter: TaskFilter,
    pub todos: Vec<TaskResponse>,
    pub total_count: i64,
    pub pending_count: i64,
    pub completed_count: i64,
}

impl TaskListResponse {
    pub fn new(user: String, filter: TaskFilter, rows: Vec<TaskRow>, counts: TaskCounts) -> Self {
        Self {
            user,
            filter,
            todos: rows.into_iter().map(TaskResponse::from).collect(),
            total_count: counts.total,
            pending_count: counts.pending,
            completed_count: counts.completed,
        }
    }
}
