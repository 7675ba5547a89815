/*
 * Responsibility
 * - todos CRUD, always scoped by owner (user_id)
 * - ownership is part of the WHERE clause of the single statement that reads
 *   or mutates a row; a row owned by someone else looks exactly like a
 *   missing row
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use crate::repos::error::{RepoError, RepoResult};

#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub user_id: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskFilter {
    #[default]
    All,
    Pending,
    Completed,
}

impl TaskFilter {
    fn completed(self) -> Option<bool> {
        match self {
            TaskFilter::All => None,
            TaskFilter::Pending => Some(false),
            TaskFilter::Completed => Some(true),
        }
    }
}

/// Counters over every todo of an owner, whatever filter is being viewed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskCounts {
    pub total: i64,
    pub pending: i64,
    pub completed: i64,
}

#[derive(Clone, Debug)]
pub struct TaskRepo {
    pool: SqlitePool,
}

impl TaskRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Newest first; ties (same timestamp) fall back to the id.
    pub async fn list(&self, owner_id: i64, filter: TaskFilter) -> RepoResult<Vec<TaskRow>> {
        let completed = filter.completed();

        let rows = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT id, title, description, completed, created_at, user_id
            FROM todos
            WHERE user_id = ?
                AND (? IS NULL OR completed = ?)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(owner_id)
        .bind(completed)
        .bind(completed)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn counts(&self, owner_id: i64) -> RepoResult<TaskCounts> {
        let (total, completed) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN completed THEN 1 ELSE 0 END), 0)
            FROM todos
            WHERE user_id = ?
            "#,
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(TaskCounts {
            total,
            pending: total - completed,
            completed,
        })
    }

    pub async fn create(
        &self,
        owner_id: i64,
        title: &str,
        description: Option<&str>,
    ) -> RepoResult<TaskRow> {
        let title = title.trim();
        if title.is_empty() {
            return Err(RepoError::Invalid("title is required"));
        }
        let description = description.map(str::trim).filter(|d| !d.is_empty());

        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            INSERT INTO todos (title, description, completed, created_at, user_id)
            VALUES (?, ?, 0, ?, ?)
            RETURNING id, title, description, completed, created_at, user_id
            "#,
        )
        .bind(title)
        .bind(description)
        .bind(Utc::now())
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn toggle_completion(
        &self,
        owner_id: i64,
        task_id: i64,
    ) -> RepoResult<Option<TaskRow>> {
        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            UPDATE todos
            SET completed = NOT completed
            WHERE id = ? AND user_id = ?
            RETURNING id, title, description, completed, created_at, user_id
            "#,
        )
        .bind(task_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn update(
        &self,
        owner_id: i64,
        task_id: i64,
        title: &str,
        description: Option<&str>,
    ) -> RepoResult<Option<TaskRow>> {
        let title = title.trim();
        if title.is_empty() {
            return Err(RepoError::Invalid("title is required"));
        }
        let description = description.map(str::trim).filter(|d| !d.is_empty());

        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            UPDATE todos
            SET title = ?, description = ?
            WHERE id = ? AND user_id = ?
            RETURNING id, title, description, completed, created_at, user_id
            "#,
        )
        .bind(title)
        .bind(description)
        .bind(task_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn delete(&self, owner_id: i64, task_id: i64) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM todos
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(task_id)
        .bind(owner_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_all_completed(&self, owner_id: i64) -> RepoResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM todos
            WHERE user_id = ? AND completed = 1
            "#,
        )
        .bind(owner_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
