/*
 * Responsibility
 * - SQLx operations on the users table
 * - deleting a user removes its todos in the same transaction
 */
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::repos::error::{RepoError, RepoResult};

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub hashed_password: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct UserRepo {
    pool: SqlitePool,
}

impl UserRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // Username uniqueness is checked by the caller first; a lost race still lands here as Conflict.
    pub async fn create(&self, username: &str, hashed_password: &str) -> RepoResult<UserRow> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (username, hashed_password, created_at)
            VALUES (?, ?, ?)
            RETURNING id, username, hashed_password, created_at
            "#,
        )
        .bind(username)
        .bind(hashed_password)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)?;

        Ok(row)
    }

    pub async fn find_by_username(&self, username: &str) -> RepoResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, hashed_password, created_at
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get(&self, user_id: i64) -> RepoResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, hashed_password, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn update_password_hash(
        &self,
        user_id: i64,
        hashed_password: &str,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET hashed_password = ?
            WHERE id = ?
            "#,
        )
        .bind(hashed_password)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a user and every todo it owns, all-or-nothing.
    ///
    /// The FK also cascades; deleting the todos explicitly keeps the guarantee
    /// independent of the connection's `foreign_keys` pragma.
    pub async fn delete(&self, user_id: i64) -> RepoResult<bool> {
        let mut tx = self.pool.begin().await?;

        let todos = sqlx::query("DELETE FROM todos WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let users = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(
            user_id,
            todos_deleted = todos.rows_affected(),
            "deleted user"
        );

        Ok(users.rows_affected() > 0)
    }
}
