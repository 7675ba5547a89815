/*
 * Responsibility
 * - shared context handed to every handler (AppState)
 * - built once at startup; Clone is cheap (pool handle + Arc)
 */
use std::sync::Arc;

use sqlx::SqlitePool;

use crate::middleware::auth::cookie::SessionCookie;
use crate::repos::{task_repo::TaskRepo, user_repo::UserRepo};
use crate::services::auth::{PasswordHasher, SessionResolver, TokenService};

#[derive(Clone, Debug)]
pub struct AppState {
    pub users: UserRepo,
    pub tasks: TaskRepo,
    pub tokens: Arc<TokenService>,
    pub sessions: SessionResolver,
    pub passwords: PasswordHasher,
    pub cookie: SessionCookie,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        tokens: Arc<TokenService>,
        passwords: PasswordHasher,
        cookie: SessionCookie,
    ) -> Self {
        let users = UserRepo::new(db.clone());
        let sessions = SessionResolver::new(tokens.clone(), Arc::new(users.clone()));

        Self {
            users,
            tasks: TaskRepo::new(db),
            tokens,
            sessions,
            passwords,
            cookie,
        }
    }
}
