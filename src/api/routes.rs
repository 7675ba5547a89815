/*
 * Responsibility
 * - URL structure of the app
 * - public routes (health, register, login, logout) vs. routes behind the session guard
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::handlers::{
    account::{CHANGE_PASSWORD_PATH, change_password, change_password_page},
    auth::{login, login_page, logout, register, register_page},
    health::health,
    todos::{add_todo, delete_all_completed, delete_todo, edit_todo, index, toggle_todo},
};
use crate::middleware;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/", get(index))
        .route("/add_todo", post(add_todo))
        .route("/edit_todo/{todo_id}", post(edit_todo))
        .route("/toggle_todo/{todo_id}", post(toggle_todo))
        .route("/delete_todo/{todo_id}", post(delete_todo))
        .route("/delete_all_completed", post(delete_all_completed))
        .route(
            CHANGE_PASSWORD_PATH,
            get(change_password_page).post(change_password),
        );
    let protected = middleware::auth::session::apply(protected, state);

    Router::new()
        .route("/health", get(health))
        .route("/register", get(register_page).post(register))
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
        .merge(protected)
}
