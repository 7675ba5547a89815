/*
 * Responsibility
 * - register / login / logout
 * - login issues the session token as a cookie; logout expires it
 */
use axum::{
    Form, Json,
    extract::State,
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde_json::{Value, json};
use tracing::info;

use crate::{
    api::dto::auth::{LoginForm, RegisterForm},
    error::AppError,
    middleware::auth::session::LOGIN_PATH,
    repos::error::RepoError,
    state::AppState,
};

fn username_taken() -> AppError {
    AppError::bad_request("USERNAME_TAKEN", "Username already exists")
}

pub async fn register_page() -> Json<Value> {
    Json(json!({"form": "register", "fields": ["username", "password"]}))
}

pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Redirect, AppError> {
    form.validate().map_err(AppError::validation)?;

    if state.users.find_by_username(&form.username).await?.is_some() {
        return Err(username_taken());
    }

    let hashed = state.passwords.hash_blocking(form.password).await?;

    let user = match state.users.create(&form.username, &hashed).await {
        Ok(user) => user,
        // lost a race with a concurrent registration
        Err(RepoError::Conflict) => return Err(username_taken()),
        Err(e) => return Err(e.into()),
    };

    info!(user_id = user.id, "user registered");
    Ok(Redirect::to(LOGIN_PATH))
}

pub async fn login_page() -> Json<Value> {
    Json(json!({"form": "login", "fields": ["username", "password"]}))
}

pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let Some(user) = state.users.find_by_username(&form.username).await? else {
        info!("login rejected: unknown username");
        return Err(AppError::invalid_credentials());
    };

    let matches = state
        .passwords
        .verify_blocking(form.password, user.hashed_password)
        .await?;
    if !matches {
        info!(user_id = user.id, "login rejected: wrong password");
        return Err(AppError::invalid_credentials());
    }

    let token = state
        .tokens
        .issue(&user.username, state.cookie.ttl_minutes())?;

    info!(user_id = user.id, "user logged in");
    Ok((
        AppendHeaders([(SET_COOKIE, state.cookie.issue(&token))]),
        Redirect::to("/"),
    )
        .into_response())
}

pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        AppendHeaders([(SET_COOKIE, state.cookie.clear())]),
        Redirect::to(LOGIN_PATH),
    )
}
