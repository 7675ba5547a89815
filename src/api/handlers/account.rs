/*
 * Responsibility
 * - GET/POST /change-password for the signed-in user
 * - success redirects back to the form (post/redirect/get)
 */
use axum::{Form, Json, extract::State, response::Redirect};
use serde_json::{Value, json};
use tracing::info;

use crate::{
    api::{dto::auth::ChangePasswordForm, extractors::AuthUser},
    error::AppError,
    state::AppState,
};

pub const CHANGE_PASSWORD_PATH: &str = "/change-password";

pub async fn change_password_page(AuthUser(identity): AuthUser) -> Json<Value> {
    Json(json!({
        "form": "change-password",
        "user": identity.username,
        "fields": ["old_password", "new_password", "confirm_password"],
    }))
}

pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Form(form): Form<ChangePasswordForm>,
) -> Result<Redirect, AppError> {
    let user = state
        .users
        .get(identity.id)
        .await?
        .ok_or(AppError::not_found("user"))?;

    let old_matches = state
        .passwords
        .verify_blocking(form.old_password.clone(), user.hashed_password)
        .await?;
    if !old_matches {
        return Err(AppError::validation("Current password is incorrect"));
    }

    form.validate().map_err(AppError::validation)?;

    let hashed = state.passwords.hash_blocking(form.new_password).await?;
    if !state.users.update_password_hash(identity.id, &hashed).await? {
        return Err(AppError::not_found("user"));
    }

    // Tokens are stateless: sessions issued before the change stay valid until they expire.
    info!(user_id = identity.id, "password changed");
    Ok(Redirect::to(CHANGE_PASSWORD_PATH))
}
