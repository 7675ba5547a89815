/*
 * Responsibility
 * - todo list and mutations for the signed-in user
 * - the owner id always comes from AuthUser, never from the request
 * - a todo of another user answers 404, exactly like a missing one
 */
use axum::{
    Form, Json,
    extract::{Path, Query, State},
    http::{HeaderMap, header},
    response::Redirect,
};
use tracing::info;
use url::Url;

use crate::{
    api::{
        dto::todos::{ListQuery, TaskForm, TaskListResponse},
        extractors::AuthUser,
    },
    error::AppError,
    state::AppState,
};

pub async fn index(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<TaskListResponse>, AppError> {
    let rows = state.tasks.list(identity.id, query.filter).await?;
    let counts = state.tasks.counts(identity.id).await?;

    Ok(Json(TaskListResponse::new(
        identity.username,
        query.filter,
        rows,
        counts,
    )))
}

pub async fn add_todo(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Form(form): Form<TaskForm>,
) -> Result<Redirect, AppError> {
    if form.title.trim().is_empty() {
        info!(user_id = identity.id, "todo with empty title ignored");
        return Ok(Redirect::to("/"));
    }

    let task = state
        .tasks
        .create(identity.id, &form.title, form.description.as_deref())
        .await?;

    info!(user_id = identity.id, todo_id = task.id, "todo added");
    Ok(Redirect::to("/?filter=pending"))
}

pub async fn edit_todo(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(todo_id): Path<i64>,
    headers: HeaderMap,
    Form(form): Form<TaskForm>,
) -> Result<Redirect, AppError> {
    if form.title.trim().is_empty() {
        return Err(AppError::validation("Title cannot be empty"));
    }

    state
        .tasks
        .update(identity.id, todo_id, &form.title, form.description.as_deref())
        .await?
        .ok_or(AppError::not_found("todo"))?;

    info!(user_id = identity.id, todo_id, "todo edited");
    Ok(Redirect::to(&referrer_path(&headers)))
}

pub async fn toggle_todo(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(todo_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Redirect, AppError> {
    let task = state
        .tasks
        .toggle_completion(identity.id, todo_id)
        .await?
        .ok_or(AppError::not_found("todo"))?;

    info!(
        user_id = identity.id,
        todo_id,
        completed = task.completed,
        "todo toggled"
    );
    Ok(Redirect::to(&referrer_path(&headers)))
}

pub async fn delete_todo(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(todo_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Redirect, AppError> {
    if !state.tasks.delete(identity.id, todo_id).await? {
        return Err(AppError::not_found("todo"));
    }

    info!(user_id = identity.id, todo_id, "todo deleted");
    Ok(Redirect::to(&referrer_path(&headers)))
}

pub async fn delete_all_completed(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Redirect, AppError> {
    let deleted = state.tasks.delete_all_completed(identity.id).await?;

    info!(user_id = identity.id, deleted, "completed todos cleared");
    Ok(Redirect::to("/"))
}

/// Path + query of the `Referer`, so the redirect stays on this site.
fn referrer_path(headers: &HeaderMap) -> String {
    let Some(referer) = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
    else {
        return "/".to_string();
    };

    if referer.starts_with('/') {
        // "//host" and "/\host" are protocol-relative in browsers
        if referer.starts_with("//") || referer.contains('\\') {
            return "/".to_string();
        }
        return referer.to_string();
    }

    match Url::parse(referer) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        },
        _ => "/".to_string(),
    }
}
