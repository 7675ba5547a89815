//! Session cookie -> Identity, or a redirect to the login page.
//!
//! Applied to the protected sub-router only. Unauthenticated access is not an
//! error here: the caller gets `303 See Other` to `/login` and can come back
//! after signing in.

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
};

use crate::error::AppError;
use crate::middleware::auth::cookie::{self, SESSION_COOKIE};
use crate::services::auth::Session;
use crate::state::AppState;

pub const LOGIN_PATH: &str = "/login";

/// Put the session guard in front of every route of `router`.
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // route_layer: unknown paths still 404 instead of bouncing to /login
    router.route_layer(middleware::from_fn_with_state(state, require_session))
}

async fn require_session(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let session = {
        let token = cookie::read(req.headers(), SESSION_COOKIE);
        state.sessions.resolve(token.as_deref()).await?
    };

    match session {
        Session::Anonymous => {
            tracing::debug!(path = %req.uri().path(), "no valid session, redirecting to login");
            Ok(Redirect::to(LOGIN_PATH).into_response())
        }
        Session::Authenticated(identity) => {
            tracing::debug!(user_id = identity.id, "session resolved");
            // middleware -> extractor hand-off
            req.extensions_mut().insert(identity);
            Ok(next.run(req).await)
        }
    }
}
