use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::Redirect;

use crate::middleware::auth::session::LOGIN_PATH;
use crate::services::auth::Identity;
use crate::state::AppState;

/// Extractor handing the session identity to a handler.
///
/// The session guard inserts `Identity` into the request extensions. If it is
/// missing (route not behind the guard) the caller is sent to the login page,
/// same as an anonymous request.
pub struct AuthUser(pub Identity);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Redirect;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| Redirect::to(LOGIN_PATH))
    }
}
