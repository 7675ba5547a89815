use std::{future::Future, pin::Pin, sync::Arc};

use tracing::{debug, error};

use crate::repos::error::RepoResult;
use crate::repos::user_repo::UserRepo;
use crate::services::auth::token::TokenService;

/// The user a request acts as. Its `id` is the only owner key handed to repos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: i64,
    pub username: String,
}

/// Outcome of resolving a request's session token.
///
/// Missing, malformed, expired and stale tokens all land on `Anonymous`;
/// callers branch on it instead of handling an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Authenticated(Identity),
    Anonymous,
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Minimal lookup the resolver needs from the user store.
pub trait UserLookup: Send + Sync {
    fn find_identity<'a>(&'a self, username: &'a str)
    -> BoxFuture<'a, RepoResult<Option<Identity>>>;
}

impl UserLookup for UserRepo {
    fn find_identity<'a>(
        &'a self,
        username: &'a str,
    ) -> BoxFuture<'a, RepoResult<Option<Identity>>> {
        Box::pin(async move {
            let row = self.find_by_username(username).await?;
            Ok(row.map(|u| Identity {
                id: u.id,
                username: u.username,
            }))
        })
    }
}

#[derive(Clone)]
pub struct SessionResolver {
    tokens: Arc<TokenService>,
    users: Arc<dyn UserLookup>,
}

impl std::fmt::Debug for SessionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionResolver")
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

impl SessionResolver {
    pub fn new(tokens: Arc<TokenService>, users: Arc<dyn UserLookup>) -> Self {
        Self { tokens, users }
    }

    /// Map a raw token to a session.
    ///
    /// - no token: `Anonymous` without touching the token service
    /// - invalid or expired token: `Anonymous`
    /// - valid token whose user no longer exists: `Anonymous`
    /// - store failure: `Err`, so the caller can answer with a retryable 5xx
    pub async fn resolve(&self, token: Option<&str>) -> RepoResult<Session> {
        let Some(token) = token else {
            return Ok(Session::Anonymous);
        };

        let Some(verified) = self.tokens.verify(token) else {
            return Ok(Session::Anonymous);
        };

        let identity = self
            .users
            .find_identity(&verified.subject)
            .await
            .inspect_err(|e| {
                error!(error = %e, "user lookup failed while resolving session");
            })?;

        match identity {
            Some(identity) => Ok(Session::Authenticated(identity)),
            None => {
                debug!(subject = %verified.subject, "session token for unknown user");
                Ok(Session::Anonymous)
            }
        }
    }
}
